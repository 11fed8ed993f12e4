pub mod access_group;
pub mod division;
pub mod group_permission;
pub mod position;
pub mod user;
pub mod user_group;
