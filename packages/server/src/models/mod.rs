pub mod auth;
pub mod division;
pub mod group;
pub mod position;
pub mod shared;
pub mod user;
