pub mod auth;
pub mod division;
pub mod group;
pub mod health;
pub mod position;
pub mod user;
