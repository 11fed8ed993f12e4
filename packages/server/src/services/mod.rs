pub mod division;
pub mod group;
pub mod membership;
pub mod position;
