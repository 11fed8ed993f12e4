
mod division;
mod group;
mod position;
