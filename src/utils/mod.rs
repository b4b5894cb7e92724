pub mod color;
pub mod date;
