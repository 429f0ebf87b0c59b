pub mod area;
pub mod geometry;
