pub mod bboxes;
pub mod point;
pub mod ray;
pub mod triangle;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-13;

