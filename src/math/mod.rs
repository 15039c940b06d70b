//! Mathematical utilities: Hansen distance and the scaled solubility space.

pub mod distance;

pub use distance::*;
