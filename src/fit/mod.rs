//! Goodness-of-fit evaluation and parameter search.
//!
//! Responsibilities:
//!
//! - score a candidate sphere against a labeled panel (`evaluator`)
//! - minimize that score with a bounded simplex (`simplex`)
//! - run many simplex searches from different starts and pick the best (`search`)

pub mod cancel;
pub mod evaluator;
pub mod search;
pub mod simplex;
pub mod starts;

pub use cancel::*;
pub use evaluator::*;
pub use search::*;
pub use simplex::{FitKey, LocalOutcome, SimplexOptions, minimize};
pub use starts::*;
