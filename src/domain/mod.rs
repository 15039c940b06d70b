//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - solubility-parameter points, candidates and measurements (`types`)
//! - the immutable solvent panel (`panel`)
//! - search and scoring configuration (`config`)

pub mod config;
pub mod panel;
pub mod types;

pub use config::*;
pub use panel::*;
pub use types::*;
