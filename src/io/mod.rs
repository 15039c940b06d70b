//! Input/output helpers.
//!
//! - panel CSV ingest + validation (`ingest`)
//! - substance catalog and solvent tests (`catalog`)
//! - per-solvent CSV export (`export`)
//! - result JSON read/write (`result`)

pub mod catalog;
pub mod export;
pub mod ingest;
pub mod result;

pub use catalog::*;
pub use export::*;
pub use ingest::*;
pub use result::*;
