//! `hsp-fit` library crate.
//!
//! Fits a Hansen solubility sphere `(δd, δp, δh, R0)` to a panel of solvents
//! labeled good or poor. The binary (`hsp`) is a thin wrapper around this
//! library so core logic is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
