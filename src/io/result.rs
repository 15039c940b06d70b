//! Read/write fit result JSON files.
//!
//! A result file is the portable record of one fit: the winning sphere, its
//! score and convergence status, the scoring policy and search seed, and the
//! per-solvent classifications. The policy lives on `FitResult` only.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FitResult;
use crate::error::HspError;

pub const TOOL_NAME: &str = "hsp";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub result: FitResult,
}

impl ResultFile {
    pub fn new(result: FitResult) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Utc::now(),
            result,
        }
    }
}

/// Write a result JSON file.
pub fn write_result_json(path: &Path, file: &ResultFile) -> Result<(), HspError> {
    let out = File::create(path).map_err(|e| HspError::io(path, e))?;
    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, file)?;
    out.flush().map_err(|e| HspError::io(path, e))?;
    Ok(())
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, HspError> {
    let file = File::open(path).map_err(|e| HspError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
