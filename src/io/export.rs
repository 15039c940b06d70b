//! Export per-solvent classifications to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Classification, SolventPanel};
use crate::error::HspError;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    name: &'a str,
    delta_d: f64,
    delta_p: f64,
    delta_h: f64,
    ra: f64,
    red: f64,
    predicted: &'static str,
    actual: &'static str,
    correct: bool,
}

fn label(good: bool) -> &'static str {
    if good { "good" } else { "poor" }
}

/// Write one row per panel solvent to a CSV file.
pub fn write_classifications_csv(
    path: &Path,
    panel: &SolventPanel,
    classifications: &BTreeMap<String, Classification>,
) -> Result<(), HspError> {
    let file = File::create(path).map_err(|e| HspError::io(path, e))?;
    write_classifications(file, panel, classifications)
}

pub fn write_classifications<W: Write>(
    sink: W,
    panel: &SolventPanel,
    classifications: &BTreeMap<String, Classification>,
) -> Result<(), HspError> {
    let mut writer = csv::Writer::from_writer(sink);
    for m in panel {
        let Some(c) = classifications.get(&m.id) else {
            continue;
        };
        writer.serialize(ExportRow {
            id: &m.id,
            name: m.name.as_deref().unwrap_or(""),
            delta_d: m.delta_d,
            delta_p: m.delta_p,
            delta_h: m.delta_h,
            ra: c.distance,
            red: c.red,
            predicted: label(c.predicted_good),
            actual: label(c.actual_good),
            correct: c.is_correct(),
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
