//! Reporting utilities: per-solvent rows and formatted terminal output.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use crate::domain::{Classification, SolventMeasurement, SolventPanel};

/// A panel solvent joined with its classification.
#[derive(Debug, Clone)]
pub struct ClassifiedSolvent<'a> {
    pub measurement: &'a SolventMeasurement,
    pub classification: Classification,
}

/// Join panel rows with classifications, ordered by RED (closest first).
///
/// Solvents without a classification are left out.
pub fn classified_by_red<'a>(
    panel: &'a SolventPanel,
    classifications: &BTreeMap<String, Classification>,
) -> Vec<ClassifiedSolvent<'a>> {
    let mut rows: Vec<ClassifiedSolvent<'a>> = panel
        .iter()
        .filter_map(|m| {
            classifications.get(&m.id).map(|c| ClassifiedSolvent {
                measurement: m,
                classification: *c,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.classification
            .red
            .total_cmp(&b.classification.red)
            .then_with(|| a.measurement.id.cmp(&b.measurement.id))
    });
    rows
}
