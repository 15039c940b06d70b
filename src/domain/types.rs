//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for reporting or comparisons

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ScoringPolicy;
use crate::error::HspError;

/// A point in solubility-parameter space (units: √MPa).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HspPoint {
    pub delta_d: f64,
    pub delta_p: f64,
    pub delta_h: f64,
}

impl HspPoint {
    pub fn new(delta_d: f64, delta_p: f64, delta_h: f64) -> Self {
        Self {
            delta_d,
            delta_p,
            delta_h,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.delta_d.is_finite() && self.delta_p.is_finite() && self.delta_h.is_finite()
    }
}

/// A sphere of good solubility: center plus interaction radius `R0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HspCandidate {
    pub delta_d: f64,
    pub delta_p: f64,
    pub delta_h: f64,
    pub r0: f64,
}

impl HspCandidate {
    pub fn new(delta_d: f64, delta_p: f64, delta_h: f64, r0: f64) -> Self {
        Self {
            delta_d,
            delta_p,
            delta_h,
            r0,
        }
    }

    pub fn center(&self) -> HspPoint {
        HspPoint::new(self.delta_d, self.delta_p, self.delta_h)
    }

    /// Parameters in search order: `[δd, δp, δh, R0]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.delta_d, self.delta_p, self.delta_h, self.r0]
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Check that the candidate can be scored: finite center, finite `R0 > 0`.
    pub fn validate(&self) -> Result<(), HspError> {
        if !self.center().is_finite() {
            return Err(HspError::InvalidCandidate(format!(
                "non-finite center ({}, {}, {})",
                self.delta_d, self.delta_p, self.delta_h
            )));
        }
        if !(self.r0.is_finite() && self.r0 > 0.0) {
            return Err(HspError::InvalidCandidate(format!(
                "R0 must be finite and > 0 (got {})",
                self.r0
            )));
        }
        Ok(())
    }
}

/// One labeled miscibility test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolventMeasurement {
    /// Registry number (CAS / NLM) or any other unique key.
    pub id: String,
    /// Optional human-readable name (reporting only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub delta_d: f64,
    pub delta_p: f64,
    pub delta_h: f64,
    pub is_good_solvent: bool,
}

impl SolventMeasurement {
    pub fn new(id: impl Into<String>, point: HspPoint, is_good_solvent: bool) -> Self {
        Self {
            id: id.into(),
            name: None,
            delta_d: point.delta_d,
            delta_p: point.delta_p,
            delta_h: point.delta_h,
            is_good_solvent,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn point(&self) -> HspPoint {
        HspPoint::new(self.delta_d, self.delta_p, self.delta_h)
    }
}

/// Predicted vs. actual label for a single solvent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Hansen distance `Ra` from the candidate center.
    pub distance: f64,
    /// Relative energy difference `Ra / R0`.
    pub red: f64,
    pub predicted_good: bool,
    pub actual_good: bool,
}

impl Classification {
    pub fn is_correct(&self) -> bool {
        self.predicted_good == self.actual_good
    }
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every restart ran to convergence or to its iteration limit.
    Completed,
    /// The caller cancelled the search.
    Cancelled,
    /// The search-wide timeout elapsed.
    TimedOut,
}

impl Termination {
    pub fn display_name(self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Cancelled => "cancelled",
            Termination::TimedOut => "timed out",
        }
    }
}

/// Outcome of one local search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartSummary {
    pub index: usize,
    pub start: HspCandidate,
    pub best: HspCandidate,
    pub score: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Output of a parameter search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub best: HspCandidate,
    pub score: f64,
    /// Scoring policy the score was computed under.
    pub policy: ScoringPolicy,
    /// Per-solvent diagnostics, keyed by identifier.
    pub classifications: BTreeMap<String, Classification>,
    /// `false` means no restart met the tolerance before `max_iterations`.
    pub converged: bool,
    pub termination: Termination,
    /// Seed used for the random restarts (reuse it to reproduce the run).
    pub seed: u64,
    pub restarts: Vec<RestartSummary>,
}

impl FitResult {
    /// Soft failure flag: the best estimate is still usable, but unconverged.
    pub fn no_convergence(&self) -> bool {
        !self.converged
    }

    pub fn misclassified(&self) -> impl Iterator<Item = (&str, &Classification)> {
        self.classifications
            .iter()
            .filter(|(_, c)| !c.is_correct())
            .map(|(id, c)| (id.as_str(), c))
    }

    /// Fraction of solvents whose predicted label matches the test result.
    pub fn accuracy(&self) -> f64 {
        if self.classifications.is_empty() {
            return 0.0;
        }
        let correct = self.classifications.values().filter(|c| c.is_correct()).count();
        correct as f64 / self.classifications.len() as f64
    }
}
