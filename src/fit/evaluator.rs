//! Goodness-of-fit evaluation for a single candidate sphere.
//!
//! For each solvent we compute the Hansen distance `Ra` to the candidate center,
//! predict "good" when `Ra <= R0`, and accumulate a non-negative penalty for every
//! solvent that is misclassified or sits inside the policy's margin band.
//!
//! The score is:
//! - deterministic (the panel iterates in canonical identifier order)
//! - non-negative
//! - zero iff every solvent is correctly classified and clears the margin
//!
//! Evaluation is a pure function of its inputs and can be called from any
//! number of threads at once.

use std::collections::BTreeMap;

use crate::domain::{Classification, HspCandidate, PenaltyKind, ScoringPolicy, SolventMeasurement, SolventPanel};
use crate::error::HspError;
use crate::math::hansen_distance;

/// Smallest contribution of a violating solvent, so a poor solvent sitting exactly
/// on the boundary still yields a non-zero score.
const VIOLATION_FLOOR: f64 = f64::EPSILON;

/// Score plus per-solvent diagnostics.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: f64,
    pub classifications: BTreeMap<String, Classification>,
}

impl Evaluation {
    pub fn misclassified_count(&self) -> usize {
        self.classifications.values().filter(|c| !c.is_correct()).count()
    }

    pub fn is_perfect(&self) -> bool {
        self.misclassified_count() == 0
    }
}

/// Score a candidate against a panel and classify every solvent.
pub fn score(candidate: &HspCandidate, panel: &SolventPanel, policy: &ScoringPolicy) -> Result<Evaluation, HspError> {
    check_inputs(candidate, panel)?;

    let mut acc = Accumulator::new(policy.penalty, candidate.r0);
    let mut classifications = BTreeMap::new();
    for m in panel {
        let checked = check(candidate, m, policy.margin);
        acc.add(&checked);
        classifications.insert(m.id.clone(), checked.classification);
    }

    Ok(Evaluation {
        score: acc.finish(panel.len()),
        classifications,
    })
}

/// Score only. Same value as `score(..).score`, without building the map.
pub fn score_value(candidate: &HspCandidate, panel: &SolventPanel, policy: &ScoringPolicy) -> Result<f64, HspError> {
    check_inputs(candidate, panel)?;

    let mut acc = Accumulator::new(policy.penalty, candidate.r0);
    for m in panel {
        acc.add(&check(candidate, m, policy.margin));
    }
    Ok(acc.finish(panel.len()))
}

fn check_inputs(candidate: &HspCandidate, panel: &SolventPanel) -> Result<(), HspError> {
    candidate.validate()?;
    if panel.is_empty() {
        return Err(HspError::EmptyPanel);
    }
    Ok(())
}

struct SolventCheck {
    classification: Classification,
    /// How far past its safe line the solvent sits, in RED units (0 when safe).
    depth: f64,
}

impl SolventCheck {
    fn is_violating(&self) -> bool {
        self.depth > 0.0 || !self.classification.is_correct()
    }
}

fn check(candidate: &HspCandidate, m: &SolventMeasurement, margin: f64) -> SolventCheck {
    let distance = hansen_distance(m.point(), candidate.center());
    let red = distance / candidate.r0;
    let predicted_good = distance <= candidate.r0;

    let depth = if m.is_good_solvent {
        (red - (1.0 - margin)).max(0.0)
    } else {
        ((1.0 + margin) - red).max(0.0)
    };

    SolventCheck {
        classification: Classification {
            distance,
            red,
            predicted_good,
            actual_good: m.is_good_solvent,
        },
        depth,
    }
}

struct Accumulator {
    kind: PenaltyKind,
    r0: f64,
    total: f64,
    any_violation: bool,
}

impl Accumulator {
    fn new(kind: PenaltyKind, r0: f64) -> Self {
        Self {
            kind,
            r0,
            total: 0.0,
            any_violation: false,
        }
    }

    fn add(&mut self, check: &SolventCheck) {
        if !check.is_violating() {
            return;
        }
        self.any_violation = true;
        match self.kind {
            PenaltyKind::Margin => self.total += (check.depth * check.depth).max(VIOLATION_FLOOR),
            PenaltyKind::Count => self.total += 1.0,
            // Sum of ln(A_i); safe solvents have A_i = 1 and add nothing.
            PenaltyKind::Desirability => self.total -= check.depth * self.r0,
        }
    }

    fn finish(self, n: usize) -> f64 {
        if !self.any_violation {
            return 0.0;
        }
        let raw = match self.kind {
            PenaltyKind::Margin | PenaltyKind::Count => self.total,
            PenaltyKind::Desirability => 1.0 - (self.total / n as f64).exp(),
        };
        raw.max(VIOLATION_FLOOR)
    }
}
