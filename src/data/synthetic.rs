//! Synthetic solvent panels generated from a known sphere.
//!
//! Good solvents are placed inside the sphere and poor ones outside, along
//! well-spread directions (a Fibonacci lattice, randomly rotated per label) in
//! the scaled Hansen space. Each solvent's relative energy difference (RED) is
//! drawn from a configurable band, so the generated panel constrains the sphere
//! as tightly as the bands are narrow.

use std::f64::consts::{PI, TAU};

use nalgebra::{Rotation3, Unit, Vector3};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::UnitSphere;

use crate::domain::{HspCandidate, SolventMeasurement, SolventPanel};
use crate::error::HspError;
use crate::math::{from_hansen_space, to_hansen_space};

/// What to generate.
#[derive(Debug, Clone)]
pub struct SyntheticPanelSpec {
    /// Ground-truth sphere.
    pub truth: HspCandidate,
    pub n_good: usize,
    pub n_poor: usize,
    /// RED band for good solvents (must lie inside `(0, 1)`).
    pub good_red: (f64, f64),
    /// RED band for poor solvents (must lie above 1).
    pub poor_red: (f64, f64),
    pub seed: u64,
}

impl Default for SyntheticPanelSpec {
    fn default() -> Self {
        Self {
            truth: HspCandidate::new(18.0, 8.0, 8.0, 7.0),
            n_good: 10,
            n_poor: 10,
            good_red: (0.6, 0.98),
            poor_red: (1.02, 1.6),
            seed: 42,
        }
    }
}

/// Generate a labeled panel around `spec.truth`.
pub fn synthetic_panel(spec: &SyntheticPanelSpec) -> Result<SolventPanel, HspError> {
    spec.truth.validate()?;
    let (g_lo, g_hi) = spec.good_red;
    if !(g_lo.is_finite() && g_hi.is_finite() && 0.0 < g_lo && g_lo <= g_hi && g_hi < 1.0) {
        return Err(HspError::InvalidInput(format!(
            "good RED band must satisfy 0 < lo <= hi < 1 (got {g_lo}..{g_hi})"
        )));
    }
    let (p_lo, p_hi) = spec.poor_red;
    if !(p_lo.is_finite() && p_hi.is_finite() && 1.0 < p_lo && p_lo <= p_hi) {
        return Err(HspError::InvalidInput(format!(
            "poor RED band must satisfy 1 < lo <= hi (got {p_lo}..{p_hi})"
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let center = to_hansen_space(spec.truth.center());

    let mut rows = Vec::with_capacity(spec.n_good + spec.n_poor);
    for (label, n, (lo, hi), good) in [
        ("good", spec.n_good, spec.good_red, true),
        ("poor", spec.n_poor, spec.poor_red, false),
    ] {
        let rotation = random_rotation(&mut rng);
        for (i, dir) in fibonacci_directions(n).into_iter().enumerate() {
            let red = rng.gen_range(lo..=hi);
            let point = from_hansen_space(&(center + rotation * dir * (red * spec.truth.r0)));
            rows.push(
                SolventMeasurement::new(format!("SYN-{label}-{:02}", i + 1), point, good)
                    .with_name(format!("synthetic {label} solvent {}", i + 1)),
            );
        }
    }

    SolventPanel::new(rows)
}

/// `n` near-uniform unit vectors.
fn fibonacci_directions(n: usize) -> Vec<Vector3<f64>> {
    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = golden_angle * i as f64;
            Vector3::new(r * phi.cos(), r * phi.sin(), z)
        })
        .collect()
}

fn random_rotation(rng: &mut StdRng) -> Rotation3<f64> {
    let axis: [f64; 3] = UnitSphere.sample(rng);
    let angle = rng.gen_range(0.0..TAU);
    Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::from(axis)), angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::hansen_distance;

    #[test]
    fn labels_follow_the_sphere() {
        let spec = SyntheticPanelSpec::default();
        let panel = synthetic_panel(&spec).unwrap();
        assert_eq!(panel.len(), 20);
        assert_eq!(panel.good_count(), 10);

        let center = spec.truth.center();
        for m in &panel {
            let red = hansen_distance(m.point(), center) / spec.truth.r0;
            if m.is_good_solvent {
                assert!(red >= spec.good_red.0 - 1e-9 && red <= spec.good_red.1 + 1e-9, "{red}");
            } else {
                assert!(red >= spec.poor_red.0 - 1e-9 && red <= spec.poor_red.1 + 1e-9, "{red}");
            }
        }
    }

    #[test]
    fn same_seed_same_panel() {
        let spec = SyntheticPanelSpec::default();
        assert_eq!(synthetic_panel(&spec).unwrap(), synthetic_panel(&spec).unwrap());
    }

    #[test]
    fn rejects_bands_on_the_wrong_side() {
        let spec = SyntheticPanelSpec {
            good_red: (0.5, 1.2),
            ..SyntheticPanelSpec::default()
        };
        assert!(matches!(synthetic_panel(&spec), Err(HspError::InvalidInput(_))));

        let spec = SyntheticPanelSpec {
            poor_red: (0.9, 1.5),
            ..SyntheticPanelSpec::default()
        };
        assert!(synthetic_panel(&spec).is_err());
    }

    #[test]
    fn fibonacci_directions_are_unit_and_balanced() {
        let dirs = fibonacci_directions(10);
        let sum = dirs.iter().fold(Vector3::<f64>::zeros(), |acc, d| acc + d);
        for d in &dirs {
            assert!((d.norm() - 1.0).abs() < 1e-12);
        }
        assert!(sum.norm() < 1.0);
    }
}
