//! Search configuration.
//!
//! `SearchConfig` is what the parameter search understands. It can be built in
//! code, deserialized from a TOML file, or derived from CLI flags (the CLI layers
//! its flags over an optional file).

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::HspCandidate;
use crate::error::HspError;

/// Smallest radius the search will propose (the `R0` lower bound is exclusive).
pub const R0_FLOOR: f64 = 1e-3;

/// Closed interval for one search axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }

    fn validate(&self, axis: &str) -> Result<(), HspError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.max > self.min) {
            return Err(HspError::InvalidConfig(format!(
                "{axis} bounds must be finite with max > min (got [{}, {}])",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Per-axis search box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBounds {
    pub delta_d: AxisBounds,
    pub delta_p: AxisBounds,
    pub delta_h: AxisBounds,
    /// `min` is treated as exclusive: proposals never go below `max(min, R0_FLOOR)`.
    pub r0: AxisBounds,
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            delta_d: AxisBounds::new(15.0, 25.0),
            delta_p: AxisBounds::new(0.0, 20.0),
            delta_h: AxisBounds::new(0.0, 20.0),
            r0: AxisBounds::new(0.0, 30.0),
        }
    }
}

impl SearchBounds {
    /// Bounds in search order `[δd, δp, δh, R0]`, with the radius floor applied.
    pub fn axes(&self) -> [AxisBounds; 4] {
        [
            self.delta_d,
            self.delta_p,
            self.delta_h,
            AxisBounds::new(self.r0.min.max(R0_FLOOR), self.r0.max),
        ]
    }

    pub fn clamp(&self, c: HspCandidate) -> HspCandidate {
        let axes = self.axes();
        let v = c.to_array();
        HspCandidate::from_array([
            axes[0].clamp(v[0]),
            axes[1].clamp(v[1]),
            axes[2].clamp(v[2]),
            axes[3].clamp(v[3]),
        ])
    }

    pub fn validate(&self) -> Result<(), HspError> {
        self.delta_d.validate("delta_d")?;
        self.delta_p.validate("delta_p")?;
        self.delta_h.validate("delta_h")?;
        self.r0.validate("r0")?;
        if self.r0.max <= R0_FLOOR {
            return Err(HspError::InvalidConfig(format!(
                "r0 upper bound must exceed {R0_FLOOR} (got {})",
                self.r0.max
            )));
        }
        Ok(())
    }
}

/// How a violating solvent is penalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyKind {
    /// Squared depth past the safe line, in RED units (`(Ra/R0 - 1)^2` with no margin).
    #[default]
    Margin,
    /// One point per violating solvent.
    Count,
    /// Hansen's data-fit: `1 - (Π A_i)^(1/n)` with `A_i = exp(-depth_i * R0)`.
    Desirability,
}

impl PenaltyKind {
    pub fn display_name(self) -> &'static str {
        match self {
            PenaltyKind::Margin => "margin",
            PenaltyKind::Count => "count",
            PenaltyKind::Desirability => "desirability",
        }
    }
}

/// Scoring policy for the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub penalty: PenaltyKind,
    /// Band (in RED units) around the boundary that correctly classified
    /// solvents must clear to contribute nothing.
    pub margin: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            penalty: PenaltyKind::Margin,
            margin: 0.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), HspError> {
        if !(self.margin.is_finite() && (0.0..1.0).contains(&self.margin)) {
            return Err(HspError::InvalidConfig(format!(
                "scoring margin must be in [0, 1) (got {})",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Parameter search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub bounds: SearchBounds,
    pub initial_guess: Option<HspCandidate>,
    /// Relative improvement below which an iteration counts as stalled.
    pub tolerance: f64,
    /// Consecutive stalled iterations before a local search is converged.
    pub patience: usize,
    pub max_iterations: usize,
    pub restarts: usize,
    pub seed: Option<u64>,
    /// Initial simplex edge, as a fraction of each axis width.
    pub initial_step: f64,
    pub policy: ScoringPolicy,
    /// Run restarts on the rayon pool.
    pub parallel: bool,
    /// Search-wide time limit.
    pub timeout_secs: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bounds: SearchBounds::default(),
            initial_guess: None,
            tolerance: 1e-6,
            patience: 20,
            max_iterations: 500,
            restarts: 8,
            seed: None,
            initial_step: 0.1,
            policy: ScoringPolicy::default(),
            parallel: true,
            timeout_secs: None,
        }
    }
}

impl SearchConfig {
    /// Load a config from a TOML file. Missing fields take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, HspError> {
        let text = std::fs::read_to_string(path).map_err(|e| HspError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, HspError> {
        let config: SearchConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> Result<(), HspError> {
        self.bounds.validate()?;
        self.policy.validate()?;

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(HspError::InvalidConfig(format!(
                "tolerance must be finite and > 0 (got {})",
                self.tolerance
            )));
        }
        if self.patience == 0 {
            return Err(HspError::InvalidConfig("patience must be >= 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(HspError::InvalidConfig("max_iterations must be >= 1".to_string()));
        }
        if self.restarts == 0 {
            return Err(HspError::InvalidConfig("restarts must be >= 1".to_string()));
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0 && self.initial_step <= 1.0) {
            return Err(HspError::InvalidConfig(format!(
                "initial_step must be in (0, 1] (got {})",
                self.initial_step
            )));
        }
        if let Some(t) = self.timeout_secs {
            if !(t.is_finite() && t > 0.0) {
                return Err(HspError::InvalidConfig(format!("timeout must be > 0 seconds (got {t})")));
            }
        }
        if let Some(guess) = self.initial_guess {
            guess
                .validate()
                .map_err(|e| HspError::InvalidConfig(format!("initial guess: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = SearchConfig::default();
        assert_eq!(config.bounds.delta_d, AxisBounds::new(15.0, 25.0));
        assert_eq!(config.bounds.delta_p, AxisBounds::new(0.0, 20.0));
        assert_eq!(config.bounds.delta_h, AxisBounds::new(0.0, 20.0));
        assert_eq!(config.bounds.r0, AxisBounds::new(0.0, 30.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn clamp_keeps_radius_above_floor() {
        let bounds = SearchBounds::default();
        let c = bounds.clamp(HspCandidate::new(10.0, 25.0, -3.0, -2.0));
        assert_eq!(c.delta_d, 15.0);
        assert_eq!(c.delta_p, 20.0);
        assert_eq!(c.delta_h, 0.0);
        assert_eq!(c.r0, R0_FLOOR);
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = SearchConfig::from_toml_str(
            r#"
restarts = 3
seed = 7
timeout_secs = 2.5

[bounds.r0]
min = 1.0
max = 12.0

[policy]
penalty = "count"
"#,
        )
        .unwrap();
        assert_eq!(config.restarts, 3);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.bounds.r0, AxisBounds::new(1.0, 12.0));
        assert_eq!(config.bounds.delta_d, AxisBounds::new(15.0, 25.0));
        assert_eq!(config.policy.penalty, PenaltyKind::Count);
        assert_eq!(config.policy.margin, 0.0);
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.max_iterations, 500);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut config = SearchConfig::default();
        config.restarts = 0;
        assert!(matches!(config.validate(), Err(HspError::InvalidConfig(_))));

        let mut config = SearchConfig::default();
        config.bounds.delta_p = AxisBounds::new(5.0, 5.0);
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.initial_guess = Some(HspCandidate::new(18.0, 6.0, 6.0, 0.0));
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.policy.margin = 1.5;
        assert!(config.validate().is_err());
    }
}
