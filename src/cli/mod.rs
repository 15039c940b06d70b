//! Command-line parsing for the `hsp` sphere fitter.
//!
//! Argument parsing and command dispatch stay separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{HspCandidate, PenaltyKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "hsp", version, about = "Hansen Solubility Parameter sphere fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a solubility sphere to a labeled solvent panel.
    Fit(FitArgs),
    /// Score one candidate sphere against a panel.
    Score(ScoreArgs),
    /// Look up a substance's HSP by short name (JSON output).
    Lookup(LookupArgs),
    /// Generate a synthetic panel around a known sphere and fit it.
    Demo(DemoArgs),
}

/// Where the solvent panel comes from.
#[derive(Debug, Args, Clone)]
pub struct PanelSource {
    /// Labeled panel CSV (`id, delta_d, delta_p, delta_h, good[, name]`).
    #[arg(long, value_name = "CSV", conflicts_with_all = ["tests", "substances"], required_unless_present = "tests")]
    pub panel: Option<PathBuf>,

    /// Solvent test CSV (`id, good`) resolved against `--substances`.
    #[arg(long, value_name = "CSV", requires = "substances")]
    pub tests: Option<PathBuf>,

    /// Substance catalog CSV providing coordinates for `--tests`.
    #[arg(long, value_name = "CSV", requires = "tests")]
    pub substances: Option<PathBuf>,
}

/// Search settings; each flag overrides the config file.
#[derive(Debug, Args, Clone, Default)]
pub struct SearchArgs {
    /// TOML search configuration.
    #[arg(long, value_name = "TOML", env = "HSP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of independent starting points.
    #[arg(long)]
    pub restarts: Option<usize>,

    /// Iteration cap per restart.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Relative improvement below which an iteration counts as stalled.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Stalled iterations tolerated before a restart is converged.
    #[arg(long)]
    pub patience: Option<usize>,

    /// RNG seed for the starting points (random and reported when omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// How violating solvents are penalized.
    #[arg(long, value_enum)]
    pub penalty: Option<PenaltyKind>,

    /// Boundary band (RED units) correct solvents must clear.
    #[arg(long)]
    pub margin: Option<f64>,

    /// Wall-clock limit for the whole search.
    #[arg(long)]
    pub timeout_secs: Option<f64>,

    /// Run restarts on the calling thread instead of the rayon pool.
    #[arg(long)]
    pub serial: bool,

    /// Initial guess `dD,dP,dH,R0` (used as the first restart).
    #[arg(long, value_name = "dD,dP,dH,R0", value_parser = parse_candidate)]
    pub guess: Option<HspCandidate>,
}

/// Report outputs shared by `fit` and `demo`.
#[derive(Debug, Args, Clone, Default)]
pub struct OutputArgs {
    /// Export per-solvent classifications to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fit result to JSON.
    #[arg(long = "export-result", value_name = "JSON")]
    pub export_result: Option<PathBuf>,

    /// Print the result as JSON on stdout instead of the text report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: PanelSource,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub source: PanelSource,

    #[arg(long = "dd")]
    pub delta_d: f64,

    #[arg(long = "dp")]
    pub delta_p: f64,

    #[arg(long = "dh")]
    pub delta_h: f64,

    #[arg(long)]
    pub r0: f64,

    #[arg(long, value_enum, default_value_t = PenaltyKind::Margin)]
    pub penalty: PenaltyKind,

    #[arg(long, default_value_t = 0.0)]
    pub margin: f64,
}

#[derive(Debug, Args, Clone)]
pub struct LookupArgs {
    /// Short substance name (alphanumeric only).
    pub name: String,

    /// Substance table CSV.
    #[arg(long, value_name = "CSV")]
    pub substances: PathBuf,

    /// Short-name table CSV.
    #[arg(long, value_name = "CSV")]
    pub names: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Ground-truth delta_d.
    #[arg(long = "dd", default_value_t = 18.0)]
    pub delta_d: f64,

    #[arg(long = "dp", default_value_t = 8.0)]
    pub delta_p: f64,

    #[arg(long = "dh", default_value_t = 8.0)]
    pub delta_h: f64,

    #[arg(long, default_value_t = 7.0)]
    pub r0: f64,

    /// Number of good solvents to generate.
    #[arg(long, default_value_t = 10)]
    pub good: usize,

    /// Number of poor solvents to generate.
    #[arg(long, default_value_t = 10)]
    pub poor: usize,

    /// Seed for the synthetic panel (the search seed is `--seed`).
    #[arg(long = "panel-seed", default_value_t = 42)]
    pub panel_seed: u64,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Parse `dD,dP,dH,R0`.
pub fn parse_candidate(s: &str) -> Result<HspCandidate, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [d, p, h, r0] => Ok(HspCandidate::new(*d, *p, *h, *r0)),
        _ => Err(format!("expected 4 comma-separated numbers, got {}", parts.len())),
    }
}
