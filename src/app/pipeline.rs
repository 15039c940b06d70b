//! Shared fit pipeline used by the `fit` and `demo` commands.
//!
//! panel source -> validated panel -> search config -> multi-start fit
//!
//! The commands then only differ in where the panel comes from and how the
//! result is presented.

use tracing::info;

use crate::cli::{PanelSource, SearchArgs};
use crate::domain::{FitResult, SearchConfig, SolventPanel};
use crate::error::HspError;
use crate::io::catalog::{SubstanceCatalog, load_solvent_tests};
use crate::io::ingest::{RowError, load_panel};

/// A panel ready to fit, plus what ingest skipped.
#[derive(Debug, Clone)]
pub struct PanelInput {
    pub panel: SolventPanel,
    pub row_errors: Vec<RowError>,
}

impl PanelInput {
    pub fn new(panel: SolventPanel) -> Self {
        Self {
            panel,
            row_errors: Vec::new(),
        }
    }
}

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub input: PanelInput,
    pub config: SearchConfig,
    pub result: FitResult,
}

/// Load the panel from `--panel`, or from `--tests` joined with `--substances`.
pub fn load_panel_input(source: &PanelSource) -> Result<PanelInput, HspError> {
    match (&source.panel, &source.tests, &source.substances) {
        (Some(panel), _, _) => {
            let ingested = load_panel(panel)?;
            info!(
                path = %panel.display(),
                rows_read = ingested.rows_read,
                rows_used = ingested.rows_used,
                "loaded solvent panel"
            );
            Ok(PanelInput {
                panel: ingested.panel,
                row_errors: ingested.row_errors,
            })
        }
        (None, Some(tests), Some(substances)) => {
            let parsed = load_solvent_tests(tests)?;
            let catalog = SubstanceCatalog::load_substances(substances)?;
            let panel = catalog.resolve_panel(&parsed.tests)?;
            info!(
                path = %tests.display(),
                rows_read = parsed.rows_read,
                rows_used = panel.len(),
                "resolved solvent tests against catalog"
            );
            Ok(PanelInput {
                panel,
                row_errors: parsed.row_errors,
            })
        }
        _ => Err(HspError::InvalidInput(
            "provide either --panel, or --tests together with --substances".to_string(),
        )),
    }
}

/// Layer the search config: defaults, then the TOML file, then CLI flags.
pub fn search_config_from_args(args: &SearchArgs) -> Result<SearchConfig, HspError> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_toml_file(path)?,
        None => SearchConfig::default(),
    };

    if let Some(v) = args.restarts {
        config.restarts = v;
    }
    if let Some(v) = args.max_iterations {
        config.max_iterations = v;
    }
    if let Some(v) = args.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = args.patience {
        config.patience = v;
    }
    if let Some(v) = args.seed {
        config.seed = Some(v);
    }
    if let Some(v) = args.penalty {
        config.policy.penalty = v;
    }
    if let Some(v) = args.margin {
        config.policy.margin = v;
    }
    if let Some(v) = args.timeout_secs {
        config.timeout_secs = Some(v);
    }
    if args.serial {
        config.parallel = false;
    }
    if let Some(guess) = args.guess {
        config.initial_guess = Some(guess);
    }

    config.validate()?;
    Ok(config)
}

/// Fit the panel with the given config.
pub fn run_fit(input: PanelInput, config: SearchConfig) -> Result<RunOutput, HspError> {
    let result = crate::fit::fit(&input.panel, &config)?;
    Ok(RunOutput { input, config, result })
}
