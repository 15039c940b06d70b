//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - loads the panel and search config
//! - runs the fit and prints reports
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DemoArgs, FitArgs, LookupArgs, OutputArgs, ScoreArgs};
use crate::data::{SyntheticPanelSpec, synthetic_panel};
use crate::domain::{HspCandidate, ScoringPolicy};
use crate::error::{AppError, HspError};
use crate::io::catalog::SubstanceCatalog;
use crate::io::export::write_classifications_csv;
use crate::io::result::{ResultFile, write_result_json};
use crate::report::{classified_by_red, format_classification_table, format_fit_summary, format_row_errors};

pub mod pipeline;

use pipeline::{PanelInput, RunOutput, load_panel_input, run_fit, search_config_from_args};

/// Entry point for the `hsp` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Score(args) => handle_score(args),
        Command::Lookup(args) => handle_lookup(args),
        Command::Demo(args) => handle_demo(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports and JSON.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = search_config_from_args(&args.search)?;
    let input = load_panel_input(&args.source)?;
    let run = run_fit(input, config)?;
    emit(&run, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = search_config_from_args(&args.search)?;
    let truth = HspCandidate::new(args.delta_d, args.delta_p, args.delta_h, args.r0);
    let panel = synthetic_panel(&SyntheticPanelSpec {
        truth,
        n_good: args.good,
        n_poor: args.poor,
        seed: args.panel_seed,
        ..SyntheticPanelSpec::default()
    })?;

    let run = run_fit(PanelInput::new(panel), config)?;
    if !args.output.json {
        println!(
            "Ground truth: delta_d={:.3} delta_p={:.3} delta_h={:.3} R0={:.3}",
            truth.delta_d, truth.delta_p, truth.delta_h, truth.r0
        );
    }
    emit(&run, &args.output)
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let policy = ScoringPolicy {
        penalty: args.penalty,
        margin: args.margin,
    };
    policy.validate()?;

    let input = load_panel_input(&args.source)?;
    let candidate = HspCandidate::new(args.delta_d, args.delta_p, args.delta_h, args.r0);
    let evaluation = crate::fit::score(&candidate, &input.panel, &policy)?;

    print!("{}", format_row_errors(&input.row_errors));
    print!(
        "{}",
        crate::report::format_score_report(&input.panel, &candidate, &evaluation, &policy)
    );
    Ok(())
}

fn handle_lookup(args: LookupArgs) -> Result<(), AppError> {
    let catalog = SubstanceCatalog::load(&args.substances, &args.names)?;
    let response = catalog.lookup(&args.name);
    println!("{}", serde_json::to_string_pretty(&response).map_err(HspError::from)?);
    Ok(())
}

/// Print the run (text or JSON) and write any requested exports.
fn emit(run: &RunOutput, output: &OutputArgs) -> Result<(), AppError> {
    let file = ResultFile::new(run.result.clone());

    if output.json {
        println!("{}", serde_json::to_string_pretty(&file).map_err(HspError::from)?);
    } else {
        print!("{}", format_row_errors(&run.input.row_errors));
        println!("{}", format_fit_summary(&run.input.panel, &run.result));
        print!(
            "{}",
            format_classification_table(&classified_by_red(&run.input.panel, &run.result.classifications))
        );
    }

    if let Some(path) = &output.export {
        write_classifications_csv(path, &run.input.panel, &run.result.classifications)?;
    }
    if let Some(path) = &output.export_result {
        write_result_json(path, &file)?;
    }

    Ok(())
}
