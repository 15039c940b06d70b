//! Multi-start parameter search.
//!
//! Workflow:
//! 1. validate the configuration and make sure the panel is fittable
//! 2. generate starting points from a seeded RNG
//! 3. run one bounded simplex per start (in parallel on the rayon pool)
//! 4. keep the lowest score; break ties by smaller `R0`, then by restart index
//! 5. re-score the winner with full per-solvent diagnostics
//!
//! Restarts share nothing mutable except the read-only stop flag, and results are
//! collected in restart order, so a fixed seed always gives the same answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{FitResult, HspCandidate, RestartSummary, SearchConfig, SolventPanel, Termination};
use crate::error::HspError;
use crate::fit::cancel::CancelToken;
use crate::fit::evaluator::{score, score_value};
use crate::fit::simplex::{FitKey, LocalOutcome, SimplexOptions, minimize};
use crate::fit::starts::starting_points;

/// Fit `(δd, δp, δh, R0)` to a labeled panel.
pub fn fit(panel: &SolventPanel, config: &SearchConfig) -> Result<FitResult, HspError> {
    fit_with_cancel(panel, config, &CancelToken::new())
}

/// Like `fit`, but stops early (returning the best so far) once `cancel` fires.
pub fn fit_with_cancel(
    panel: &SolventPanel,
    config: &SearchConfig,
    cancel: &CancelToken,
) -> Result<FitResult, HspError> {
    config.validate()?;
    panel.ensure_fittable()?;

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    let mut rng = StdRng::seed_from_u64(seed);
    let starts = starting_points(panel, config, &mut rng);

    info!(
        solvents = panel.len(),
        good = panel.good_count(),
        restarts = starts.len(),
        seed,
        penalty = config.policy.penalty.display_name(),
        "starting HSP search"
    );

    let deadline = config.timeout().map(|t| Instant::now() + t);
    let timed_out = AtomicBool::new(false);
    let should_stop = || {
        if cancel.is_cancelled() {
            return true;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                timed_out.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    };

    let policy = config.policy;
    let objective = |c: &HspCandidate| match score_value(c, panel, &policy) {
        Ok(s) => FitKey::new(s, c.r0),
        // Out-of-domain proposals are rejected, never fatal.
        Err(_) => FitKey::worst(),
    };

    let opts = SimplexOptions {
        tolerance: config.tolerance,
        patience: config.patience,
        max_iterations: config.max_iterations,
        initial_step: config.initial_step,
        polish: true,
    };

    let run_one = |(index, start): (usize, &HspCandidate)| {
        let outcome = minimize(*start, &config.bounds, &opts, &objective, &should_stop);
        debug!(
            restart = index,
            score = outcome.key.score,
            r0 = outcome.best.r0,
            iterations = outcome.iterations,
            converged = outcome.converged,
            "restart finished"
        );
        (index, *start, outcome)
    };

    let outcomes: Vec<(usize, HspCandidate, LocalOutcome)> = if config.parallel {
        starts.par_iter().enumerate().map(run_one).collect()
    } else {
        starts.iter().enumerate().map(run_one).collect()
    };

    let (_, _, winner) = select_best(&outcomes)
        .ok_or_else(|| HspError::InvalidConfig("search produced no restarts".to_string()))?;
    let best = winner.best;

    let evaluation = score(&best, panel, &policy)?;
    let converged = outcomes.iter().any(|(_, _, o)| o.converged);
    let termination = if outcomes.iter().any(|(_, _, o)| o.interrupted) {
        if timed_out.load(Ordering::Relaxed) {
            Termination::TimedOut
        } else {
            Termination::Cancelled
        }
    } else {
        Termination::Completed
    };

    if !converged {
        warn!(
            max_iterations = config.max_iterations,
            termination = termination.display_name(),
            "no restart converged; returning best estimate found"
        );
    }
    info!(
        delta_d = best.delta_d,
        delta_p = best.delta_p,
        delta_h = best.delta_h,
        r0 = best.r0,
        score = evaluation.score,
        misclassified = evaluation.misclassified_count(),
        "HSP search finished"
    );

    let restarts = outcomes
        .iter()
        .map(|(index, start, o)| RestartSummary {
            index: *index,
            start: *start,
            best: o.best,
            score: o.key.score,
            iterations: o.iterations,
            converged: o.converged,
        })
        .collect();

    Ok(FitResult {
        best,
        score: evaluation.score,
        policy,
        classifications: evaluation.classifications,
        converged,
        termination,
        seed,
        restarts,
    })
}

/// Deterministic selection: lowest key (score, then R0); ties by restart index.
fn select_best(outcomes: &[(usize, HspCandidate, LocalOutcome)]) -> Option<&(usize, HspCandidate, LocalOutcome)> {
    let mut best: Option<&(usize, HspCandidate, LocalOutcome)> = None;
    for entry in outcomes {
        best = match best {
            None => Some(entry),
            Some(current) => {
                let better = entry.2.key.is_better_than(&current.2.key)
                    || (entry.2.key == current.2.key && entry.0 < current.0);
                if better { Some(entry) } else { Some(current) }
            }
        };
    }
    best
}
