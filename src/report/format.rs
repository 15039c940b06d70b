//! Formatted terminal output.
//!
//! Formatting lives in one place so the fitting code stays clean and output
//! changes are localized.

use crate::domain::{FitResult, HspCandidate, ScoringPolicy, SolventPanel};
use crate::fit::Evaluation;
use crate::io::ingest::RowError;
use crate::report::{ClassifiedSolvent, classified_by_red};

const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Fit summary: panel, policy, search diagnostics and the chosen sphere.
pub fn format_fit_summary(panel: &SolventPanel, result: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("=== hsp - Hansen Solubility Sphere Fit ===\n");
    out.push_str(&format_panel_line(panel));
    out.push_str(&format_policy_line(&result.policy));

    let converged = result.restarts.iter().filter(|r| r.converged).count();
    out.push_str(&format!(
        "Search: seed={} | restarts={} | converged={}/{} | termination={}\n",
        result.seed,
        result.restarts.len(),
        converged,
        result.restarts.len(),
        result.termination.display_name(),
    ));
    if result.no_convergence() {
        out.push_str("WARNING: no restart converged; reporting the best estimate found.\n");
    }

    out.push_str("\nBest sphere:\n");
    out.push_str(&format_candidate(&result.best));
    let correct = result.classifications.values().filter(|c| c.is_correct()).count();
    out.push_str(&format!("- score    = {:.6}\n", result.score));
    out.push_str(&format!(
        "- accuracy = {:.1}% ({}/{})\n",
        100.0 * result.accuracy(),
        correct,
        result.classifications.len()
    ));
    out.push('\n');

    out
}

/// Report for a single candidate scored against a panel.
pub fn format_score_report(
    panel: &SolventPanel,
    candidate: &HspCandidate,
    evaluation: &Evaluation,
    policy: &ScoringPolicy,
) -> String {
    let mut out = String::new();
    out.push_str("=== hsp - Candidate Score ===\n");
    out.push_str(&format_panel_line(panel));
    out.push_str(&format_policy_line(policy));
    out.push_str("\nCandidate:\n");
    out.push_str(&format_candidate(candidate));
    out.push_str(&format!("- score    = {:.6}\n", evaluation.score));
    out.push_str(&format!(
        "- misclassified = {}/{}\n\n",
        evaluation.misclassified_count(),
        evaluation.classifications.len()
    ));
    out.push_str(&format_classification_table(&classified_by_red(panel, &evaluation.classifications)));
    out
}

/// Per-solvent table, one row per classified solvent.
pub fn format_classification_table(rows: &[ClassifiedSolvent<'_>]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<16} {:<20} {:>7} {:>7} {:>7} {:>8} {:>6} {:<6} {:<6}\n",
            "id", "name", "dD", "dP", "dH", "Ra", "RED", "pred", "actual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<16} {:-<20} {:-<7} {:-<7} {:-<7} {:-<8} {:-<6} {:-<6} {:-<6}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let m = r.measurement;
        let c = &r.classification;
        let flag = if c.is_correct() { "" } else { " *" };
        out.push_str(
            format!(
                "{:<16} {:<20} {:>7.2} {:>7.2} {:>7.2} {:>8.3} {:>6.3} {:<6} {:<6}{flag}\n",
                truncate(&m.id, 16),
                truncate(m.name.as_deref().unwrap_or(""), 20),
                m.delta_d,
                m.delta_p,
                m.delta_h,
                c.distance,
                c.red,
                label(c.predicted_good),
                label(c.actual_good),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Skipped-row report for the ingest step (empty when nothing was skipped).
pub fn format_row_errors(errors: &[RowError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("Skipped rows: {}\n", errors.len());
    for e in errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        match &e.id {
            Some(id) => out.push_str(&format!("  line {} ({id}): {}\n", e.line, e.message)),
            None => out.push_str(&format!("  line {}: {}\n", e.line, e.message)),
        }
    }
    if errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS_SHOWN));
    }
    out
}

fn format_panel_line(panel: &SolventPanel) -> String {
    format!(
        "Panel: n={} | good={} | poor={}\n",
        panel.len(),
        panel.good_count(),
        panel.poor_count()
    )
}

fn format_policy_line(policy: &ScoringPolicy) -> String {
    format!(
        "Policy: penalty={} | margin={:.3}\n",
        policy.penalty.display_name(),
        policy.margin
    )
}

fn format_candidate(c: &HspCandidate) -> String {
    format!(
        "- delta_d  = {:.3}\n- delta_p  = {:.3}\n- delta_h  = {:.3}\n- R0       = {:.3}\n",
        c.delta_d, c.delta_p, c.delta_h, c.r0
    )
}

fn label(good: bool) -> &'static str {
    if good { "good" } else { "poor" }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
