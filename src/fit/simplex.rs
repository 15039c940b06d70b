//! Bounded Nelder–Mead simplex over `[δd, δp, δh, R0]`.
//!
//! The score surface has kinks wherever a solvent crosses the sphere boundary,
//! so we use a derivative-free method. Nelder–Mead only ever *compares* objective
//! values, which lets us order candidates lexicographically by `(score, R0)`:
//! once every solvent is on the right side, the simplex keeps shrinking the
//! sphere instead of drifting on a flat zero-score plateau.
//!
//! Every proposal is clamped into the search box. A proposal the objective
//! cannot score maps to `FitKey::worst()` and is simply never accepted.

use std::cmp::Ordering;

use nalgebra::Vector4;

use crate::domain::{HspCandidate, SearchBounds};

/// Reflection, expansion, contraction and shrink coefficients.
const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Polishing passes after convergence; each one shrinks the simplex edge.
const POLISH_ROUNDS: usize = 3;
const POLISH_STEP_RATIO: f64 = 0.25;

/// Objective value: score first, radius as tie-breaker (smaller is better).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitKey {
    pub score: f64,
    pub r0: f64,
}

impl FitKey {
    pub fn new(score: f64, r0: f64) -> Self {
        Self { score, r0 }
    }

    pub fn worst() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY)
    }

    pub fn cmp_key(&self, other: &FitKey) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.r0.total_cmp(&other.r0))
    }

    pub fn is_better_than(&self, other: &FitKey) -> bool {
        self.cmp_key(other) == Ordering::Less
    }
}

/// Knobs for a single local search.
#[derive(Debug, Clone, Copy)]
pub struct SimplexOptions {
    pub tolerance: f64,
    pub patience: usize,
    pub max_iterations: usize,
    /// Initial edge length as a fraction of each axis width.
    pub initial_step: f64,
    /// Rebuild smaller simplices around the optimum after converging.
    pub polish: bool,
}

/// Result of one local search.
#[derive(Debug, Clone, Copy)]
pub struct LocalOutcome {
    pub best: HspCandidate,
    pub key: FitKey,
    pub iterations: usize,
    pub converged: bool,
    /// The stop callback fired before the search finished.
    pub interrupted: bool,
}

/// Minimize `objective` from `start` inside `bounds`.
///
/// `should_stop` is polled once per iteration; when it returns `true` the search
/// ends early and reports its best vertex so far.
pub fn minimize<F, S>(
    start: HspCandidate,
    bounds: &SearchBounds,
    opts: &SimplexOptions,
    objective: F,
    should_stop: S,
) -> LocalOutcome
where
    F: Fn(&HspCandidate) -> FitKey,
    S: Fn() -> bool,
{
    let mut search = Simplex::new(start, bounds, opts.initial_step, &objective);
    let first = search.run(opts, opts.max_iterations, &objective, &should_stop);

    let mut iterations = first.iterations;
    let mut interrupted = first.interrupted;

    if opts.polish && first.converged {
        let mut step = opts.initial_step;
        for _ in 0..POLISH_ROUNDS {
            if iterations >= opts.max_iterations {
                break;
            }
            step *= POLISH_STEP_RATIO;
            let (anchor, anchor_key) = search.best();
            // The anchor is a vertex of the new simplex, so its best never gets worse.
            search = Simplex::new(anchor, bounds, step, &objective);
            let stats = search.run(opts, opts.max_iterations - iterations, &objective, &should_stop);
            iterations += stats.iterations;
            if stats.interrupted {
                interrupted = true;
                break;
            }
            if !search.best().1.is_better_than(&anchor_key) {
                break;
            }
        }
    }

    let (best, key) = search.best();
    LocalOutcome {
        best,
        key,
        iterations,
        converged: first.converged,
        interrupted,
    }
}

struct RunStats {
    iterations: usize,
    converged: bool,
    interrupted: bool,
}

struct Simplex {
    vertices: Vec<(Vector4<f64>, FitKey)>,
    lower: Vector4<f64>,
    upper: Vector4<f64>,
    widths: Vector4<f64>,
}

impl Simplex {
    fn new<F>(start: HspCandidate, bounds: &SearchBounds, step: f64, objective: &F) -> Self
    where
        F: Fn(&HspCandidate) -> FitKey,
    {
        let axes = bounds.axes();
        let lower = Vector4::from_fn(|i, _| axes[i].min);
        let upper = Vector4::from_fn(|i, _| axes[i].max);
        let widths = upper - lower;

        let mut simplex = Self {
            vertices: Vec::with_capacity(5),
            lower,
            upper,
            widths,
        };

        let x0 = simplex.clamp(Vector4::from(start.to_array()));
        simplex.push(x0, objective);
        for i in 0..4 {
            let h = step * widths[i];
            let mut x = x0;
            // Step inward when the start sits on the upper face.
            x[i] = if x0[i] + h <= upper[i] { x0[i] + h } else { x0[i] - h };
            let x = simplex.clamp(x);
            simplex.push(x, objective);
        }
        simplex.sort();
        simplex
    }

    fn push<F>(&mut self, x: Vector4<f64>, objective: &F)
    where
        F: Fn(&HspCandidate) -> FitKey,
    {
        let key = eval(&x, objective);
        self.vertices.push((x, key));
    }

    fn clamp(&self, x: Vector4<f64>) -> Vector4<f64> {
        Vector4::from_fn(|i, _| x[i].clamp(self.lower[i], self.upper[i]))
    }

    fn sort(&mut self) {
        self.vertices.sort_by(|a, b| a.1.cmp_key(&b.1));
    }

    fn best(&self) -> (HspCandidate, FitKey) {
        let (x, key) = &self.vertices[0];
        (to_candidate(x), *key)
    }

    /// Largest vertex spread relative to the box, across all axes.
    fn spread(&self) -> f64 {
        let x0 = self.vertices[0].0;
        self.vertices[1..]
            .iter()
            .map(|(x, _)| (x - x0).component_div(&self.widths).amax())
            .fold(0.0, f64::max)
    }

    fn run<F, S>(&mut self, opts: &SimplexOptions, budget: usize, objective: &F, should_stop: &S) -> RunStats
    where
        F: Fn(&HspCandidate) -> FitKey,
        S: Fn() -> bool,
    {
        let mut stalled = 0usize;
        let mut iterations = 0usize;

        while iterations < budget {
            if should_stop() {
                return RunStats {
                    iterations,
                    converged: false,
                    interrupted: true,
                };
            }

            let before = self.vertices[0].1;
            self.step(objective);
            self.sort();
            iterations += 1;

            let after = self.vertices[0].1;
            if relative_improvement(&before, &after) < opts.tolerance {
                stalled += 1;
            } else {
                stalled = 0;
            }

            if stalled >= opts.patience || self.spread() < opts.tolerance {
                return RunStats {
                    iterations,
                    converged: true,
                    interrupted: false,
                };
            }
        }

        RunStats {
            iterations,
            converged: false,
            interrupted: false,
        }
    }

    /// One Nelder–Mead move. Expects the vertices sorted best-first.
    fn step<F>(&mut self, objective: &F)
    where
        F: Fn(&HspCandidate) -> FitKey,
    {
        let n = self.vertices.len() - 1;
        let centroid = self.vertices[..n]
            .iter()
            .fold(Vector4::<f64>::zeros(), |acc, (x, _)| acc + x)
            / n as f64;

        let best = self.vertices[0].1;
        let second_worst = self.vertices[n - 1].1;
        let (worst_x, worst) = self.vertices[n];

        let xr = self.clamp(centroid + (centroid - worst_x) * ALPHA);
        let fr = eval(&xr, objective);

        if fr.is_better_than(&best) {
            let xe = self.clamp(centroid + (xr - centroid) * GAMMA);
            let fe = eval(&xe, objective);
            self.vertices[n] = if fe.is_better_than(&fr) { (xe, fe) } else { (xr, fr) };
            return;
        }

        if fr.is_better_than(&second_worst) {
            self.vertices[n] = (xr, fr);
            return;
        }

        let (xc, fc, accept) = if fr.is_better_than(&worst) {
            let xc = self.clamp(centroid + (xr - centroid) * RHO);
            let fc = eval(&xc, objective);
            (xc, fc, fc.cmp_key(&fr) != Ordering::Greater)
        } else {
            let xc = self.clamp(centroid + (worst_x - centroid) * RHO);
            let fc = eval(&xc, objective);
            (xc, fc, fc.is_better_than(&worst))
        };

        if accept {
            self.vertices[n] = (xc, fc);
            return;
        }

        let x_best = self.vertices[0].0;
        for i in 1..self.vertices.len() {
            let x = self.clamp(x_best + (self.vertices[i].0 - x_best) * SIGMA);
            let key = eval(&x, objective);
            self.vertices[i] = (x, key);
        }
    }
}

fn eval<F>(x: &Vector4<f64>, objective: &F) -> FitKey
where
    F: Fn(&HspCandidate) -> FitKey,
{
    let key = objective(&to_candidate(x));
    if key.score.is_nan() || key.r0.is_nan() {
        FitKey::worst()
    } else {
        key
    }
}

fn to_candidate(x: &Vector4<f64>) -> HspCandidate {
    HspCandidate::from_array([x[0], x[1], x[2], x[3]])
}

/// Relative progress of the best key between two iterations.
///
/// Measured on the score while it is positive, and on the radius once the score
/// has reached zero.
fn relative_improvement(before: &FitKey, after: &FitKey) -> f64 {
    if before.score > 0.0 {
        if !before.score.is_finite() {
            return if after.score.is_finite() { 1.0 } else { 0.0 };
        }
        return (before.score - after.score) / before.score;
    }
    if before.r0 > 0.0 && before.r0.is_finite() {
        return (before.r0 - after.r0) / before.r0;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SimplexOptions {
        SimplexOptions {
            tolerance: 1e-10,
            patience: 30,
            max_iterations: 2_000,
            initial_step: 0.1,
            polish: true,
        }
    }

    #[test]
    fn key_orders_by_score_then_radius() {
        let a = FitKey::new(0.0, 5.0);
        let b = FitKey::new(0.0, 6.0);
        let c = FitKey::new(0.1, 1.0);
        assert!(a.is_better_than(&b));
        assert!(b.is_better_than(&c));
        assert!(!a.is_better_than(&a));
        assert!(c.is_better_than(&FitKey::worst()));
    }

    #[test]
    fn finds_minimum_of_a_smooth_bowl() {
        let target = [19.0, 8.0, 11.0, 6.0];
        let objective = |c: &HspCandidate| {
            let v = c.to_array();
            let s: f64 = v.iter().zip(target.iter()).map(|(a, b)| (a - b).powi(2)).sum();
            FitKey::new(s, c.r0)
        };
        let out = minimize(
            HspCandidate::new(16.0, 2.0, 3.0, 20.0),
            &SearchBounds::default(),
            &opts(),
            objective,
            || false,
        );
        assert!(out.converged);
        assert!(!out.interrupted);
        let v = out.best.to_array();
        for (a, b) in v.iter().zip(target.iter()) {
            assert!((a - b).abs() < 1e-3, "{v:?} vs {target:?}");
        }
    }

    #[test]
    fn respects_bounds_when_minimum_is_outside() {
        // Unconstrained minimum at δd = 30, outside [15, 25].
        let objective = |c: &HspCandidate| {
            let s = (c.delta_d - 30.0).powi(2) + (c.delta_p - 5.0).powi(2) + (c.delta_h - 5.0).powi(2) + (c.r0 - 4.0).powi(2);
            FitKey::new(s, c.r0)
        };
        let out = minimize(
            HspCandidate::new(20.0, 10.0, 10.0, 10.0),
            &SearchBounds::default(),
            &opts(),
            objective,
            || false,
        );
        assert!(out.best.delta_d <= 25.0);
        assert!((out.best.delta_d - 25.0).abs() < 1e-3);
    }

    #[test]
    fn plateau_is_broken_by_radius() {
        // Score is zero for any R0 >= 3; the search should settle at the smallest.
        let objective = |c: &HspCandidate| {
            let s = (3.0 - c.r0).max(0.0).powi(2);
            FitKey::new(s, c.r0)
        };
        let out = minimize(
            HspCandidate::new(20.0, 10.0, 10.0, 12.0),
            &SearchBounds::default(),
            &opts(),
            objective,
            || false,
        );
        assert_eq!(out.key.score, 0.0);
        assert!((out.best.r0 - 3.0).abs() < 1e-2, "r0 = {}", out.best.r0);
    }

    #[test]
    fn stop_callback_interrupts_immediately() {
        let objective = |c: &HspCandidate| FitKey::new(c.r0, c.r0);
        let start = HspCandidate::new(20.0, 10.0, 10.0, 12.0);
        let out = minimize(start, &SearchBounds::default(), &opts(), objective, || true);
        assert!(out.interrupted);
        assert!(!out.converged);
        assert_eq!(out.iterations, 0);
        // Best of the initial simplex is still reported.
        assert!(out.key.score <= 12.0);
    }

    #[test]
    fn nan_keys_rank_as_worst() {
        let objective = |_: &HspCandidate| FitKey::new(f64::NAN, 4.0);
        let x = Vector4::new(18.0, 6.0, 6.0, 4.0);
        assert_eq!(eval(&x, &objective), FitKey::worst());
        let radius_nan = |_: &HspCandidate| FitKey::new(0.5, f64::NAN);
        assert_eq!(eval(&x, &radius_nan), FitKey::worst());
    }

    #[test]
    fn rejected_proposals_steer_the_search() {
        // Same bowl as above, with a NaN region (δp > 12) and a rejected region
        // (δh > 16). The minimum at (19, 8, 11, 6) lies inside the allowed part.
        let target = [19.0, 8.0, 11.0, 6.0];
        let objective = |c: &HspCandidate| {
            let v = c.to_array();
            let s: f64 = v.iter().zip(target.iter()).map(|(a, b)| (a - b).powi(2)).sum();
            if c.delta_p > 12.0 {
                FitKey::new(f64::NAN, c.r0)
            } else if c.delta_h > 16.0 {
                FitKey::worst()
            } else {
                FitKey::new(s, c.r0)
            }
        };
        let out = minimize(
            HspCandidate::new(16.0, 2.0, 3.0, 20.0),
            &SearchBounds::default(),
            &opts(),
            objective,
            || false,
        );
        assert!(out.key.score.is_finite());
        assert!(out.best.delta_p <= 12.0 && out.best.delta_h <= 16.0, "{:?}", out.best);
        let v = out.best.to_array();
        for (a, b) in v.iter().zip(target.iter()) {
            assert!((a - b).abs() < 1e-2, "{v:?} vs {target:?}");
        }
    }

    #[test]
    fn exhausting_the_budget_is_not_convergence() {
        let mut o = opts();
        o.max_iterations = 3;
        o.patience = 1_000;
        o.tolerance = 1e-300;
        let objective = |c: &HspCandidate| {
            let s = (c.delta_d - 19.0).powi(2) + (c.delta_p - 8.0).powi(2) + (c.delta_h - 11.0).powi(2) + (c.r0 - 6.0).powi(2);
            FitKey::new(s, c.r0)
        };
        let out = minimize(
            HspCandidate::new(16.0, 2.0, 3.0, 20.0),
            &SearchBounds::default(),
            &o,
            objective,
            || false,
        );
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
    }
}
