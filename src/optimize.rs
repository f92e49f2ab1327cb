//! Long-only mean-variance solvers on the bounded simplex.
//!
//! Every solver searches `{w : Σw = 1, lower ≤ wᵢ ≤ upper}` and either returns
//! weights in that set or a [`SolverFailure`]. Inputs are annualized expected
//! returns `mu` and a (regularized) covariance matrix `cov`; neither is checked
//! for shape here, [`optimize`](fn@crate::optimize) builds them consistently.
//!
//! Methods:
//! - minimum variance: accelerated projected gradient (FISTA with restart),
//! - maximum Sharpe: projected gradient ascent with Armijo backtracking,
//! - target return: augmented Lagrangian on `μᵀw = r*` around the min-variance solver,
//! - volatility ceiling: bisection on risk aversion `γ` of `max μᵀw − γ wᵀΣw`.

use crate::stats::{dot, mat_vec_mul, quadratic_form};

/// Per-asset weight bounds shared by every asset.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// `[0, 1]`: any long-only allocation.
    pub const LONG_ONLY: Bounds = Bounds {
        lower: 0.0,
        upper: 1.0,
    };

    /// Bounds with a minimum weight per asset and no cap.
    pub fn with_floor(lower: f64) -> Self {
        Self { lower, upper: 1.0 }
    }

    /// True if some fully-invested allocation of `n` assets satisfies the bounds.
    pub fn is_feasible(&self, n: usize) -> bool {
        let n = n as f64;
        n > 0.0
            && self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower >= 0.0
            && self.lower <= self.upper
            && self.lower * n <= 1.0 + 1e-12
            && self.upper * n >= 1.0 - 1e-12
    }

    fn check(&self, n: usize) -> Result<(), SolverFailure> {
        if self.is_feasible(n) {
            Ok(())
        } else {
            Err(SolverFailure::InfeasibleBounds {
                assets: n,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Iteration limits for the iterative solvers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Stop when an iteration moves the weights by less than this (Euclidean norm).
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 20_000,
            tolerance: 1e-10,
        }
    }
}

/// Why a solver could not produce an allocation.
///
/// Never surfaced as an error to callers of [`optimize`](fn@crate::optimize);
/// recorded on the result's [`Method`](crate::Method) instead.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverFailure {
    #[error("weight bounds [{lower}, {upper}] are infeasible for {assets} assets")]
    InfeasibleBounds { assets: usize, lower: f64, upper: f64 },

    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("no feasible allocation has a positive excess return")]
    NoPositiveExcessReturn,

    #[error("target return {target:.4} outside achievable range [{min:.4}, {max:.4}]")]
    TargetReturnOutOfRange { target: f64, min: f64, max: f64 },

    #[error("volatility ceiling {ceiling:.4} below minimum achievable {minimum:.4}")]
    VolatilityBelowMinimum { ceiling: f64, minimum: f64 },

    #[error("no target return or volatility ceiling given")]
    MissingTarget,

    #[error("solver produced non-finite weights")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// Minimum variance
// ---------------------------------------------------------------------------

/// Minimize `wᵀΣw` on the bounded simplex.
pub fn min_variance(
    cov: &[Vec<f64>],
    bounds: Bounds,
    opts: &SolverOptions,
) -> Result<Vec<f64>, SolverFailure> {
    let n = cov.len();
    bounds.check(n)?;

    let lipschitz = 2.0 * lipschitz_bound(cov);
    minimize_projected(equal_weights(n), bounds, lipschitz, opts, |w| {
        mat_vec_mul(cov, w).into_iter().map(|g| 2.0 * g).collect()
    })
}

// ---------------------------------------------------------------------------
// Maximum Sharpe
// ---------------------------------------------------------------------------

const MAX_ASCENT_STEP: f64 = 1e3;
const MIN_ASCENT_STEP: f64 = 1e-14;
const ARMIJO: f64 = 1e-4;

/// Maximize `(μ − r_f)ᵀw / √(wᵀΣw)` on the bounded simplex.
///
/// Fails with [`SolverFailure::NoPositiveExcessReturn`] when no feasible
/// allocation beats the risk-free rate, since the ratio is then meaningless.
pub fn max_sharpe(
    mu: &[f64],
    cov: &[Vec<f64>],
    bounds: Bounds,
    risk_free: f64,
    opts: &SolverOptions,
) -> Result<Vec<f64>, SolverFailure> {
    let n = mu.len();
    bounds.check(n)?;

    let excess: Vec<f64> = mu.iter().map(|m| m - risk_free).collect();
    let best = extreme_portfolio(&excess, bounds, true);
    if !(dot(&excess, &best) > 0.0) {
        return Err(SolverFailure::NoPositiveExcessReturn);
    }

    let sharpe = |w: &[f64]| {
        let var = quadratic_form(cov, w).max(1e-18);
        dot(&excess, w) / var.sqrt()
    };
    let gradient = |w: &[f64]| -> Vec<f64> {
        let sigma_w = mat_vec_mul(cov, w);
        let var = dot(w, &sigma_w).max(1e-18);
        let vol = var.sqrt();
        let num = dot(&excess, w);
        excess
            .iter()
            .zip(&sigma_w)
            .map(|(a, sw)| a / vol - num * sw / (var * vol))
            .collect()
    };

    // Sharpe is pseudo-concave where the numerator is positive, so start there.
    let start = project_bounded_simplex(&equal_weights(n), bounds)?;
    let mut w = if dot(&excess, &start) > 0.0 { start } else { best };
    let mut step = 1.0_f64;

    for _ in 0..opts.max_iterations {
        let grad = gradient(&w);
        let current = sharpe(&w);

        let mut accepted = None;
        let mut trial = (step * 2.0).min(MAX_ASCENT_STEP);
        while trial > MIN_ASCENT_STEP {
            let candidate: Vec<f64> = w.iter().zip(&grad).map(|(wi, gi)| wi + trial * gi).collect();
            let candidate = project_bounded_simplex(&candidate, bounds)?;
            let direction: Vec<f64> = candidate.iter().zip(&w).map(|(c, o)| c - o).collect();
            let predicted = dot(&grad, &direction);
            if sharpe(&candidate) - current >= ARMIJO * predicted {
                accepted = Some((candidate, trial));
                break;
            }
            trial *= 0.5;
        }

        // No step improves the ratio: numerically stationary.
        let Some((next, used)) = accepted else {
            return finite(w);
        };

        let moved = squared_distance(&next, &w).sqrt();
        w = next;
        step = used;
        if moved < opts.tolerance {
            return finite(w);
        }
    }

    Err(SolverFailure::NotConverged {
        iterations: opts.max_iterations,
    })
}

// ---------------------------------------------------------------------------
// Efficient-frontier points
// ---------------------------------------------------------------------------

/// Minimize `wᵀΣw` subject to `μᵀw = target` on the bounded simplex.
pub fn min_variance_for_return(
    mu: &[f64],
    cov: &[Vec<f64>],
    bounds: Bounds,
    target: f64,
    opts: &SolverOptions,
) -> Result<Vec<f64>, SolverFailure> {
    let n = mu.len();
    bounds.check(n)?;
    if !target.is_finite() {
        return Err(SolverFailure::MissingTarget);
    }

    let (min, max) = return_range(mu, bounds);
    if target < min - 1e-12 || target > max + 1e-12 {
        return Err(SolverFailure::TargetReturnOutOfRange { target, min, max });
    }

    let mut w = min_variance(cov, bounds, opts)?;
    if max - min < 1e-12 {
        // Every feasible allocation earns the same return.
        return Ok(w);
    }

    let mu_norm2 = dot(mu, mu).max(1e-18);
    let cov_lipschitz = 2.0 * lipschitz_bound(cov);
    let rho = 10.0 * cov_lipschitz / mu_norm2;
    let mut multiplier = 0.0_f64;

    for _ in 0..50 {
        let nu = multiplier;
        w = minimize_projected(w, bounds, cov_lipschitz + rho * mu_norm2, opts, |x| {
            let gap = dot(mu, x) - target;
            mat_vec_mul(cov, x)
                .into_iter()
                .zip(mu)
                .map(|(sx, m)| 2.0 * sx + (nu + rho * gap) * m)
                .collect()
        })?;

        let gap = dot(mu, &w) - target;
        if gap.abs() <= 1e-8 * (1.0 + target.abs()) {
            return Ok(w);
        }
        multiplier += rho * gap;
    }

    Err(SolverFailure::NotConverged {
        iterations: opts.max_iterations,
    })
}

/// Maximize `μᵀw` subject to `√(wᵀΣw) ≤ ceiling` on the bounded simplex.
pub fn max_return_for_volatility(
    mu: &[f64],
    cov: &[Vec<f64>],
    bounds: Bounds,
    ceiling: f64,
    opts: &SolverOptions,
) -> Result<Vec<f64>, SolverFailure> {
    let n = mu.len();
    bounds.check(n)?;
    if ceiling.is_nan() {
        return Err(SolverFailure::MissingTarget);
    }

    let vol = |w: &[f64]| quadratic_form(cov, w).max(0.0).sqrt();

    let w_min = min_variance(cov, bounds, opts)?;
    let minimum = vol(&w_min);
    if ceiling < minimum - 1e-12 {
        return Err(SolverFailure::VolatilityBelowMinimum { ceiling, minimum });
    }

    let w_max = extreme_portfolio(mu, bounds, true);
    if vol(&w_max) <= ceiling {
        return Ok(w_max);
    }

    // Points on the frontier: argmin γ·wᵀΣw − μᵀw. Volatility falls as γ grows.
    let cov_lipschitz = 2.0 * lipschitz_bound(cov);
    let frontier = |gamma: f64, start: Vec<f64>| {
        minimize_projected(start, bounds, gamma * cov_lipschitz, opts, |x| {
            mat_vec_mul(cov, x)
                .into_iter()
                .zip(mu)
                .map(|(sx, m)| 2.0 * gamma * sx - m)
                .collect()
        })
    };

    let mut gamma_hi = 1.0_f64;
    let mut w_hi = frontier(gamma_hi, w_min.clone())?;
    while vol(&w_hi) > ceiling {
        gamma_hi *= 4.0;
        if gamma_hi > 1e12 {
            return Ok(w_min);
        }
        w_hi = frontier(gamma_hi, w_hi)?;
    }

    let mut gamma_lo = gamma_hi / 4.0;
    loop {
        let w_lo = frontier(gamma_lo, w_hi.clone())?;
        if vol(&w_lo) > ceiling {
            break;
        }
        gamma_hi = gamma_lo;
        w_hi = w_lo;
        gamma_lo /= 4.0;
        if gamma_lo < 1e-10 {
            return Ok(w_hi);
        }
    }

    // Smallest γ whose frontier point respects the ceiling.
    for _ in 0..100 {
        if gamma_hi / gamma_lo < 1.0 + 1e-9 {
            break;
        }
        let mid = (gamma_lo * gamma_hi).sqrt();
        let w_mid = frontier(mid, w_hi.clone())?;
        if vol(&w_mid) <= ceiling {
            gamma_hi = mid;
            w_hi = w_mid;
        } else {
            gamma_lo = mid;
        }
    }

    Ok(w_hi)
}

/// Lowest and highest `μᵀw` achievable on the bounded simplex.
pub fn return_range(mu: &[f64], bounds: Bounds) -> (f64, f64) {
    let low = extreme_portfolio(mu, bounds, false);
    let high = extreme_portfolio(mu, bounds, true);
    (dot(mu, &low), dot(mu, &high))
}

/// Greedy vertex: every asset at the floor, the remaining budget poured into
/// the best (or worst) assets up to the cap.
fn extreme_portfolio(mu: &[f64], bounds: Bounds, highest: bool) -> Vec<f64> {
    let n = mu.len();
    let mut w = vec![bounds.lower; n];
    let mut budget = 1.0 - bounds.lower * n as f64;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| mu[b].partial_cmp(&mu[a]).unwrap_or(std::cmp::Ordering::Equal));
    if !highest {
        order.reverse();
    }

    for i in order {
        if budget <= 0.0 {
            break;
        }
        let add = (bounds.upper - bounds.lower).min(budget);
        w[i] += add;
        budget -= add;
    }
    w
}

// ---------------------------------------------------------------------------
// Shared machinery
// ---------------------------------------------------------------------------

/// Accelerated projected gradient descent with gradient-based restart.
fn minimize_projected<G>(
    start: Vec<f64>,
    bounds: Bounds,
    lipschitz: f64,
    opts: &SolverOptions,
    gradient: G,
) -> Result<Vec<f64>, SolverFailure>
where
    G: Fn(&[f64]) -> Vec<f64>,
{
    let step = 1.0 / lipschitz.max(1e-12);
    let mut x = project_bounded_simplex(&start, bounds)?;
    let mut y = x.clone();
    let mut t = 1.0_f64;

    for _ in 0..opts.max_iterations {
        let grad = gradient(&y);
        let candidate: Vec<f64> = y.iter().zip(&grad).map(|(yi, gi)| yi - step * gi).collect();
        let next = project_bounded_simplex(&candidate, bounds)?;

        if squared_distance(&next, &y).sqrt() < opts.tolerance {
            return finite(next);
        }

        // Restart momentum when it points uphill.
        let uphill: f64 = y
            .iter()
            .zip(&next)
            .zip(&x)
            .map(|((yi, ni), xi)| (yi - ni) * (ni - xi))
            .sum();
        if uphill > 0.0 {
            t = 1.0;
        }

        let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
        let momentum = (t - 1.0) / t_next;
        y = next
            .iter()
            .zip(&x)
            .map(|(ni, xi)| ni + momentum * (ni - xi))
            .collect();
        x = next;
        t = t_next;
    }

    Err(SolverFailure::NotConverged {
        iterations: opts.max_iterations,
    })
}

/// Euclidean projection onto `{w : Σw = 1, lower ≤ wᵢ ≤ upper}`.
///
/// The projection is `clamp(vᵢ − θ)` for the unique shift `θ` that makes the
/// weights sum to one; `θ` is found by bisection.
pub fn project_bounded_simplex(v: &[f64], bounds: Bounds) -> Result<Vec<f64>, SolverFailure> {
    bounds.check(v.len())?;
    if v.iter().any(|x| !x.is_finite()) {
        return Err(SolverFailure::NonFinite);
    }

    let Bounds { lower, upper } = bounds;
    let total = |theta: f64| v.iter().map(|x| (x - theta).clamp(lower, upper)).sum::<f64>();

    let max_v = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_v = v.iter().copied().fold(f64::INFINITY, f64::min);
    // total(lo) = n·upper ≥ 1 and total(hi) = n·lower ≤ 1.
    let mut lo = min_v - upper;
    let mut hi = max_v - lower;

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if total(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let theta = 0.5 * (lo + hi);
    let mut w: Vec<f64> = v.iter().map(|x| (x - theta).clamp(lower, upper)).collect();

    // Spread the bisection residual over the coordinates not pinned to a bound.
    let residual = 1.0 - w.iter().sum::<f64>();
    let free: Vec<usize> = (0..w.len())
        .filter(|&i| w[i] > lower && w[i] < upper)
        .collect();
    if !free.is_empty() {
        let share = residual / free.len() as f64;
        for i in free {
            w[i] = (w[i] + share).clamp(lower, upper);
        }
    }

    Ok(w)
}

/// Upper bound on the largest eigenvalue: min of trace and Gershgorin radius.
fn lipschitz_bound(cov: &[Vec<f64>]) -> f64 {
    let trace: f64 = cov.iter().enumerate().map(|(i, row)| row[i]).sum();
    let gershgorin = cov
        .iter()
        .map(|row| row.iter().map(|c| c.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    trace.min(gershgorin).max(1e-12)
}

fn finite(w: Vec<f64>) -> Result<Vec<f64>, SolverFailure> {
    if w.iter().all(|x| x.is_finite()) {
        Ok(w)
    } else {
        Err(SolverFailure::NonFinite)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
}

/// `1/n` for each of `n` assets.
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Zero out negative or non-finite entries and rescale to sum to one.
///
/// Falls back to equal weights if nothing positive remains.
pub fn normalize_long_only(mut w: Vec<f64>) -> Vec<f64> {
    if w.is_empty() {
        return w;
    }

    for x in &mut w {
        if !x.is_finite() || *x < 0.0 {
            *x = 0.0;
        }
    }

    let sum = w.iter().sum::<f64>();
    if sum <= 1e-12 {
        return equal_weights(w.len());
    }

    for x in &mut w {
        *x /= sum;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(values: &[f64]) -> Vec<Vec<f64>> {
        let n = values.len();
        (0..n)
            .map(|i| (0..n).map(|j| if i == j { values[i] } else { 0.0 }).collect())
            .collect()
    }

    fn correlated() -> (Vec<f64>, Vec<Vec<f64>>) {
        let mu = vec![0.08, 0.12, 0.05, 0.15];
        let cov = vec![
            vec![0.040, 0.006, 0.002, 0.010],
            vec![0.006, 0.090, 0.004, 0.020],
            vec![0.002, 0.004, 0.020, 0.003],
            vec![0.010, 0.020, 0.003, 0.160],
        ];
        (mu, cov)
    }

    fn assert_valid(w: &[f64], bounds: Bounds) {
        let s: f64 = w.iter().sum();
        assert!((s - 1.0).abs() < 1e-9, "sum={s}");
        for x in w {
            assert!(*x >= bounds.lower - 1e-9 && *x <= bounds.upper + 1e-9, "w={x}");
        }
    }

    fn assert_close(got: &[f64], expected: &[f64], atol: f64) {
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() <= atol, "got={got:?} expected={expected:?}");
        }
    }

    #[test]
    fn projection_of_feasible_point_is_identity() {
        let w = project_bounded_simplex(&[0.2, 0.3, 0.5], Bounds::LONG_ONLY).unwrap();
        assert_close(&w, &[0.2, 0.3, 0.5], 1e-12);
    }

    #[test]
    fn projection_matches_simplex_formula() {
        // Sort-based simplex projection of (0.9, 0.6, -0.5): θ = 0.25.
        let w = project_bounded_simplex(&[0.9, 0.6, -0.5], Bounds::LONG_ONLY).unwrap();
        assert_close(&w, &[0.65, 0.35, 0.0], 1e-12);
    }

    #[test]
    fn projection_respects_floor() {
        let bounds = Bounds::with_floor(0.1);
        let w = project_bounded_simplex(&[5.0, 0.0, -3.0, 0.0], bounds).unwrap();
        assert_valid(&w, bounds);
        assert_close(&w, &[0.7, 0.1, 0.1, 0.1], 1e-12);
    }

    #[test]
    fn infeasible_bounds_rejected() {
        let bounds = Bounds::with_floor(0.1);
        let err = project_bounded_simplex(&[0.0; 11], bounds).unwrap_err();
        assert!(matches!(err, SolverFailure::InfeasibleBounds { assets: 11, .. }));
        assert!(Bounds::with_floor(0.1).is_feasible(10));
    }

    #[test]
    fn min_variance_uncorrelated_is_inverse_variance() {
        let cov = diag(&[0.04, 0.09]);
        let w = min_variance(&cov, Bounds::LONG_ONLY, &SolverOptions::default()).unwrap();
        let inv = [1.0 / 0.04, 1.0 / 0.09];
        let s = inv[0] + inv[1];
        assert_close(&w, &[inv[0] / s, inv[1] / s], 1e-7);
    }

    #[test]
    fn min_variance_correlated_beats_equal_weight() {
        let (_, cov) = correlated();
        let w = min_variance(&cov, Bounds::LONG_ONLY, &SolverOptions::default()).unwrap();
        assert_valid(&w, Bounds::LONG_ONLY);
        assert!(quadratic_form(&cov, &w) <= quadratic_form(&cov, &equal_weights(4)));
    }

    #[test]
    fn max_sharpe_uncorrelated_is_proportional() {
        // w ∝ Σ⁻¹μ = (2.5, 1.6667) → (0.6, 0.4)
        let cov = diag(&[0.04, 0.09]);
        let w = max_sharpe(&[0.10, 0.15], &cov, Bounds::LONG_ONLY, 0.0, &SolverOptions::default())
            .unwrap();
        assert_close(&w, &[0.6, 0.4], 1e-5);
    }

    #[test]
    fn max_sharpe_beats_min_variance_ratio() {
        let (mu, cov) = correlated();
        let opts = SolverOptions::default();
        let ms = max_sharpe(&mu, &cov, Bounds::LONG_ONLY, 0.0, &opts).unwrap();
        let mv = min_variance(&cov, Bounds::LONG_ONLY, &opts).unwrap();
        let ratio = |w: &[f64]| dot(&mu, w) / quadratic_form(&cov, w).sqrt();
        assert_valid(&ms, Bounds::LONG_ONLY);
        assert!(ratio(&ms) >= ratio(&mv) - 1e-9);
    }

    #[test]
    fn max_sharpe_respects_floor() {
        let bounds = Bounds::with_floor(0.1);
        let cov = diag(&[0.04, 0.04, 0.04]);
        let w = max_sharpe(&[0.30, 0.01, 0.01], &cov, bounds, 0.0, &SolverOptions::default())
            .unwrap();
        assert_valid(&w, bounds);
        assert!(w[0] > w[1]);
    }

    #[test]
    fn max_sharpe_needs_positive_excess() {
        let cov = diag(&[0.04, 0.09]);
        let err = max_sharpe(
            &[-0.05, -0.01],
            &cov,
            Bounds::LONG_ONLY,
            0.0,
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, SolverFailure::NoPositiveExcessReturn);
    }

    #[test]
    fn return_range_with_floor() {
        let (lo, hi) = return_range(&[0.10, 0.20, 0.30], Bounds::with_floor(0.1));
        // high: 0.1 / 0.1 / 0.8 ; low: 0.8 / 0.1 / 0.1
        assert!((hi - (0.01 + 0.02 + 0.24)).abs() < 1e-12);
        assert!((lo - (0.08 + 0.02 + 0.03)).abs() < 1e-12);
    }

    #[test]
    fn target_return_is_met() {
        let (mu, cov) = correlated();
        let w = min_variance_for_return(&mu, &cov, Bounds::LONG_ONLY, 0.11, &SolverOptions::default())
            .unwrap();
        assert_valid(&w, Bounds::LONG_ONLY);
        assert!((dot(&mu, &w) - 0.11).abs() < 1e-6);
    }

    #[test]
    fn target_return_out_of_range() {
        let (mu, cov) = correlated();
        let err = min_variance_for_return(&mu, &cov, Bounds::LONG_ONLY, 0.50, &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, SolverFailure::TargetReturnOutOfRange { .. }));
    }

    #[test]
    fn volatility_ceiling_binds() {
        let (mu, cov) = correlated();
        let opts = SolverOptions::default();
        let ceiling = 0.20;
        let w = max_return_for_volatility(&mu, &cov, Bounds::LONG_ONLY, ceiling, &opts).unwrap();
        assert_valid(&w, Bounds::LONG_ONLY);
        let vol = quadratic_form(&cov, &w).sqrt();
        assert!(vol <= ceiling + 1e-9, "vol={vol}");
        assert!(vol > ceiling - 1e-3, "ceiling should bind, vol={vol}");
    }

    #[test]
    fn loose_volatility_ceiling_returns_max_return_vertex() {
        let (mu, cov) = correlated();
        let w =
            max_return_for_volatility(&mu, &cov, Bounds::LONG_ONLY, 10.0, &SolverOptions::default())
                .unwrap();
        assert_close(&w, &[0.0, 0.0, 0.0, 1.0], 0.0);
    }

    #[test]
    fn volatility_ceiling_below_minimum() {
        let (mu, cov) = correlated();
        let err =
            max_return_for_volatility(&mu, &cov, Bounds::LONG_ONLY, 0.01, &SolverOptions::default())
                .unwrap_err();
        assert!(matches!(err, SolverFailure::VolatilityBelowMinimum { .. }));
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let (_, cov) = correlated();
        let opts = SolverOptions {
            max_iterations: 1,
            tolerance: 0.0,
        };
        let err = min_variance(&cov, Bounds::LONG_ONLY, &opts).unwrap_err();
        assert_eq!(err, SolverFailure::NotConverged { iterations: 1 });
    }

    #[test]
    fn normalize_handles_degenerate_input() {
        assert_eq!(normalize_long_only(vec![0.0, -1.0]), vec![0.5, 0.5]);
        assert_eq!(normalize_long_only(vec![2.0, f64::NAN, 2.0]), vec![0.5, 0.0, 0.5]);
        assert!(normalize_long_only(Vec::new()).is_empty());
    }
}
