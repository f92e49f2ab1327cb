//! Allocation modes, risk profiles and the `optimize` entry point.
//!
//! The allocation mode sets the weight bounds, the risk profile picks the
//! objective inside those bounds:
//!
//! | Profile | Objective |
//! |---------|-----------|
//! | conservative | minimum variance |
//! | moderate (default) | maximum Sharpe |
//! | aggressive | maximum Sharpe |
//! | custom | min variance at a target return, or max return under a volatility ceiling |
//!
//! Fallback policy: a `custom` target that is missing, infeasible or fails to
//! solve falls back to maximum Sharpe; any solver failure after that falls back
//! to equal weights. Both are recorded on [`Method`], never returned as errors.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::error::{OptimizeError, Result};
use crate::optimize::{
    equal_weights, max_return_for_volatility, max_sharpe, min_variance, min_variance_for_return,
    normalize_long_only, Bounds, SolverFailure, SolverOptions,
};
use crate::performance::{PerformanceSummary, TRADING_DAYS_PER_YEAR};
use crate::prices::{CleanPrices, PriceSeries};
use crate::stats::{portfolio_returns, Estimates};
use crate::types::{Symbol, Timestamp};

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// Weight bounds applied to every surviving asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AllocationMode {
    /// 1/N for every asset, no solver.
    Equal,
    /// Any weight in [0, 1].
    #[default]
    Unconstrained,
    /// Every asset holds at least 5%.
    #[cfg_attr(feature = "serde", serde(rename = "min-floor-5"))]
    MinFloor5,
    /// Every asset holds at least 10%.
    #[cfg_attr(feature = "serde", serde(rename = "min-floor-10"))]
    MinFloor10,
}

impl AllocationMode {
    /// Minimum weight per asset.
    pub fn floor(self) -> f64 {
        match self {
            AllocationMode::Equal | AllocationMode::Unconstrained => 0.0,
            AllocationMode::MinFloor5 => 0.05,
            AllocationMode::MinFloor10 => 0.10,
        }
    }

    pub fn bounds(self) -> Bounds {
        Bounds::with_floor(self.floor())
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMode::Equal => write!(f, "equal"),
            AllocationMode::Unconstrained => write!(f, "unconstrained"),
            AllocationMode::MinFloor5 => write!(f, "min-floor-5"),
            AllocationMode::MinFloor10 => write!(f, "min-floor-10"),
        }
    }
}

impl FromStr for AllocationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equal" | "equal-weight" => Ok(AllocationMode::Equal),
            "unconstrained" | "none" => Ok(AllocationMode::Unconstrained),
            "min-floor-5" | "floor5" | "min5" => Ok(AllocationMode::MinFloor5),
            "min-floor-10" | "floor10" | "min10" => Ok(AllocationMode::MinFloor10),
            other => Err(format!("unknown allocation mode: {other}")),
        }
    }
}

/// Investor risk profile; selects the objective function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
    Custom,
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskProfile::Conservative => write!(f, "conservative"),
            RiskProfile::Moderate => write!(f, "moderate"),
            RiskProfile::Aggressive => write!(f, "aggressive"),
            RiskProfile::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            "custom" => Ok(RiskProfile::Custom),
            other => Err(format!("unknown risk profile: {other}")),
        }
    }
}

/// The objective that actually produced the weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Objective {
    EqualWeight,
    MinVariance,
    MaxSharpe,
    TargetReturn,
    VolatilityCeiling,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::EqualWeight => write!(f, "equal-weight"),
            Objective::MinVariance => write!(f, "min-variance"),
            Objective::MaxSharpe => write!(f, "max-sharpe"),
            Objective::TargetReturn => write!(f, "target-return"),
            Objective::VolatilityCeiling => write!(f, "volatility-ceiling"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / config
// ---------------------------------------------------------------------------

/// What to optimize.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizeRequest {
    pub mode: AllocationMode,
    pub profile: RiskProfile,
    /// Annual return target for the `custom` profile.
    pub target_return: Option<f64>,
    /// Annual volatility ceiling for the `custom` profile.
    pub max_volatility: Option<f64>,
}

impl OptimizeRequest {
    pub fn new(mode: AllocationMode, profile: RiskProfile) -> Self {
        Self {
            mode,
            profile,
            target_return: None,
            max_volatility: None,
        }
    }

    pub fn with_target_return(mut self, target: f64) -> Self {
        self.target_return = Some(target);
        self
    }

    pub fn with_max_volatility(mut self, ceiling: f64) -> Self {
        self.max_volatility = Some(ceiling);
        self
    }
}

/// Estimation and solver settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimizerConfig {
    /// Annual risk-free rate subtracted in the Sharpe ratio.
    pub risk_free: f64,
    /// Diagonal loading added to the covariance before solving.
    pub ridge: f64,
    pub periods_per_year: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let solver = SolverOptions::default();
        Self {
            risk_free: 0.0,
            ridge: 0.001,
            periods_per_year: TRADING_DAYS_PER_YEAR,
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
        }
    }
}

impl OptimizerConfig {
    /// Reject NaN or out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free.is_finite() {
            return Err(OptimizeError::InvalidConfig(format!(
                "risk_free must be finite, got {}",
                self.risk_free
            )));
        }
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "ridge must be >= 0 and finite, got {}",
                self.ridge
            )));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "periods_per_year must be > 0, got {}",
                self.periods_per_year
            )));
        }
        if self.max_iterations == 0 {
            return Err(OptimizeError::InvalidConfig(
                "max_iterations must be > 0".into(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "tolerance must be >= 0 and finite, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Optimized weights keyed by symbol, in symbol order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetWeights {
    weights: Vec<(Symbol, f64)>,
}

impl AssetWeights {
    pub fn new(mut weights: Vec<(Symbol, f64)>) -> Self {
        weights.sort_by_key(|(sym, _)| *sym);
        Self { weights }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.weights
            .binary_search_by_key(symbol, |(s, _)| *s)
            .ok()
            .map(|i| self.weights[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.weights.iter().copied()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.weights.iter().map(|(s, _)| *s).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.weights.iter().map(|(_, w)| *w).collect()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Pairs suitable for a rebalance target.
    pub fn as_pairs(&self) -> &[(Symbol, f64)] {
        &self.weights
    }
}

/// How an allocation was produced.
///
/// `Display` renders the human-readable method label, e.g.
/// `max-sharpe (moderate), floor 5%` or
/// `equal-weight (conservative), unconstrained; solver failed (...), fell back to equal weight`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Method {
    pub profile: RiskProfile,
    pub mode: AllocationMode,
    pub objective: Objective,
    /// Why a `custom` target was abandoned for maximum Sharpe.
    pub custom_fallback: Option<SolverFailure>,
    /// Why the solver result was abandoned for equal weights.
    pub solver_fallback: Option<SolverFailure>,
}

impl Method {
    /// True if any fallback happened.
    pub fn is_fallback(&self) -> bool {
        self.custom_fallback.is_some() || self.solver_fallback.is_some()
    }

    /// The label as an owned string.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}), ", self.objective, self.profile)?;
        match self.mode {
            AllocationMode::Equal => write!(f, "equal allocation")?,
            AllocationMode::Unconstrained => write!(f, "unconstrained")?,
            mode => write!(f, "floor {:.0}%", mode.floor() * 100.0)?,
        }
        if let Some(reason) = &self.custom_fallback {
            write!(f, "; custom target unusable ({reason}), used max-sharpe")?;
        }
        if let Some(reason) = &self.solver_fallback {
            write!(f, "; solver failed ({reason}), fell back to equal weight")?;
        }
        Ok(())
    }
}

/// Result of one optimization run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation {
    pub weights: AssetWeights,
    pub performance: PerformanceSummary,
    pub method: Method,
    /// Symbols removed during cleaning.
    pub dropped: Vec<Symbol>,
    /// First and last timestamp of the price window.
    pub window: (Timestamp, Timestamp),
    pub observations: usize,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Weights")?;
        for (sym, w) in self.weights.iter() {
            writeln!(f, "  {sym:<16} {:>7.2}%", w * 100.0)?;
        }
        if !self.dropped.is_empty() {
            let names: Vec<&str> = self.dropped.iter().map(|s| s.as_str()).collect();
            writeln!(f, "Dropped: {}", names.join(", "))?;
        }
        write!(f, "{}", self.performance)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Clean `prices` and compute an allocation.
///
/// Fails only on bad input ([`OptimizeError::InsufficientData`],
/// [`OptimizeError::InvalidConfig`]); numerical failures degrade to equal
/// weights and are reported on [`Allocation::method`].
pub fn optimize(
    prices: &PriceSeries,
    request: &OptimizeRequest,
    config: &OptimizerConfig,
) -> Result<Allocation> {
    config.validate()?;
    let clean = prices.clean()?;
    Ok(optimize_clean(&clean, request, config))
}

/// Compute an allocation from an already-cleaned price matrix.
pub fn optimize_clean(
    clean: &CleanPrices,
    request: &OptimizeRequest,
    config: &OptimizerConfig,
) -> Allocation {
    let returns = clean.returns();
    let estimates = Estimates::from_returns(&returns, config.periods_per_year);
    let n = estimates.num_assets();

    let mut custom_fallback = None;
    let mut solver_fallback = None;

    let (weights, objective) = if request.mode == AllocationMode::Equal {
        (equal_weights(n), Objective::EqualWeight)
    } else {
        let cov = estimates.regularized_cov(config.ridge);
        let solved = solve_profile(
            &estimates.mu,
            &cov,
            request,
            config,
            &mut custom_fallback,
        );
        match solved.and_then(|(w, objective)| sanitize(w, request.mode).map(|w| (w, objective))) {
            Ok(found) => found,
            Err(reason) => {
                warn!(
                    "{} / {} solve failed ({reason}); falling back to equal weight",
                    request.profile, request.mode
                );
                solver_fallback = Some(reason);
                (equal_weights(n), Objective::EqualWeight)
            }
        }
    };

    let performance = if objective == Objective::EqualWeight {
        PerformanceSummary::from_return_series(
            &portfolio_returns(&returns, &weights),
            config.periods_per_year,
            config.risk_free,
        )
        .unwrap_or_else(|| {
            PerformanceSummary::from_weights(&weights, &estimates.mu, &estimates.cov, config.risk_free)
        })
    } else {
        PerformanceSummary::from_weights(&weights, &estimates.mu, &estimates.cov, config.risk_free)
    };

    let method = Method {
        profile: request.profile,
        mode: request.mode,
        objective,
        custom_fallback,
        solver_fallback,
    };
    debug!("optimized {n} assets: {method}");

    Allocation {
        weights: AssetWeights::new(clean.symbols().iter().copied().zip(weights).collect()),
        performance,
        method,
        dropped: clean.dropped().iter().map(|d| d.symbol).collect(),
        window: clean.window(),
        observations: clean.num_observations(),
    }
}

fn solve_profile(
    mu: &[f64],
    cov: &[Vec<f64>],
    request: &OptimizeRequest,
    config: &OptimizerConfig,
    custom_fallback: &mut Option<SolverFailure>,
) -> std::result::Result<(Vec<f64>, Objective), SolverFailure> {
    let bounds = request.mode.bounds();
    let opts = config.solver_options();

    match request.profile {
        RiskProfile::Conservative => {
            min_variance(cov, bounds, &opts).map(|w| (w, Objective::MinVariance))
        }
        RiskProfile::Moderate | RiskProfile::Aggressive => {
            max_sharpe(mu, cov, bounds, config.risk_free, &opts)
                .map(|w| (w, Objective::MaxSharpe))
        }
        RiskProfile::Custom => {
            let custom = if let Some(target) = request.target_return {
                min_variance_for_return(mu, cov, bounds, target, &opts)
                    .map(|w| (w, Objective::TargetReturn))
            } else if let Some(ceiling) = request.max_volatility {
                max_return_for_volatility(mu, cov, bounds, ceiling, &opts)
                    .map(|w| (w, Objective::VolatilityCeiling))
            } else {
                Err(SolverFailure::MissingTarget)
            };

            custom.or_else(|reason| {
                debug!("custom target unusable ({reason}); using max-sharpe");
                *custom_fallback = Some(reason);
                max_sharpe(mu, cov, bounds, config.risk_free, &opts)
                    .map(|w| (w, Objective::MaxSharpe))
            })
        }
    }
}

/// Renormalize solver output and confirm it still honours the floor.
fn sanitize(w: Vec<f64>, mode: AllocationMode) -> std::result::Result<Vec<f64>, SolverFailure> {
    if w.iter().any(|x| !x.is_finite()) {
        return Err(SolverFailure::NonFinite);
    }
    let w = normalize_long_only(w);
    let floor = mode.floor();
    if w.iter().any(|x| *x < floor - 1e-9) {
        return Err(SolverFailure::InfeasibleBounds {
            assets: w.len(),
            lower: floor,
            upper: 1.0,
        });
    }
    Ok(w)
}
