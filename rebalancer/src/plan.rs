//! CURRENT→TARGET rebalance plan with board-lot rounding.
//!
//! Computes, per ticker in holdings ∪ target, the drift from the target
//! weight and the lot-rounded share delta that closes it, then partitions the
//! deltas into buy and sell orders and reconciles cash:
//!
//! ```text
//! net cash = total buy notional − total sell notional − new cash
//! ```
//!
//! Positive net cash is additional cash needed, zero or negative is surplus.
//! Rounding can leave residual drift; it is reported, not corrected.

use std::fmt;
use std::str::FromStr;

use allocbook::Symbol;
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::holding::{validate_holdings, Holding};
use crate::target::TargetAllocation;

/// Latest price per ticker.
pub type PriceMap = FxHashMap<Symbol, f64>;

/// Default board lot.
pub const DEFAULT_LOT_SIZE: u64 = 100;

/// Default drift threshold (5 percentage points).
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Values this close to a whole number of lots count as whole.
const LOT_SNAP: f64 = 1e-9;

/// Drift within this much of the threshold is not over it.
const DRIFT_EPS: f64 = 1e-12;

// ============================================================================
// Parameters
// ============================================================================

/// How a fractional number of lots becomes a whole number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingPolicy {
    /// Nearest lot; half a lot rounds away from zero.
    #[default]
    Nearest,
    /// Drop the partial lot, so trades never overshoot the target.
    TowardZero,
}

impl RoundingPolicy {
    /// Round `shares` to a signed multiple of `lot`.
    ///
    /// `None` when the result does not fit in an `i64` share count.
    pub fn round_to_lot(self, shares: f64, lot: u64) -> Option<i64> {
        let lot = i64::try_from(lot).ok()?;
        let lots = shares / lot as f64;
        let whole = lots.round();
        let lots = if (lots - whole).abs() < LOT_SNAP {
            whole
        } else {
            match self {
                RoundingPolicy::Nearest => whole,
                RoundingPolicy::TowardZero => lots.trunc(),
            }
        };
        if !lots.is_finite() || lots.abs() >= i64::MAX as f64 {
            return None;
        }
        (lots as i64).checked_mul(lot)
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingPolicy::Nearest => write!(f, "nearest"),
            RoundingPolicy::TowardZero => write!(f, "toward-zero"),
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(RoundingPolicy::Nearest),
            "toward-zero" | "floor" | "truncate" => Ok(RoundingPolicy::TowardZero),
            other => Err(format!("unknown rounding policy: {other}")),
        }
    }
}

/// Knobs for one rebalance run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalanceParams {
    /// Flag a ticker when |target − current weight| exceeds this fraction.
    pub drift_threshold: f64,
    /// Cash deployed this run; negative for a withdrawal.
    pub new_cash: f64,
    /// Shares per tradable lot, at least 1.
    pub lot_size: u64,
    pub rounding: RoundingPolicy,
}

impl Default for RebalanceParams {
    fn default() -> Self {
        Self {
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            new_cash: 0.0,
            lot_size: DEFAULT_LOT_SIZE,
            rounding: RoundingPolicy::Nearest,
        }
    }
}

impl RebalanceParams {
    pub fn with_new_cash(mut self, cash: f64) -> Self {
        self.new_cash = cash;
        self
    }

    pub fn with_lot_size(mut self, lot: u64) -> Self {
        self.lot_size = lot;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.lot_size == 0 {
            return Err(Error::InvalidInput("lot size must be >= 1".into()));
        }
        if !self.drift_threshold.is_finite() || self.drift_threshold < 0.0 {
            return Err(Error::InvalidInput(format!(
                "drift threshold must be >= 0, got {}",
                self.drift_threshold
            )));
        }
        if !self.new_cash.is_finite() {
            return Err(Error::InvalidInput(format!(
                "new cash must be finite, got {}",
                self.new_cash
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Before/after figures for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRow {
    pub symbol: Symbol,
    pub price: f64,
    pub current_shares: u64,
    pub current_value: f64,
    pub current_weight: f64,
    pub target_weight: f64,
    /// target − current weight
    pub drift: f64,
    pub needs_rebalance: bool,
    /// Unrounded shares needed to hit the target value.
    pub raw_delta: f64,
    /// Lot-rounded signed share change.
    pub delta_shares: i64,
    pub new_shares: u64,
    pub new_value: f64,
    pub new_weight: f64,
    /// Price was zero, negative or non-finite: excluded from weights, not traded.
    pub zero_value: bool,
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        })
    }
}

/// A single executable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub shares: u64,
    pub price: f64,
    pub notional: f64,
}

impl fmt::Display for TradeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<4} {:>8} {:<16} @ {:>10.2} = {:>14.2}",
            self.side, self.shares, self.symbol, self.price, self.notional
        )
    }
}

/// Whether the plan needs more cash than it frees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CashStatus {
    AdditionalCashNeeded(f64),
    SurplusCash(f64),
}

impl fmt::Display for CashStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashStatus::AdditionalCashNeeded(x) => write!(f, "additional cash needed: {x:.2}"),
            CashStatus::SurplusCash(x) => write!(f, "surplus cash: {x:.2}"),
        }
    }
}

/// Result of [`rebalance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalancePlan {
    /// One row per ticker, sorted by symbol.
    pub rows: Vec<PlanRow>,
    pub buys: Vec<TradeOrder>,
    pub sells: Vec<TradeOrder>,
    pub current_total: f64,
    /// current_total + new_cash
    pub new_total: f64,
    pub total_buy: f64,
    pub total_sell: f64,
    pub new_cash: f64,
    /// total_buy − total_sell − new_cash
    pub net_cash: f64,
    pub params: RebalanceParams,
}

impl RebalancePlan {
    pub fn cash_status(&self) -> CashStatus {
        if self.net_cash > 0.0 {
            CashStatus::AdditionalCashNeeded(self.net_cash)
        } else {
            CashStatus::SurplusCash(-self.net_cash)
        }
    }

    pub fn row(&self, symbol: &Symbol) -> Option<&PlanRow> {
        self.rows
            .binary_search_by_key(symbol, |r| r.symbol)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Rows whose drift exceeds the threshold.
    pub fn flagged(&self) -> impl Iterator<Item = &PlanRow> {
        self.rows.iter().filter(|r| r.needs_rebalance)
    }

    /// Rows priced at zero or with an unusable price.
    pub fn zero_value_rows(&self) -> impl Iterator<Item = &PlanRow> {
        self.rows.iter().filter(|r| r.zero_value)
    }

    /// All orders, sells first.
    pub fn orders(&self) -> impl Iterator<Item = &TradeOrder> {
        self.sells.iter().chain(&self.buys)
    }

    /// No trades and nothing over threshold.
    pub fn is_balanced(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty() && self.flagged().next().is_none()
    }
}

impl fmt::Display for RebalancePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>10} {:>8} {:>8} {:>8} {:>10} {:>10} {:>8}",
            "Symbol", "Price", "Current", "Target", "Drift", "Delta", "New", "New wt"
        )?;
        for r in &self.rows {
            let flag = if r.zero_value {
                "  zero value"
            } else if r.needs_rebalance {
                "  *"
            } else {
                ""
            };
            writeln!(
                f,
                "{:<16} {:>10.2} {:>7.2}% {:>7.2}% {:>+7.2}% {:>+10} {:>10} {:>7.2}%{flag}",
                r.symbol,
                r.price,
                r.current_weight * 100.0,
                r.target_weight * 100.0,
                r.drift * 100.0,
                r.delta_shares,
                r.new_shares,
                r.new_weight * 100.0,
            )?;
        }

        writeln!(f)?;
        if self.buys.is_empty() && self.sells.is_empty() {
            writeln!(f, "No trades (lot size {}).", self.params.lot_size)?;
        } else {
            writeln!(f, "Orders (lot size {}, {}):", self.params.lot_size, self.params.rounding)?;
            for order in self.orders() {
                writeln!(f, "  {order}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Portfolio value: {:>14.2}", self.current_total)?;
        writeln!(f, "New cash:        {:>14.2}", self.new_cash)?;
        writeln!(f, "Total buys:      {:>14.2}", self.total_buy)?;
        writeln!(f, "Total sells:     {:>14.2}", self.total_sell)?;
        write!(f, "{}", self.cash_status())
    }
}

// ============================================================================
// Algorithm
// ============================================================================

/// Plan the trades that move `holdings` toward `target`.
///
/// Preconditions, checked in order, each failing without a plan:
/// 1. holdings and target not both empty ([`Error::EmptyPortfolio`]),
/// 2. target valid ([`Error::InvalidTarget`]),
/// 3. a price for every referenced ticker ([`Error::MissingPrice`], listing all),
/// 4. sane holdings and parameters ([`Error::InvalidInput`]).
///
/// Duplicate holdings of one ticker are merged. A sell never exceeds the
/// shares held: a rounded sell past the position becomes a full exit.
pub fn rebalance(
    holdings: &[Holding],
    target: &TargetAllocation,
    prices: &PriceMap,
    params: &RebalanceParams,
) -> Result<RebalancePlan> {
    if holdings.is_empty() && target.is_empty() {
        return Err(Error::EmptyPortfolio);
    }
    target.validate()?;

    let mut shares_held: FxHashMap<Symbol, u64> = FxHashMap::default();
    for h in holdings {
        let held = shares_held.entry(h.symbol).or_default();
        *held = held.saturating_add(h.shares);
    }

    let mut universe: Vec<Symbol> = shares_held.keys().copied().chain(target.symbols()).collect();
    universe.sort_unstable();
    universe.dedup();

    let missing: Vec<Symbol> = universe
        .iter()
        .filter(|s| !prices.contains_key(*s))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingPrice(missing));
    }

    validate_holdings(holdings)?;
    params.validate()?;

    // 1-3. Current value, weight and drift.
    let mut rows: Vec<PlanRow> = universe
        .iter()
        .map(|&symbol| {
            let price = prices[&symbol];
            let zero_value = !(price.is_finite() && price > 0.0);
            let current_shares = shares_held.get(&symbol).copied().unwrap_or(0);
            let current_value = if zero_value {
                0.0
            } else {
                current_shares as f64 * price
            };
            PlanRow {
                symbol,
                price,
                current_shares,
                current_value,
                current_weight: 0.0,
                target_weight: target.weight(&symbol),
                drift: 0.0,
                needs_rebalance: false,
                raw_delta: 0.0,
                delta_shares: 0,
                new_shares: current_shares,
                new_value: current_value,
                new_weight: 0.0,
                zero_value,
            }
        })
        .collect();

    let current_total: f64 = rows.iter().map(|r| r.current_value).sum();
    for r in &mut rows {
        r.current_weight = share_of(r.current_value, current_total);
        r.drift = r.target_weight - r.current_weight;
        r.needs_rebalance = r.drift.abs() > params.drift_threshold + DRIFT_EPS;
    }

    // 4-8. Target value, lot-rounded delta, resulting position.
    let new_total = current_total + params.new_cash;
    for r in &mut rows {
        if r.zero_value {
            debug!("{}: unusable price {}, not traded", r.symbol, r.price);
            continue;
        }
        let target_value = r.target_weight * new_total;
        r.raw_delta = (target_value - r.current_value) / r.price;

        let out_of_range = || {
            Error::InvalidInput(format!(
                "{}: trade of {:.0} shares is out of range",
                r.symbol, r.raw_delta
            ))
        };
        let held = i64::try_from(r.current_shares).map_err(|_| out_of_range())?;
        let mut delta = params
            .rounding
            .round_to_lot(r.raw_delta, params.lot_size)
            .ok_or_else(out_of_range)?;
        if delta < -held {
            debug!("{}: sell of {} clamped to position of {held}", r.symbol, -delta);
            delta = -held;
        }
        let new_shares = held.checked_add(delta).ok_or_else(out_of_range)?;

        r.delta_shares = delta;
        r.new_shares = new_shares as u64;
        r.new_value = r.new_shares as f64 * r.price;
    }

    let invested: f64 = rows.iter().map(|r| r.new_value).sum();
    for r in &mut rows {
        r.new_weight = share_of(r.new_value, invested);
    }

    // 9. Orders.
    let mut buys = Vec::new();
    let mut sells = Vec::new();
    for r in &rows {
        let shares = r.delta_shares.unsigned_abs();
        let order = TradeOrder {
            symbol: r.symbol,
            side: if r.delta_shares > 0 { Side::Buy } else { Side::Sell },
            shares,
            price: r.price,
            notional: shares as f64 * r.price,
        };
        match r.delta_shares.signum() {
            1 => buys.push(order),
            -1 => sells.push(order),
            _ => {}
        }
    }

    // 10. Cash reconciliation.
    let total_buy: f64 = buys.iter().map(|o| o.notional).sum();
    let total_sell: f64 = sells.iter().map(|o| o.notional).sum();
    let net_cash = total_buy - total_sell - params.new_cash;

    Ok(RebalancePlan {
        rows,
        buys,
        sells,
        current_total,
        new_total,
        total_buy,
        total_sell,
        new_cash: params.new_cash,
        net_cash,
        params: *params,
    })
}

/// `part / whole`, or 0 when `whole` is not positive.
fn share_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}
