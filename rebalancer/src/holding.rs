//! Current positions (holdings.json) loading, saving and validation.

use std::path::Path;

use allocbook::Symbol;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One position held by the investor. Never mutated by the rebalancer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    /// Whole shares held; fractional shares are not representable.
    pub shares: u64,
    /// Average cost per share, strictly positive.
    pub unit_cost: f64,
}

impl Holding {
    /// Create a validated holding.
    pub fn new(symbol: Symbol, shares: u64, unit_cost: f64) -> Result<Self> {
        let holding = Self {
            symbol,
            shares,
            unit_cost,
        };
        holding.validate()?;
        Ok(holding)
    }

    fn validate(&self) -> Result<()> {
        if !self.unit_cost.is_finite() || self.unit_cost <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "unit cost for {} must be > 0, got {}",
                self.symbol, self.unit_cost
            )));
        }
        Ok(())
    }

    /// Total amount paid for the position.
    pub fn cost_basis(&self) -> f64 {
        self.shares as f64 * self.unit_cost
    }

    /// Gain (or loss) against cost at `price`.
    pub fn unrealized_gain(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.unit_cost)
    }
}

/// Check every holding; used before a plan is computed.
pub fn validate_holdings(holdings: &[Holding]) -> Result<()> {
    holdings.iter().try_for_each(Holding::validate)
}

/// Parse a JSON array of holdings.
pub fn holdings_from_json(json: &str) -> Result<Vec<Holding>> {
    let holdings: Vec<Holding> = serde_json::from_str(json)?;
    validate_holdings(&holdings)?;
    Ok(holdings)
}

/// Load and validate a holdings.json file.
pub fn load_holdings(path: &Path) -> Result<Vec<Holding>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    holdings_from_json(&contents)
}

/// Write holdings as a pretty-printed JSON array.
pub fn save_holdings(holdings: &[Holding], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(holdings)?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}
