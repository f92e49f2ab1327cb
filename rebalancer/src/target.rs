//! Target allocation (target.json) loading, saving and validation.

use std::path::Path;

use allocbook::{Allocation, Symbol};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed distance of the weight sum from 100%.
pub const SUM_TOLERANCE: f64 = 0.02;

/// Desired weight per ticker.
///
/// Weights are fractions in [0, 1] summing to 1 within [`SUM_TOLERANCE`].
/// Construction does not validate; [`validate`](Self::validate) does, and
/// [`rebalance`](crate::plan::rebalance) calls it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetAllocation {
    weights: Vec<(Symbol, f64)>,
}

/// On-disk form of a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TargetFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    targets: Vec<TargetPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TargetPosition {
    symbol: Symbol,
    weight: f64,
}

impl TargetAllocation {
    /// Build from `(symbol, weight)` pairs; order does not matter.
    pub fn new(pairs: impl IntoIterator<Item = (Symbol, f64)>) -> Self {
        let mut weights: Vec<(Symbol, f64)> = pairs.into_iter().collect();
        weights.sort_by_key(|(s, _)| *s);
        Self { weights }
    }

    /// Use an optimizer result as the target.
    pub fn from_allocation(allocation: &Allocation) -> Self {
        Self::new(allocation.weights.iter())
    }

    /// Parse and validate a target JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TargetFile = serde_json::from_str(json)?;
        let target = Self::new(file.targets.into_iter().map(|t| (t.symbol, t.weight)));
        target.validate()?;
        Ok(target)
    }

    /// Load and validate a target.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Write as target.json, stamped with the current time.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = TargetFile {
            timestamp: Some(Utc::now()),
            targets: self
                .weights
                .iter()
                .map(|&(symbol, weight)| TargetPosition { symbol, weight })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }

    /// Check weights and their sum.
    pub fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for &(symbol, weight) in &self.weights {
            if !seen.insert(symbol) {
                return Err(Error::InvalidTarget(format!("duplicate symbol: {symbol}")));
            }
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(Error::InvalidTarget(format!(
                    "weight for {symbol} ({weight}) must be in [0, 1]"
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE + 1e-9 {
            return Err(Error::InvalidTarget(format!(
                "weights sum to {:.2}%, expected 100% \u{b1} {:.0}%",
                sum * 100.0,
                SUM_TOLERANCE * 100.0
            )));
        }
        Ok(())
    }

    /// Target weight of `symbol`; 0 if absent.
    pub fn weight(&self, symbol: &Symbol) -> f64 {
        self.weights
            .binary_search_by_key(symbol, |(s, _)| *s)
            .map(|i| self.weights[i].1)
            .unwrap_or(0.0)
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.weights.iter().map(|(s, _)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.weights.iter().copied()
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn target(weights: &[(&str, f64)]) -> TargetAllocation {
        TargetAllocation::new(weights.iter().map(|&(s, w)| (sym(s), w)))
    }

    fn valid_json() -> &'static str {
        r#"{
            "timestamp": "2026-02-08T15:30:00Z",
            "targets": [
                { "symbol": "MSFT", "weight": 0.30 },
                { "symbol": "AAPL", "weight": 0.40 },
                { "symbol": "QQQ",  "weight": 0.30 }
            ]
        }"#
    }

    #[test]
    fn parse_valid_target() {
        let t = TargetAllocation::from_json(valid_json()).unwrap();
        assert_eq!(t.len(), 3);
        // Sorted by symbol.
        assert_eq!(t.symbols().next(), Some(sym("AAPL")));
        assert_eq!(t.weight(&sym("MSFT")), 0.30);
        assert_eq!(t.weight(&sym("SPY")), 0.0);
    }

    #[test]
    fn timestamp_is_optional() {
        let json = r#"{"targets":[{"symbol":"AAPL","weight":1.0}]}"#;
        assert!(TargetAllocation::from_json(json).is_ok());
    }

    #[test]
    fn sum_boundaries() {
        assert!(target(&[("A", 0.49), ("B", 0.49)]).validate().is_ok());
        assert!(target(&[("A", 0.51), ("B", 0.51)]).validate().is_ok());
        assert!(target(&[("A", 0.475), ("B", 0.475)]).validate().is_err());
        assert!(target(&[("A", 0.525), ("B", 0.525)]).validate().is_err());
    }

    #[test]
    fn reject_empty_target() {
        let err = TargetAllocation::default().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
    }

    #[test]
    fn reject_duplicate_symbols() {
        let json = r#"{
            "targets": [
                { "symbol": "AAPL", "weight": 0.5 },
                { "symbol": "AAPL", "weight": 0.5 }
            ]
        }"#;
        let err = TargetAllocation::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate symbol: AAPL"));
    }

    #[test]
    fn reject_weight_out_of_range() {
        assert!(target(&[("A", 1.5), ("B", -0.5)]).validate().is_err());
        assert!(target(&[("A", f64::NAN), ("B", 1.0)]).validate().is_err());
    }

    #[test]
    fn zero_weight_is_allowed() {
        assert!(target(&[("A", 1.0), ("B", 0.0)]).validate().is_ok());
    }

    #[test]
    fn reject_long_symbol() {
        let json = r#"{"targets":[{"symbol":"THIS_NAME_IS_TOO_LONG","weight":1.0}]}"#;
        assert!(matches!(TargetAllocation::from_json(json), Err(Error::Parse(_))));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.json");
        let t = target(&[("SPY", 0.6), ("AGG", 0.4)]);
        t.save(&path).unwrap();
        assert_eq!(TargetAllocation::load(&path).unwrap(), t);
    }
}
