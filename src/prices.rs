//! Price history input and the cleaning pipeline that precedes optimization.
//!
//! A [`PriceSeries`] is an append-only bag of `(symbol, timestamp, price)`
//! records as delivered by whatever market-data source the caller uses.
//! [`PriceSeries::clean`] turns it into a rectangular [`CleanPrices`] matrix:
//!
//! 1. duplicate `(symbol, timestamp)` records keep the most recent insertion,
//! 2. symbols with fewer than 80% of the best-covered symbol's observations are dropped,
//! 3. gaps are forward-filled, then back-filled,
//! 4. rows that still contain a gap are dropped,
//! 5. symbols with a non-positive or infinite price anywhere are dropped.
//!
//! Cleaning is idempotent: cleaning an already clean matrix is a no-op.

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{OptimizeError, Result};
use crate::types::{Symbol, Timestamp};

/// Minimum number of price rows required after cleaning.
pub const MIN_OBSERVATIONS: usize = 60;

/// Minimum number of symbols required after cleaning.
pub const MIN_SYMBOLS: usize = 2;

/// One raw observation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceRecord {
    pub symbol: Symbol,
    pub timestamp: Timestamp,
    /// Adjusted close. `NaN` is treated as a missing value.
    pub price: f64,
}

/// Raw price history keyed by `(symbol, timestamp)`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceSeries {
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of records, preserving insertion order.
    pub fn from_records(records: impl IntoIterator<Item = PriceRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// Append one observation. Later insertions win over earlier duplicates.
    pub fn push(&mut self, symbol: Symbol, timestamp: Timestamp, price: f64) {
        self.records.push(PriceRecord {
            symbol,
            timestamp,
            price,
        });
    }

    /// Append a full column for one symbol.
    pub fn push_column(&mut self, symbol: Symbol, points: &[(Timestamp, f64)]) {
        for &(ts, price) in points {
            self.push(symbol, ts, price);
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct symbols, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut syms: Vec<Symbol> = self.records.iter().map(|r| r.symbol).collect();
        syms.sort_unstable();
        syms.dedup();
        syms
    }

    /// Run the cleaning pipeline.
    ///
    /// Fails with [`OptimizeError::InsufficientData`] if fewer than
    /// [`MIN_SYMBOLS`] symbols or [`MIN_OBSERVATIONS`] rows survive.
    pub fn clean(&self) -> Result<CleanPrices> {
        // 1. Dedupe: last insertion wins.
        let mut latest: FxHashMap<(Symbol, Timestamp), f64> = FxHashMap::default();
        for r in &self.records {
            latest.insert((r.symbol, r.timestamp), r.price);
        }

        let symbols = self.symbols();
        let mut timestamps: Vec<Timestamp> = latest.keys().map(|(_, ts)| *ts).collect();
        timestamps.sort_unstable();
        timestamps.dedup();

        let row_of: FxHashMap<Timestamp, usize> = timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| (*ts, i))
            .collect();

        let mut columns: Vec<Vec<Option<f64>>> = vec![vec![None; timestamps.len()]; symbols.len()];
        let col_of: FxHashMap<Symbol, usize> = symbols
            .iter()
            .enumerate()
            .map(|(j, s)| (*s, j))
            .collect();
        for (&(sym, ts), &price) in &latest {
            if price.is_nan() {
                continue;
            }
            columns[col_of[&sym]][row_of[&ts]] = Some(price);
        }

        let mut dropped = Vec::new();

        // 2. Coverage filter.
        let counts: Vec<usize> = columns
            .iter()
            .map(|c| c.iter().filter(|v| v.is_some()).count())
            .collect();
        let best = counts.iter().copied().max().unwrap_or(0);
        // ceil(best * 4 / 5), kept in integers so the 80% boundary is exact.
        let required = (best * 4).div_ceil(5);

        let mut kept: Vec<(Symbol, Vec<Option<f64>>)> = Vec::with_capacity(symbols.len());
        for ((sym, col), count) in symbols.iter().zip(columns).zip(counts) {
            if count < required {
                debug!("dropping {sym}: {count} observations < {required} required");
                dropped.push(DroppedSymbol {
                    symbol: *sym,
                    reason: DropReason::InsufficientHistory {
                        observations: count,
                        required,
                    },
                });
                continue;
            }
            kept.push((*sym, col));
        }

        // Timestamps carried only by dropped symbols are not part of the window.
        let live_rows: Vec<usize> = (0..timestamps.len())
            .filter(|&i| kept.iter().any(|(_, col)| col[i].is_some()))
            .collect();
        let timestamps: Vec<Timestamp> = live_rows.iter().map(|&i| timestamps[i]).collect();
        for (_, col) in &mut kept {
            *col = live_rows.iter().map(|&i| col[i]).collect();
        }

        // 3. Forward-fill, then back-fill.
        for (_, col) in &mut kept {
            fill_gaps(col);
        }

        // 4. Drop rows still containing a gap.
        let complete_rows: Vec<usize> = (0..timestamps.len())
            .filter(|&i| kept.iter().all(|(_, col)| col[i].is_some()))
            .collect();
        let timestamps: Vec<Timestamp> = complete_rows.iter().map(|&i| timestamps[i]).collect();

        // 5. Drop symbols whose returns would be undefined.
        let mut final_symbols = Vec::with_capacity(kept.len());
        let mut final_columns: Vec<Vec<f64>> = Vec::with_capacity(kept.len());
        for (sym, col) in kept {
            let values: Vec<f64> = complete_rows.iter().filter_map(|&i| col[i]).collect();
            if let Some(reason) = invalid_price_reason(&values) {
                debug!("dropping {sym}: {reason:?}");
                dropped.push(DroppedSymbol {
                    symbol: sym,
                    reason,
                });
                continue;
            }
            final_symbols.push(sym);
            final_columns.push(values);
        }

        let observations = if final_symbols.is_empty() {
            0
        } else {
            timestamps.len()
        };
        if final_symbols.len() < MIN_SYMBOLS || observations < MIN_OBSERVATIONS {
            return Err(OptimizeError::InsufficientData {
                symbols: final_symbols.len(),
                observations,
            });
        }

        let rows: Vec<Vec<f64>> = (0..timestamps.len())
            .map(|i| final_columns.iter().map(|col| col[i]).collect())
            .collect();

        Ok(CleanPrices {
            symbols: final_symbols,
            timestamps,
            rows,
            dropped,
        })
    }
}

fn fill_gaps(col: &mut [Option<f64>]) {
    let mut last = None;
    for v in col.iter_mut() {
        if v.is_some() {
            last = *v;
        } else {
            *v = last;
        }
    }

    let mut next = None;
    for v in col.iter_mut().rev() {
        if v.is_some() {
            next = *v;
        } else {
            *v = next;
        }
    }
}

fn invalid_price_reason(values: &[f64]) -> Option<DropReason> {
    if values.iter().any(|v| v.is_infinite()) {
        return Some(DropReason::NonFinitePrice);
    }
    if values.iter().any(|v| *v <= 0.0) {
        return Some(DropReason::NonPositivePrice);
    }
    None
}

/// Why a symbol was removed during cleaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DropReason {
    /// Fewer than 80% of the best-covered symbol's observations.
    InsufficientHistory { observations: usize, required: usize },
    /// Zero or negative price in the cleaned window.
    NonPositivePrice,
    /// Infinite price in the cleaned window.
    NonFinitePrice,
}

/// A symbol removed by [`PriceSeries::clean`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DroppedSymbol {
    pub symbol: Symbol,
    pub reason: DropReason,
}

/// Rectangular, gap-free, strictly positive price matrix.
///
/// Rows are timestamps in increasing order, columns are symbols in sorted order.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanPrices {
    symbols: Vec<Symbol>,
    timestamps: Vec<Timestamp>,
    rows: Vec<Vec<f64>>,
    dropped: Vec<DroppedSymbol>,
}

impl CleanPrices {
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Price rows, one per timestamp.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Symbols removed during cleaning, with the reason.
    pub fn dropped(&self) -> &[DroppedSymbol] {
        &self.dropped
    }

    pub fn num_observations(&self) -> usize {
        self.timestamps.len()
    }

    /// First and last timestamp of the window.
    pub fn window(&self) -> (Timestamp, Timestamp) {
        // Non-empty by construction (MIN_OBSERVATIONS rows).
        (self.timestamps[0], self.timestamps[self.timestamps.len() - 1])
    }

    /// Daily simple returns, one row per consecutive pair of price rows.
    pub fn returns(&self) -> Vec<Vec<f64>> {
        self.rows
            .windows(2)
            .map(|pair| {
                pair[1]
                    .iter()
                    .zip(&pair[0])
                    .map(|(now, prev)| now / prev - 1.0)
                    .collect()
            })
            .collect()
    }

    /// Convert back into a raw series (used to re-clean or persist).
    pub fn to_series(&self) -> PriceSeries {
        let mut series = PriceSeries::new();
        for (row, ts) in self.rows.iter().zip(&self.timestamps) {
            for (price, sym) in row.iter().zip(&self.symbols) {
                series.push(*sym, *ts, *price);
            }
        }
        series
    }
}
