//! Price files: daily close history for the optimizer and latest prices for a plan.
//!
//! History is a JSON array of `{ "symbol", "date", "close" }` records with
//! ISO dates; `close` may be `null` for a missing observation. Latest prices
//! are a JSON object mapping ticker to price.

use std::path::Path;

use allocbook::{PriceSeries, Symbol, Timestamp};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::plan::PriceMap;

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    symbol: Symbol,
    date: NaiveDate,
    close: Option<f64>,
}

/// Calendar date as an optimizer timestamp (days from the common era).
pub fn date_to_timestamp(date: NaiveDate) -> Timestamp {
    date.num_days_from_ce() as Timestamp
}

/// Inverse of [`date_to_timestamp`]; `None` outside chrono's range.
pub fn timestamp_to_date(ts: Timestamp) -> Option<NaiveDate> {
    i32::try_from(ts)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Parse a close-price history document.
pub fn history_from_json(json: &str) -> Result<PriceSeries> {
    let records: Vec<HistoryRecord> = serde_json::from_str(json)?;
    let mut series = PriceSeries::new();
    for r in records {
        series.push(r.symbol, date_to_timestamp(r.date), r.close.unwrap_or(f64::NAN));
    }
    Ok(series)
}

/// Load a close-price history file.
pub fn load_history(path: &Path) -> Result<PriceSeries> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    history_from_json(&contents)
}

/// Parse a `{ "TICKER": price }` document.
pub fn prices_from_json(json: &str) -> Result<PriceMap> {
    Ok(serde_json::from_str(json)?)
}

/// Load a latest-price file.
pub fn load_prices(path: &Path) -> Result<PriceMap> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    prices_from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_history() {
        let json = r#"[
            { "symbol": "AAA", "date": "2024-01-02", "close": 10.0 },
            { "symbol": "AAA", "date": "2024-01-03", "close": null },
            { "symbol": "BBB", "date": "2024-01-02", "close": 20.0 }
        ]"#;
        let series = history_from_json(json).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbols(), vec![Symbol::new("AAA"), Symbol::new("BBB")]);
        assert!(series.records()[1].price.is_nan());
        assert_eq!(series.records()[1].timestamp - series.records()[0].timestamp, 1);
    }

    #[test]
    fn reject_bad_date() {
        let json = r#"[{ "symbol": "AAA", "date": "2024-13-45", "close": 1.0 }]"#;
        assert!(matches!(history_from_json(json), Err(Error::Parse(_))));
    }

    #[test]
    fn timestamps_round_trip_to_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(timestamp_to_date(date_to_timestamp(date)), Some(date));
        assert_eq!(timestamp_to_date(i64::MAX), None);
    }

    #[test]
    fn parse_prices() {
        let prices = prices_from_json(r#"{ "AAA": 12.0, "BBB": 20.5 }"#).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[&Symbol::new("BBB")], 20.5);
    }

    #[test]
    fn load_missing_prices() {
        assert!(matches!(
            load_prices(Path::new("nope/prices.json")),
            Err(Error::Read { .. })
        ));
    }
}
