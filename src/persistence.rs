//! File-based persistence of optimization results.
//!
//! A single [`Allocation`] is stored as one pretty-printed JSON document.
//! A history of allocations is stored as JSON Lines (`.jsonl`), one
//! allocation per line, appended as new runs complete.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//!
//! let allocation = allocbook::optimize(&prices, &request, &config)?;
//! allocation.save(Path::new("allocation.json"))?;
//! allocbook::persistence::append_history(&allocation, Path::new("history.jsonl"))?;
//!
//! let yesterday = Allocation::load(Path::new("allocation.json"))?;
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::allocation::Allocation;

fn to_io(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Write one allocation as a JSON document, replacing any existing file.
pub fn save_allocation(allocation: &Allocation, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, allocation).map_err(to_io)?;
    writeln!(writer)?;
    writer.flush()
}

/// Read one allocation written by [`save_allocation`].
pub fn load_allocation(path: &Path) -> io::Result<Allocation> {
    let file = File::open(path)?;
    serde_json::from_reader(io::BufReader::new(file)).map_err(to_io)
}

/// Append one allocation to a JSON Lines history file, creating it if needed.
pub fn append_history(allocation: &Allocation, path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = io::BufWriter::new(file);
    let json = serde_json::to_string(allocation).map_err(to_io)?;
    writeln!(writer, "{json}")?;
    writer.flush()
}

/// Load every allocation from a JSON Lines history file.
///
/// Empty lines are skipped.
pub fn load_history(path: &Path) -> io::Result<Vec<Allocation>> {
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    let mut history = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let allocation: Allocation = serde_json::from_str(line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", line_num + 1, e),
            )
        })?;
        history.push(allocation);
    }

    Ok(history)
}

impl Allocation {
    /// Save this allocation as JSON. Requires the `persistence` feature.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_allocation(self, path)
    }

    /// Load an allocation saved with [`Allocation::save`].
    pub fn load(path: &Path) -> io::Result<Self> {
        load_allocation(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationMode, AssetWeights, Method, Objective, RiskProfile};
    use crate::optimize::SolverFailure;
    use crate::performance::PerformanceSummary;
    use crate::types::Symbol;

    fn sample(fallback: bool) -> Allocation {
        Allocation {
            weights: AssetWeights::new(vec![(Symbol::new("SPY"), 0.6), (Symbol::new("TLT"), 0.4)]),
            performance: PerformanceSummary {
                expected_annual_return: 0.08,
                annual_volatility: 0.11,
                sharpe_ratio: 0.08 / 0.11,
            },
            method: Method {
                profile: RiskProfile::Custom,
                mode: AllocationMode::MinFloor10,
                objective: Objective::MaxSharpe,
                custom_fallback: fallback.then_some(SolverFailure::TargetReturnOutOfRange {
                    target: 0.5,
                    min: 0.02,
                    max: 0.12,
                }),
                solver_fallback: None,
            },
            dropped: vec![Symbol::new("GLD")],
            window: (19_000, 19_120),
            observations: 121,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allocation.json");

        let alloc = sample(true);
        alloc.save(&path).unwrap();
        let loaded = Allocation::load(&path).unwrap();

        assert_eq!(alloc, loaded);
        assert_eq!(loaded.method.label(), alloc.method.label());
    }

    #[test]
    fn history_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        append_history(&sample(false), &path).unwrap();
        append_history(&sample(true), &path).unwrap();

        let history = load_history(&path).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].method.is_fallback());
        assert!(history[1].method.is_fallback());
    }

    #[test]
    fn history_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        append_history(&sample(false), &path).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "\n{{not json"))
            .unwrap();

        let err = load_history(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with("line 3:"));
    }

    #[test]
    fn load_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Allocation::load(&dir.path().join("missing.json")).is_err());
    }
}
