//! Error types for the rebalancer.

use std::path::PathBuf;

use allocbook::{OptimizeError, Symbol};

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("missing price for {}", join_symbols(.0))]
    MissingPrice(Vec<Symbol>),

    #[error("nothing to rebalance: no holdings and an empty target")]
    EmptyPortfolio,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("optimizer error: {0}")]
    Optimize(#[from] OptimizeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for bad-input errors that produce no plan or allocation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::InvalidTarget(_)
                | Error::MissingPrice(_)
                | Error::EmptyPortfolio
                | Error::InvalidInput(_)
                | Error::Optimize(OptimizeError::InsufficientData { .. })
        )
    }
}

fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
