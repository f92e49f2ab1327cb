//! Errors surfaced by the allocation optimizer.

use crate::prices::{MIN_OBSERVATIONS, MIN_SYMBOLS};

/// Errors returned by [`optimize`](fn@crate::optimize).
///
/// Numerical solver failures are never returned here: they are absorbed by
/// the equal-weight fallback and recorded on [`Method`](crate::Method).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    /// Too few usable symbols or observations survived cleaning.
    #[error(
        "insufficient data after cleaning: {symbols} symbol(s) x {observations} observation(s), \
         need at least {min_symbols} x {min_observations}",
        min_symbols = MIN_SYMBOLS,
        min_observations = MIN_OBSERVATIONS
    )]
    InsufficientData { symbols: usize, observations: usize },

    /// Optimizer configuration is nonsensical (NaN, negative ridge, ...).
    #[error("invalid optimizer config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = OptimizeError::InsufficientData {
            symbols: 1,
            observations: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data after cleaning: 1 symbol(s) x 10 observation(s), need at least 2 x 60"
        );
        assert_eq!(
            OptimizeError::InvalidConfig("ridge must be >= 0".into()).to_string(),
            "invalid optimizer config: ridge must be >= 0"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(OptimizeError::InsufficientData {
            symbols: 0,
            observations: 0,
        });
        assert!(err.to_string().contains("insufficient data"));
    }
}
