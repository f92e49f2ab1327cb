//! # allocbook
//!
//! Deterministic long-only mean-variance allocation for a basket of assets.
//!
//! ## Features
//!
//! - **Cleaning**: duplicate removal, sparse-symbol dropping, forward/back fill
//! - **Allocation modes**: equal, unconstrained, 5% floor, 10% floor
//! - **Risk profiles**: minimum variance, maximum Sharpe, target return, volatility ceiling
//! - **Explicit fallback**: solver failures degrade to equal weight and say so
//! - **Pure**: no I/O, no global state, no threads unless a feature asks for them
//!
//! ## Quick Start
//!
//! ```
//! use allocbook::{optimize, AllocationMode, OptimizeRequest, OptimizerConfig, PriceSeries, RiskProfile, Symbol};
//!
//! let mut prices = PriceSeries::new();
//! for day in 0..90_i64 {
//!     let t = day as f64;
//!     prices.push(Symbol::new("AAA"), day, 100.0 + t + (t * 0.3).sin());
//!     prices.push(Symbol::new("BBB"), day, 50.0 + 0.2 * t + (t * 0.7).cos());
//!     prices.push(Symbol::new("CCC"), day, 20.0 + 0.05 * t + (t * 1.1).sin());
//!     prices.push(Symbol::new("DDD"), day, 80.0 - 0.1 * t + (t * 0.5).cos());
//! }
//!
//! let request = OptimizeRequest::new(AllocationMode::Equal, RiskProfile::Moderate);
//! let allocation = optimize(&prices, &request, &OptimizerConfig::default()).unwrap();
//!
//! assert_eq!(allocation.weights.values(), vec![0.25; 4]);
//! assert_eq!(allocation.observations, 90);
//! ```
//!
//! ## Allocation Modes
//!
//! | Mode | Bounds per asset |
//! |------|------------------|
//! | `equal` | exactly 1/N, no solver |
//! | `unconstrained` | [0, 1] |
//! | `min-floor-5` | [0.05, 1] |
//! | `min-floor-10` | [0.10, 1] |
//!
//! ## Fallbacks
//!
//! Numerical failures never surface as errors. A `custom` target that cannot
//! be met becomes maximum Sharpe; a failed solve becomes equal weight. Both
//! are recorded on [`Method`] and visible in its label:
//!
//! ```
//! use allocbook::{optimize, AllocationMode, OptimizeRequest, OptimizerConfig, PriceSeries, RiskProfile, Symbol};
//!
//! let mut prices = PriceSeries::new();
//! for day in 0..80_i64 {
//!     let t = day as f64;
//!     prices.push(Symbol::new("AAA"), day, 100.0 + t + 3.0 * (t * 0.3).sin());
//!     prices.push(Symbol::new("BBB"), day, 50.0 + 0.3 * t + 2.0 * (t * 0.7).cos());
//! }
//!
//! // No target return or volatility ceiling: custom is ill-posed.
//! let request = OptimizeRequest::new(AllocationMode::Unconstrained, RiskProfile::Custom);
//! let allocation = optimize(&prices, &request, &OptimizerConfig::default()).unwrap();
//! assert!(allocation.method.custom_fallback.is_some());
//! assert!(allocation.method.label().contains("custom target unusable"));
//! ```

pub mod allocation;
mod error;
pub mod optimize;
pub mod performance;
#[cfg(feature = "persistence")]
pub mod persistence;
pub mod prices;
pub mod stats;
#[cfg(feature = "parallel")]
pub mod sweep;
mod types;

// Re-export public API
pub use allocation::{
    optimize, optimize_clean, Allocation, AllocationMode, AssetWeights, Method, Objective,
    OptimizeRequest, OptimizerConfig, RiskProfile,
};
pub use error::{OptimizeError, Result};
pub use optimize::{Bounds, SolverFailure, SolverOptions};
pub use performance::{PerformanceSummary, TRADING_DAYS_PER_YEAR};
pub use prices::{
    CleanPrices, DropReason, DroppedSymbol, PriceRecord, PriceSeries, MIN_OBSERVATIONS,
    MIN_SYMBOLS,
};
pub use stats::Estimates;
#[cfg(feature = "parallel")]
pub use sweep::{optimize_batch, sweep};
pub use types::{ParseSymbolError, Symbol, Timestamp, SYMBOL_MAX_LEN};
