//! Parallel optimization over many requests or many price windows.
//!
//! Requires the `parallel` feature.

use rayon::prelude::*;

use crate::allocation::{optimize_clean, Allocation, OptimizeRequest, OptimizerConfig};
use crate::error::Result;
use crate::prices::PriceSeries;

/// Optimize every `(prices, request)` job in parallel.
///
/// Jobs are independent; one failing does not affect the others. Results
/// come back in input order.
///
/// # Example
///
/// ```ignore
/// use allocbook::{optimize_batch, OptimizeRequest, OptimizerConfig, RiskProfile, AllocationMode};
///
/// let request = OptimizeRequest::new(AllocationMode::MinFloor5, RiskProfile::Conservative);
/// let jobs = vec![(&q1_prices, request), (&q2_prices, request)];
/// let results = optimize_batch(&jobs, &OptimizerConfig::default());
/// ```
pub fn optimize_batch(
    jobs: &[(&PriceSeries, OptimizeRequest)],
    config: &OptimizerConfig,
) -> Vec<Result<Allocation>> {
    jobs.par_iter()
        .map(|(prices, request)| crate::optimize(prices, request, config))
        .collect()
}

/// Clean `prices` once, then solve every request against it in parallel.
///
/// Fails as a whole only if the shared price window is unusable.
pub fn sweep(
    prices: &PriceSeries,
    requests: &[OptimizeRequest],
    config: &OptimizerConfig,
) -> Result<Vec<Allocation>> {
    config.validate()?;
    let clean = prices.clean()?;
    Ok(requests
        .par_iter()
        .map(|request| optimize_clean(&clean, request, config))
        .collect())
}
