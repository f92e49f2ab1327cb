//! Expected return, volatility and Sharpe ratio of an allocation.

use crate::stats::{dot, quadratic_form};

/// Trading days used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Performance of one allocation over the price window it was fitted on.
///
/// Returns are simple (not log) returns, annualized.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceSummary {
    /// Expected annual return (e.g., 0.12 = 12%)
    pub expected_annual_return: f64,
    /// Annualized volatility (standard deviation of returns)
    pub annual_volatility: f64,
    /// (expected return - risk_free) / volatility; 0 when volatility is 0
    pub sharpe_ratio: f64,
}

impl PerformanceSummary {
    /// Summary of fixed weights under annualized estimates `mu` and `cov`.
    pub fn from_weights(weights: &[f64], mu: &[f64], cov: &[Vec<f64>], risk_free: f64) -> Self {
        let expected = dot(weights, mu);
        let volatility = quadratic_form(cov, weights).max(0.0).sqrt();
        Self::new(expected, volatility, risk_free)
    }

    /// Summary of a realized per-period portfolio return series.
    ///
    /// Mean × `periods_per_year` for return, sample standard deviation
    /// × √`periods_per_year` for volatility. Returns `None` if `returns` is empty.
    pub fn from_return_series(
        returns: &[f64],
        periods_per_year: f64,
        risk_free: f64,
    ) -> Option<Self> {
        if returns.is_empty() {
            return None;
        }

        let n = returns.len();
        let mean = returns.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            returns.iter().map(|&r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        Some(Self::new(
            mean * periods_per_year,
            (variance * periods_per_year).sqrt(),
            risk_free,
        ))
    }

    fn new(expected: f64, volatility: f64, risk_free: f64) -> Self {
        let sharpe = if volatility > 0.0 {
            (expected - risk_free) / volatility
        } else {
            0.0
        };
        Self {
            expected_annual_return: expected,
            annual_volatility: volatility,
            sharpe_ratio: sharpe,
        }
    }
}

impl std::fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance")?;
        writeln!(
            f,
            "  Expected return: {:>8.2}%",
            self.expected_annual_return * 100.0
        )?;
        writeln!(
            f,
            "  Volatility:      {:>8.2}%",
            self.annual_volatility * 100.0
        )?;
        write!(f, "  Sharpe:          {:>8.2}", self.sharpe_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{portfolio_returns, Estimates};

    #[test]
    fn from_weights_basic() {
        let mu = [0.10, 0.20];
        let cov = vec![vec![0.04, 0.0], vec![0.0, 0.09]];
        let p = PerformanceSummary::from_weights(&[0.5, 0.5], &mu, &cov, 0.0);
        assert!((p.expected_annual_return - 0.15).abs() < 1e-12);
        // var = 0.25·0.04 + 0.25·0.09 = 0.0325
        assert!((p.annual_volatility - 0.0325_f64.sqrt()).abs() < 1e-12);
        assert!((p.sharpe_ratio - 0.15 / 0.0325_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn risk_free_reduces_sharpe() {
        let cov = vec![vec![0.04]];
        let p0 = PerformanceSummary::from_weights(&[1.0], &[0.10], &cov, 0.0);
        let p1 = PerformanceSummary::from_weights(&[1.0], &[0.10], &cov, 0.02);
        assert!((p0.sharpe_ratio - 0.5).abs() < 1e-12);
        assert!((p1.sharpe_ratio - 0.4).abs() < 1e-12);
    }

    #[test]
    fn zero_volatility_has_zero_sharpe() {
        // 2^-10 keeps the mean exact, so the sample variance is exactly zero.
        let p = PerformanceSummary::from_return_series(&[0.0009765625; 10], 252.0, 0.0).unwrap();
        assert_eq!(p.annual_volatility, 0.0);
        assert_eq!(p.sharpe_ratio, 0.0);
        assert!((p.expected_annual_return - 0.24609375).abs() < 1e-12);
    }

    #[test]
    fn empty_series_is_none() {
        assert!(PerformanceSummary::from_return_series(&[], 252.0, 0.0).is_none());
    }

    #[test]
    fn series_and_weights_agree() {
        let returns = vec![
            vec![0.010, 0.004, -0.002],
            vec![-0.003, 0.006, 0.001],
            vec![0.007, -0.001, 0.002],
            vec![0.004, 0.003, -0.004],
            vec![-0.002, 0.005, 0.003],
        ];
        let w = [0.2, 0.5, 0.3];
        let est = Estimates::from_returns(&returns, TRADING_DAYS_PER_YEAR);
        let a = PerformanceSummary::from_weights(&w, &est.mu, &est.cov, 0.0);
        let b = PerformanceSummary::from_return_series(
            &portfolio_returns(&returns, &w),
            TRADING_DAYS_PER_YEAR,
            0.0,
        )
        .unwrap();
        assert!((a.expected_annual_return - b.expected_annual_return).abs() < 1e-12);
        assert!((a.annual_volatility - b.annual_volatility).abs() < 1e-12);
    }

    #[test]
    fn display_format() {
        let p = PerformanceSummary {
            expected_annual_return: 0.1234,
            annual_volatility: 0.2,
            sharpe_ratio: 0.617,
        };
        let s = p.to_string();
        assert!(s.contains("12.34%"));
        assert!(s.contains("20.00%"));
        assert!(s.contains("0.62"));
    }
}
