//! Return and covariance estimation for the optimizer.
//!
//! All estimates are annualized from daily simple returns:
//! expected return = mean × periods, covariance = sample covariance × periods.

// ---------------------------------------------------------------------------
// Matrix helpers
// ---------------------------------------------------------------------------

/// Column means of a rectangular matrix (rows = observations).
pub(crate) fn column_means(matrix: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let rows = matrix.len();
    let cols = first.len();

    let mut sums = vec![0.0; cols];
    for row in matrix {
        for (j, v) in row.iter().enumerate() {
            sums[j] += *v;
        }
    }

    sums.into_iter().map(|s| s / rows as f64).collect()
}

/// Sample covariance with an `n - 1` denominator.
pub(crate) fn covariance_matrix(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let rows = matrix.len();
    let cols = first.len();
    let means = column_means(matrix);

    let mut cov = vec![vec![0.0; cols]; cols];

    for row in matrix {
        for i in 0..cols {
            let di = row[i] - means[i];
            for j in i..cols {
                let dj = row[j] - means[j];
                cov[i][j] += di * dj;
            }
        }
    }

    let denom = (rows as f64 - 1.0).max(1.0);
    for i in 0..cols {
        for j in i..cols {
            let v = cov[i][j] / denom;
            cov[i][j] = v;
            cov[j][i] = v;
        }
    }

    cov
}

pub(crate) fn mat_vec_mul(matrix: &[Vec<f64>], vec: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vec).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `wᵀ Σ w`.
pub(crate) fn quadratic_form(matrix: &[Vec<f64>], w: &[f64]) -> f64 {
    dot(w, &mat_vec_mul(matrix, w))
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

/// Annualized expected returns and covariance for one price window.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimates {
    /// Expected annual return per asset.
    pub mu: Vec<f64>,
    /// Annualized sample covariance (unregularized).
    pub cov: Vec<Vec<f64>>,
}

impl Estimates {
    /// Estimate from a matrix of periodic simple returns (rows = periods).
    pub fn from_returns(returns: &[Vec<f64>], periods_per_year: f64) -> Self {
        let mu = column_means(returns)
            .into_iter()
            .map(|m| m * periods_per_year)
            .collect();
        let cov = covariance_matrix(returns)
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * periods_per_year).collect())
            .collect();
        Self { mu, cov }
    }

    pub fn num_assets(&self) -> usize {
        self.mu.len()
    }

    /// Covariance with `ridge · I` added, so the solver sees a positive-definite matrix.
    pub fn regularized_cov(&self, ridge: f64) -> Vec<Vec<f64>> {
        let mut cov = self.cov.clone();
        for (i, row) in cov.iter_mut().enumerate() {
            row[i] += ridge;
        }
        cov
    }
}

/// Per-period returns of a fixed-weight portfolio.
pub fn portfolio_returns(returns: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
    returns.iter().map(|row| dot(row, weights)).collect()
}
