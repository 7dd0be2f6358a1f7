//! Count outcome diagnostics run before choosing between Poisson, zero-inflated,
//! and hurdle fits.

use faer::Mat;

use crate::utils::{f64_to_count, usize_to_f64};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountDiagnostics {
    pub n_rows: usize,
    /// Non-finite, negative, or fractional values.
    pub n_invalid: usize,
    pub n_zero: usize,
    pub n_positive: usize,
    pub zero_share: f64,
    pub mean: f64,
    pub variance: f64,
    /// Variance over mean; 1 for Poisson data, above 1 under zero inflation.
    pub dispersion: f64,
}

/// Summarize a count outcome column. Shares and moments use valid rows only.
///
/// A matrix without columns has no valid rows.
#[must_use]
pub fn count_diagnostics(outcome: &Mat<f64>) -> CountDiagnostics {
    let n_rows = outcome.nrows();
    let mut valid = Vec::with_capacity(n_rows);
    if outcome.ncols() > 0 {
        for row in 0..n_rows {
            let value = outcome[(row, 0)];
            if f64_to_count(value).is_some() {
                valid.push(value);
            }
        }
    }

    let n_valid = valid.len();
    let n_zero = valid.iter().filter(|&&value| value == 0.0).count();
    let (zero_share, mean, variance) = if n_valid > 0 {
        let denom = usize_to_f64(n_valid);
        let mean = valid.iter().sum::<f64>() / denom;
        let variance = if n_valid > 1 {
            valid.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
                / usize_to_f64(n_valid - 1)
        } else {
            0.0
        };
        (usize_to_f64(n_zero) / denom, mean, variance)
    } else {
        (0.0, 0.0, 0.0)
    };
    let dispersion = if mean > 0.0 { variance / mean } else { f64::NAN };

    CountDiagnostics {
        n_rows,
        n_invalid: n_rows - n_valid,
        n_zero,
        n_positive: n_valid - n_zero,
        zero_share,
        mean,
        variance,
        dispersion,
    }
}

/// Observed zeros against the zeros a Poisson fit expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroExcess {
    pub observed_zeros: usize,
    /// `sum(exp(-mu_i))`.
    pub expected_zeros: f64,
    /// `observed / expected`; well above 1 signals zero inflation.
    pub ratio: f64,
}

/// Compare observed zeros with `sum(exp(-mu_i))` for fitted Poisson means.
///
/// Returns NaN `expected_zeros` and `ratio` when the shapes differ; zeros are
/// then counted only if `outcome` has a column.
#[must_use]
pub fn zero_excess(outcome: &Mat<f64>, fitted_means: &Mat<f64>) -> ZeroExcess {
    let count_zeros = || {
        (0..outcome.nrows())
            .filter(|&row| outcome[(row, 0)] == 0.0)
            .count()
    };
    if outcome.ncols() != 1 || fitted_means.ncols() != 1 || outcome.nrows() != fitted_means.nrows()
    {
        return ZeroExcess {
            observed_zeros: if outcome.ncols() > 0 { count_zeros() } else { 0 },
            expected_zeros: f64::NAN,
            ratio: f64::NAN,
        };
    }
    let observed_zeros = count_zeros();
    let expected_zeros: f64 = (0..fitted_means.nrows())
        .map(|row| (-fitted_means[(row, 0)]).exp())
        .sum();
    let ratio = if expected_zeros > 0.0 {
        usize_to_f64(observed_zeros) / expected_zeros
    } else if observed_zeros > 0 {
        f64::INFINITY
    } else {
        1.0
    };
    ZeroExcess {
        observed_zeros,
        expected_zeros,
        ratio,
    }
}
