/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Canonical-link GLMs for counts and presence/absence (IRLS).
//
// Created on: 03 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Count and presence GLMs
//!
//! Fixed-effect fits used by the hurdle and zero-inflated models:
//! - binomial with logit link (presence/absence),
//! - Poisson with log link,
//! - zero-truncated Poisson with log link (positive counts only).
//!
//! All three are canonical-link exponential families, so one IRLS loop serves
//! them: working weight `dμ/dη`, working response `η + (y - μ) / w`.

use faer::Mat;
use statrs::function::factorial::ln_factorial;
use thiserror::Error;

use crate::input::{InputError, ModelInput};
use crate::models::combine::truncated_poisson_mean;
use crate::models::link::inverse_logit;
use crate::models::matrix_ops::map_mat;
use crate::utils::{f64_to_count, matrix_is_finite, max_abs_diff, mean_column, solve_linear_system};

/// Tuning parameters for IRLS fitting.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Maximum number of IRLS iterations.
    pub max_iter: usize,
    /// Convergence tolerance on coefficient changes.
    pub tolerance: f64,
    /// Lower bound on IRLS weights.
    pub min_weight: f64,
    /// L2 (ridge) penalty strength.
    pub l2_penalty: f64,
    /// If true, do not penalize the first column (intercept).
    pub l2_penalty_exclude_intercept: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tolerance: 1e-8,
            min_weight: 1e-10,
            l2_penalty: 0.0,
            l2_penalty_exclude_intercept: true,
        }
    }
}

/// Errors returned by GLM fitting.
#[derive(Debug, Error)]
pub enum GlmError {
    #[error("invalid model input: {0}")]
    Input(#[from] InputError),
    #[error("design matrix rows ({rows}) must match outcome length ({len})")]
    DimensionMismatch { rows: usize, len: usize },
    #[error("design matrix must have at least one column")]
    EmptyDesign,
    #[error("outcome must have at least one row")]
    EmptyOutcome,
    #[error("weights must be a single column matrix with the same number of rows as outcome")]
    InvalidWeightShape,
    #[error("inputs contain non-finite values")]
    NonFiniteInput,
    #[error("weights must be non-negative with a positive total")]
    InvalidWeights,
    #[error("binomial outcome must lie in [0, 1]")]
    InvalidBinaryOutcome,
    #[error("count outcome must be a non-negative integer")]
    InvalidCountOutcome,
    #[error("zero-truncated outcome must be at least one")]
    NonPositiveOutcome,
    #[error("{family:?} model failed to converge in {iterations} iterations")]
    NonConvergence { family: Family, iterations: usize },
    #[error("linear solve failed")]
    SolveFailed,
}

/// Distribution family with its canonical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Bernoulli / binomial proportion, logit link.
    Binomial,
    /// Poisson, log link.
    Poisson,
    /// Poisson conditioned on `y >= 1`, log link.
    TruncatedPoisson,
}

impl Family {
    /// Response-scale mean at linear predictor `eta`.
    #[must_use]
    pub fn mean(self, eta: f64) -> f64 {
        match self {
            Self::Binomial => inverse_logit(eta),
            Self::Poisson => eta.exp(),
            Self::TruncatedPoisson => truncated_poisson_mean(eta.exp()),
        }
    }

    /// Variance function on the canonical scale, equal to `dμ/dη`.
    #[must_use]
    pub fn working_weight(self, eta: f64) -> f64 {
        match self {
            Self::Binomial => {
                let p = inverse_logit(eta);
                p * (1.0 - p)
            }
            Self::Poisson => eta.exp(),
            Self::TruncatedPoisson => {
                let lambda = eta.exp();
                let m = truncated_poisson_mean(lambda);
                m * (1.0 + lambda - m)
            }
        }
    }

    fn validate_outcome(self, y: &Mat<f64>) -> Result<(), GlmError> {
        for i in 0..y.nrows() {
            let value = y[(i, 0)];
            match self {
                Self::Binomial if !(0.0..=1.0).contains(&value) => {
                    return Err(GlmError::InvalidBinaryOutcome);
                }
                Self::Poisson if f64_to_count(value).is_none() => {
                    return Err(GlmError::InvalidCountOutcome);
                }
                Self::TruncatedPoisson => match f64_to_count(value) {
                    None => return Err(GlmError::InvalidCountOutcome),
                    Some(0) => return Err(GlmError::NonPositiveOutcome),
                    Some(_) => {}
                },
                _ => {}
            }
        }
        Ok(())
    }

    fn initial_intercept(self, y: &Mat<f64>) -> f64 {
        let mean = mean_column(y);
        match self {
            Self::Binomial => {
                let p = mean.clamp(1e-3, 1.0 - 1e-3);
                (p / (1.0 - p)).ln()
            }
            Self::Poisson | Self::TruncatedPoisson => {
                if mean > 0.0 {
                    mean.ln()
                } else {
                    0.0
                }
            }
        }
    }
}

/// Coefficients and inference from one GLM fit.
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub family: Family,
    pub beta: Mat<f64>,
    pub iterations: usize,
    /// Inverse (penalized) Fisher information.
    pub cov: Mat<f64>,
    /// Standard errors, the square root of the covariance diagonal.
    pub se: Mat<f64>,
}

impl GlmFit {
    /// Linear predictor `X beta`.
    #[must_use]
    pub fn linear_predictor(&self, x: &Mat<f64>) -> Mat<f64> {
        x * &self.beta
    }

    /// Response-scale mean for each row of `x`.
    #[must_use]
    pub fn fitted_mean(&self, x: &Mat<f64>) -> Mat<f64> {
        let family = self.family;
        map_mat(&self.linear_predictor(x), |eta| family.mean(eta))
    }
}

/// Fit a canonical-link GLM by IRLS with optional prior weights.
///
/// # Errors
///
/// Returns `GlmError` if inputs are malformed, the outcome is outside the
/// family's support, or IRLS fails to converge.
pub fn fit_glm(
    x: &Mat<f64>,
    y: &Mat<f64>,
    weights: Option<&Mat<f64>>,
    family: Family,
    options: FitOptions,
) -> Result<GlmFit, GlmError> {
    if x.ncols() == 0 {
        return Err(GlmError::EmptyDesign);
    }
    if y.nrows() == 0 {
        return Err(GlmError::EmptyOutcome);
    }
    if x.nrows() != y.nrows() || y.ncols() != 1 {
        return Err(GlmError::DimensionMismatch {
            rows: x.nrows(),
            len: y.nrows(),
        });
    }
    let prior = match weights {
        Some(w) => {
            if w.ncols() != 1 || w.nrows() != y.nrows() {
                return Err(GlmError::InvalidWeightShape);
            }
            w.clone()
        }
        None => Mat::from_fn(y.nrows(), 1, |_, _| 1.0),
    };
    if !matrix_is_finite(x) || !matrix_is_finite(y) || !matrix_is_finite(&prior) {
        return Err(GlmError::NonFiniteInput);
    }
    let total_weight: f64 = (0..prior.nrows()).map(|i| prior[(i, 0)]).sum();
    if (0..prior.nrows()).any(|i| prior[(i, 0)] < 0.0) || total_weight <= 0.0 {
        return Err(GlmError::InvalidWeights);
    }
    family.validate_outcome(y)?;

    let mut beta = Mat::<f64>::zeros(x.ncols(), 1);
    beta[(0, 0)] = family.initial_intercept(y);

    for iteration in 0..options.max_iter {
        let eta = x * &beta;
        let w = working_weights(&eta, &prior, family, options);
        let z = Mat::from_fn(eta.nrows(), 1, |i, _| {
            let eta_i = eta[(i, 0)];
            let dmu = family.working_weight(eta_i).max(options.min_weight);
            eta_i + (y[(i, 0)] - family.mean(eta_i)) / dmu
        });

        let mut xtwx = weighted_xtx(x, &w);
        add_ridge(&mut xtwx, options);
        let xtw_rhs = weighted_xtz(x, &w, &z);
        let beta_next = solve_linear_system(&xtwx, &xtw_rhs)?;

        if max_abs_diff(&beta_next, &beta) < options.tolerance {
            let iterations = iteration + 1;
            let eta = x * &beta_next;
            let w = working_weights(&eta, &prior, family, options);
            let mut information = weighted_xtx(x, &w);
            add_ridge(&mut information, options);
            let cov = covariance_from_information(&information)?;
            let se = diag_sqrt(&cov);
            tracing::debug!(?family, iterations, "IRLS converged");
            return Ok(GlmFit {
                family,
                beta: beta_next,
                iterations,
                cov,
                se,
            });
        }
        beta = beta_next;
    }

    tracing::warn!(?family, max_iter = options.max_iter, "IRLS did not converge");
    Err(GlmError::NonConvergence {
        family,
        iterations: options.max_iter,
    })
}

/// Plain Poisson GLM coefficients.
#[derive(Debug, Clone)]
pub struct PoissonModel {
    pub beta: Mat<f64>,
}

/// Poisson GLM diagnostics.
#[derive(Debug, Clone)]
pub struct PoissonReport {
    pub iterations: usize,
    pub se: Mat<f64>,
    pub cov: Mat<f64>,
    pub log_likelihood: f64,
}

impl PoissonModel {
    /// Predicted mean count `exp(X beta)`.
    #[must_use]
    pub fn predict(&self, x: &Mat<f64>) -> Mat<f64> {
        map_mat(&(x * &self.beta), f64::exp)
    }
}

/// Fit a Poisson GLM with log link from a `ModelInput` container.
///
/// # Errors
///
/// Returns `GlmError` if the input is malformed or IRLS fails to converge.
///
/// # Examples
///
/// ```
/// use faer::Mat;
/// use zero_inflated_models::{FitOptions, ModelInput, fit_poisson_input};
///
/// let x = Mat::from_fn(6, 2, |i, j| if j == 0 { 1.0 } else { f64::from(u32::try_from(i).unwrap_or(0)) / 5.0 });
/// let y = Mat::from_fn(6, 1, |i, _| [0.0, 1.0, 1.0, 2.0, 3.0, 5.0][i]);
/// let input = ModelInput::new(x, y);
///
/// let (model, report) = fit_poisson_input(&input, FitOptions::default()).expect("fit");
/// assert_eq!(model.beta.nrows(), 2);
/// assert!(report.log_likelihood < 0.0);
/// ```
pub fn fit_poisson_input(
    input: &ModelInput,
    options: FitOptions,
) -> Result<(PoissonModel, PoissonReport), GlmError> {
    input.validate()?;
    let fit = fit_glm(
        &input.design_matrix,
        &input.outcome,
        None,
        Family::Poisson,
        options,
    )?;
    let mu = fit.fitted_mean(&input.design_matrix);
    let log_likelihood = poisson_log_likelihood(&input.outcome, &mu);
    Ok((
        PoissonModel { beta: fit.beta },
        PoissonReport {
            iterations: fit.iterations,
            se: fit.se,
            cov: fit.cov,
            log_likelihood,
        },
    ))
}

/// Bernoulli log-likelihood of `y` in `{0, 1}` (fractional `y` allowed).
#[must_use]
pub fn binomial_log_likelihood(y: &Mat<f64>, prob: &Mat<f64>) -> f64 {
    if y.ncols() != 1 || prob.ncols() != 1 || y.nrows() != prob.nrows() {
        return f64::NAN;
    }
    let mut loglik = 0.0;
    for i in 0..y.nrows() {
        let yi = y[(i, 0)];
        let pi = prob[(i, 0)].clamp(1e-12, 1.0 - 1e-12);
        loglik += yi.mul_add(pi.ln(), (1.0 - yi) * (-pi).ln_1p());
    }
    loglik
}

/// Poisson log-likelihood `sum(y ln mu - mu - ln y!)`.
#[must_use]
pub fn poisson_log_likelihood(y: &Mat<f64>, mu: &Mat<f64>) -> f64 {
    if y.ncols() != 1 || mu.ncols() != 1 || y.nrows() != mu.nrows() {
        return f64::NAN;
    }
    let mut loglik = 0.0;
    for i in 0..y.nrows() {
        let Some(count) = f64_to_count(y[(i, 0)]) else {
            return f64::NAN;
        };
        loglik += poisson_log_pmf(count, mu[(i, 0)]);
    }
    loglik
}

/// Zero-truncated Poisson log-likelihood; every `y` must be at least one.
#[must_use]
pub fn truncated_poisson_log_likelihood(y: &Mat<f64>, lambda: &Mat<f64>) -> f64 {
    if y.ncols() != 1 || lambda.ncols() != 1 || y.nrows() != lambda.nrows() {
        return f64::NAN;
    }
    let mut loglik = 0.0;
    for i in 0..y.nrows() {
        let Some(count) = f64_to_count(y[(i, 0)]).filter(|&k| k >= 1) else {
            return f64::NAN;
        };
        let rate = lambda[(i, 0)].max(1e-300);
        loglik += poisson_log_pmf(count, rate) - (-(-rate).exp_m1()).ln();
    }
    loglik
}

pub(crate) fn poisson_log_pmf(count: u64, mu: f64) -> f64 {
    if count == 0 {
        return -mu;
    }
    let mu = mu.max(1e-300);
    let k = crate::utils::u64_to_f64(count);
    k.mul_add(mu.ln(), -mu) - ln_factorial(count)
}

fn working_weights(eta: &Mat<f64>, prior: &Mat<f64>, family: Family, options: FitOptions) -> Mat<f64> {
    Mat::from_fn(eta.nrows(), 1, |i, _| {
        family.working_weight(eta[(i, 0)]).max(options.min_weight) * prior[(i, 0)]
    })
}

fn add_ridge(information: &mut Mat<f64>, options: FitOptions) {
    let lambda = options.l2_penalty.max(0.0);
    if lambda > 0.0 {
        for i in 0..information.nrows() {
            if !(options.l2_penalty_exclude_intercept && i == 0) {
                information[(i, i)] += lambda;
            }
        }
    }
}

pub(crate) fn weighted_xtx(x: &Mat<f64>, weights: &Mat<f64>) -> Mat<f64> {
    let n = x.nrows();
    let p = x.ncols();
    let mut xtx = Mat::<f64>::zeros(p, p);
    for i in 0..n {
        let w = weights[(i, 0)];
        for col_i in 0..p {
            let wxi = w * x[(i, col_i)];
            for col_j in 0..p {
                xtx[(col_i, col_j)] += wxi * x[(i, col_j)];
            }
        }
    }
    xtx
}

fn weighted_xtz(x: &Mat<f64>, weights: &Mat<f64>, z: &Mat<f64>) -> Mat<f64> {
    let n = x.nrows();
    let p = x.ncols();
    let mut xtz = Mat::<f64>::zeros(p, 1);
    for i in 0..n {
        let wz = weights[(i, 0)] * z[(i, 0)];
        for col in 0..p {
            xtz[(col, 0)] += x[(i, col)] * wz;
        }
    }
    xtz
}

pub(crate) fn covariance_from_information(information: &Mat<f64>) -> Result<Mat<f64>, GlmError> {
    let identity = Mat::<f64>::identity(information.nrows(), information.ncols());
    solve_linear_system(information, &identity)
}

pub(crate) fn diag_sqrt(covariance: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(covariance.nrows(), 1, |i, _| {
        covariance[(i, i)].max(0.0).sqrt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::TruncatedPoisson;
    use crate::simulation::seeded_rng;
    use crate::utils::{u64_to_f64, usize_to_f64};
    use approx::assert_relative_eq;
    use rand::RngExt;
    use rand_distr::{Distribution, Poisson};

    fn design(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { usize_to_f64(i) / usize_to_f64(n) })
    }

    #[test]
    fn poisson_fit_recovers_coefficients() {
        let n = 4_000;
        let x = design(n);
        let mut rng = seeded_rng(17);
        let mut y = Mat::<f64>::zeros(n, 1);
        for i in 0..n {
            let mu = 0.8f64.mul_add(x[(i, 1)], 0.4).exp();
            y[(i, 0)] = Poisson::new(mu).map_or(0.0, |d| d.sample(&mut rng));
        }
        let fit = fit_glm(&x, &y, None, Family::Poisson, FitOptions::default()).expect("fit");
        assert_relative_eq!(fit.beta[(0, 0)], 0.4, epsilon = 0.08);
        assert_relative_eq!(fit.beta[(1, 0)], 0.8, epsilon = 0.12);
        assert!(fit.se[(1, 0)] > 0.0);
    }

    #[test]
    fn logit_fit_recovers_coefficients() {
        let n = 5_000;
        let x = design(n);
        let mut rng = seeded_rng(23);
        let mut y = Mat::<f64>::zeros(n, 1);
        for i in 0..n {
            let p = inverse_logit(2.0f64.mul_add(x[(i, 1)], -1.0));
            if rng.random_bool(p) {
                y[(i, 0)] = 1.0;
            }
        }
        let fit = fit_glm(&x, &y, None, Family::Binomial, FitOptions::default()).expect("fit");
        assert_relative_eq!(fit.beta[(0, 0)], -1.0, epsilon = 0.15);
        assert_relative_eq!(fit.beta[(1, 0)], 2.0, epsilon = 0.25);
    }

    #[test]
    fn truncated_poisson_fit_recovers_coefficients() {
        let n = 4_000;
        let x = design(n);
        let mut rng = seeded_rng(29);
        let mut y = Mat::<f64>::zeros(n, 1);
        for i in 0..n {
            let lambda = 1.2f64.mul_add(x[(i, 1)], 0.2).exp();
            y[(i, 0)] = TruncatedPoisson::new(lambda).map_or(1.0, |d| u64_to_f64(d.sample(&mut rng)));
        }
        let fit =
            fit_glm(&x, &y, None, Family::TruncatedPoisson, FitOptions::default()).expect("fit");
        assert_relative_eq!(fit.beta[(0, 0)], 0.2, epsilon = 0.12);
        assert_relative_eq!(fit.beta[(1, 0)], 1.2, epsilon = 0.18);
    }

    #[test]
    fn truncated_family_rejects_zero_outcomes() {
        let x = design(4);
        let y = Mat::from_fn(4, 1, |i, _| if i == 0 { 0.0 } else { 2.0 });
        let err = fit_glm(&x, &y, None, Family::TruncatedPoisson, FitOptions::default())
            .expect_err("zero outcome");
        assert!(matches!(err, GlmError::NonPositiveOutcome));
    }

    #[test]
    fn poisson_family_rejects_fractional_outcomes() {
        let x = design(3);
        let y = Mat::from_fn(3, 1, |_, _| 1.5);
        let err = fit_glm(&x, &y, None, Family::Poisson, FitOptions::default())
            .expect_err("fractional outcome");
        assert!(matches!(err, GlmError::InvalidCountOutcome));
    }

    #[test]
    fn rejects_negative_weights() {
        let x = design(3);
        let y = Mat::from_fn(3, 1, |_, _| 1.0);
        let w = Mat::from_fn(3, 1, |i, _| if i == 0 { -1.0 } else { 1.0 });
        let err = fit_glm(&x, &y, Some(&w), Family::Poisson, FitOptions::default())
            .expect_err("negative weight");
        assert!(matches!(err, GlmError::InvalidWeights));
    }

    #[test]
    fn ridge_penalty_shrinks_slope() {
        let n = 200;
        let x = design(n);
        let y = Mat::from_fn(n, 1, |i, _| if i * 2 > n { 3.0 } else { 1.0 });
        let plain = fit_glm(&x, &y, None, Family::Poisson, FitOptions::default()).expect("fit");
        let ridge = fit_glm(
            &x,
            &y,
            None,
            Family::Poisson,
            FitOptions {
                l2_penalty: 50.0,
                ..FitOptions::default()
            },
        )
        .expect("ridge fit");
        assert!(ridge.beta[(1, 0)].abs() < plain.beta[(1, 0)].abs());
    }

    #[test]
    fn poisson_log_likelihood_matches_hand_computation() {
        let y = Mat::from_fn(2, 1, |i, _| if i == 0 { 0.0 } else { 2.0 });
        let mu = Mat::from_fn(2, 1, |_, _| 1.5);
        let expected = -1.5 + (2.0 * 1.5f64.ln() - 1.5 - 2.0f64.ln());
        assert_relative_eq!(poisson_log_likelihood(&y, &mu), expected, epsilon = 1e-12);
    }

    #[test]
    fn truncated_log_likelihood_adds_normalizing_term() {
        let y = Mat::from_fn(1, 1, |_, _| 1.0);
        let lambda = Mat::from_fn(1, 1, |_, _| 2.0);
        let expected = 2.0f64.ln() - 2.0 - (1.0 - (-2.0f64).exp()).ln();
        assert_relative_eq!(
            truncated_poisson_log_likelihood(&y, &lambda),
            expected,
            epsilon = 1e-12
        );
        let zero = Mat::from_fn(1, 1, |_, _| 0.0);
        assert!(truncated_poisson_log_likelihood(&zero, &lambda).is_nan());
    }

    #[test]
    fn log_likelihood_returns_nan_on_shape_mismatch() {
        let y = Mat::from_fn(2, 1, |_, _| 1.0);
        let p = Mat::from_fn(3, 1, |_, _| 0.5);
        assert!(binomial_log_likelihood(&y, &p).is_nan());
        assert!(poisson_log_likelihood(&y, &p).is_nan());
    }
}
