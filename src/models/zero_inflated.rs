/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Zero-inflated Poisson regression fitted by expectation-maximization.
//
// Created on: 04 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Zero-inflated Poisson
//!
//! Mixture of a point mass at zero (probability `π`, logit link) and a
//! Poisson count (mean `μ`, log link):
//!
//! - `Pr(y = 0) = π + (1 - π) exp(-μ)`
//! - `Pr(y = k) = (1 - π) Poisson(k; μ)` for `k >= 1`
//! - `E[y] = (1 - π) μ`
//!
//! The E-step assigns each zero a posterior probability of being an excess
//! zero; the M-step refits a fractional-response logit for `π` and a weighted
//! Poisson GLM for `μ`.

use faer::Mat;
use thiserror::Error;

use super::glm::{Family, FitOptions, GlmError, GlmFit, fit_glm, poisson_log_pmf};
use super::link::{LinkError, ProbabilityInterval, back_transform_logit, inverse_logit, logit};
use super::matrix_ops::map_mat;
use crate::input::{InputError, ModelInput};
use crate::utils::{f64_to_count, max_abs_diff, usize_to_f64};

/// Design used for the zero-inflation probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDesign {
    /// A single constant `π` for every row.
    #[default]
    InterceptOnly,
    /// The same covariates as the count part.
    Full,
}

/// Options for the EM fit.
#[derive(Debug, Clone, Copy)]
pub struct EmOptions {
    /// Maximum number of EM iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the change in log-likelihood.
    pub tolerance: f64,
    pub zero_design: ZeroDesign,
    /// IRLS options for each M-step.
    pub glm: FitOptions,
}

impl Default for EmOptions {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tolerance: 1e-8,
            zero_design: ZeroDesign::InterceptOnly,
            glm: FitOptions::default(),
        }
    }
}

/// Errors returned by zero-inflated model fitting.
#[derive(Debug, Error)]
pub enum ZeroInflatedError {
    #[error("invalid model input: {0}")]
    Input(#[from] InputError),
    #[error("count model failed: {0}")]
    Count(#[source] GlmError),
    #[error("zero-inflation model failed: {0}")]
    ZeroInflation(#[source] GlmError),
    #[error("zero-inflated model needs at least one positive outcome")]
    NoPositiveOutcomes,
    #[error("zero-inflated model needs at least one zero outcome")]
    NoZeroOutcomes,
    #[error("EM failed to converge in {iterations} iterations")]
    NonConvergence { iterations: usize },
    #[error("design has {got} columns but the model expects {expected}")]
    DesignWidth { expected: usize, got: usize },
    #[error("back-transform failed: {0}")]
    Link(#[from] LinkError),
}

/// Coefficients of both components.
#[derive(Debug, Clone)]
pub struct ZeroInflatedModel {
    /// Log-link coefficients of the Poisson mean.
    pub beta_count: Mat<f64>,
    /// Logit-link coefficients of the excess-zero probability.
    pub beta_zero: Mat<f64>,
    pub zero_design: ZeroDesign,
}

/// EM diagnostics and approximate standard errors.
///
/// Standard errors come from the final M-step fits, conditional on the
/// E-step responsibilities.
#[derive(Debug, Clone)]
pub struct ZeroInflatedReport {
    pub iterations: usize,
    pub log_likelihood: f64,
    pub se_count: Mat<f64>,
    pub se_zero: Mat<f64>,
    /// Posterior excess-zero probability per row at convergence.
    pub responsibilities: Mat<f64>,
}

impl ZeroInflatedReport {
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.se_count.nrows() + self.se_zero.nrows()
    }
}

/// Response-scale predictions per row.
#[derive(Debug, Clone)]
pub struct ZeroInflatedPrediction {
    /// Excess-zero probability `π`.
    pub zero_inflation: Mat<f64>,
    /// Poisson mean `μ`.
    pub count_mean: Mat<f64>,
    /// `(1 - π) μ`.
    pub expected: Mat<f64>,
    /// `π + (1 - π) exp(-μ)`.
    pub prob_zero: Mat<f64>,
}

/// Fit a zero-inflated Poisson model from a `ModelInput` container.
///
/// # Errors
///
/// Returns `ZeroInflatedError` if the input is malformed, has no zeros or no
/// positive counts, an M-step fails, or EM does not converge.
///
/// # Examples
///
/// ```
/// use zero_inflated_models::{
///     DesignOptions, EmOptions, ModelInput, ZeroInflatedConfig, fit_zero_inflated_input,
///     seeded_rng, simulate_zero_inflated,
/// };
///
/// let config = ZeroInflatedConfig { group_sd: 0.0, ..ZeroInflatedConfig::default() };
/// let table = simulate_zero_inflated(&config, &mut seeded_rng(8)).expect("simulate");
/// let input = ModelInput::from_table(&table, DesignOptions::default());
///
/// let (model, _report) = fit_zero_inflated_input(&input, EmOptions::default()).expect("fit");
/// let pi = model.baseline_zero_inflation();
/// assert!(pi > 0.2 && pi < 0.4);
/// ```
pub fn fit_zero_inflated_input(
    input: &ModelInput,
    options: EmOptions,
) -> Result<(ZeroInflatedModel, ZeroInflatedReport), ZeroInflatedError> {
    input.validate()?;
    let x = &input.design_matrix;
    let y = &input.outcome;
    let n = y.nrows();
    let n_positive = input.positive_rows().len();
    if n_positive == 0 {
        return Err(ZeroInflatedError::NoPositiveOutcomes);
    }
    if n_positive == n {
        return Err(ZeroInflatedError::NoZeroOutcomes);
    }
    let zero_x = zero_design_matrix(x, options.zero_design);

    // Start from a plain Poisson fit and the share of zeros it cannot explain.
    let initial = fit_glm(x, y, None, Family::Poisson, options.glm)
        .map_err(ZeroInflatedError::Count)?;
    let mu = initial.fitted_mean(x);
    let expected_zeros: f64 = (0..n).map(|i| (-mu[(i, 0)]).exp()).sum();
    let observed_zeros = usize_to_f64(n - n_positive);
    let excess = ((observed_zeros - expected_zeros) / usize_to_f64(n)).clamp(0.05, 0.95);
    let mut beta_count = initial.beta;
    let mut beta_zero = Mat::<f64>::zeros(zero_x.ncols(), 1);
    beta_zero[(0, 0)] = logit(excess)?;

    let mut previous = f64::NEG_INFINITY;
    for iteration in 0..options.max_iter {
        let eta_count = x * &beta_count;
        let eta_zero = &zero_x * &beta_zero;
        let tau = responsibilities(y, &eta_zero, &eta_count);

        let zero_fit = fit_glm(&zero_x, &tau, None, Family::Binomial, options.glm)
            .map_err(ZeroInflatedError::ZeroInflation)?;
        let count_weights = map_mat(&tau, |t| 1.0 - t);
        let count_fit = fit_glm(x, y, Some(&count_weights), Family::Poisson, options.glm)
            .map_err(ZeroInflatedError::Count)?;

        let loglik = zip_log_likelihood(
            y,
            &zero_fit.linear_predictor(&zero_x),
            &count_fit.linear_predictor(x),
        );
        let coefficient_change = max_abs_diff(&count_fit.beta, &beta_count)
            .max(max_abs_diff(&zero_fit.beta, &beta_zero));
        beta_count.clone_from(&count_fit.beta);
        beta_zero.clone_from(&zero_fit.beta);

        if (loglik - previous).abs() < options.tolerance * (1.0 + loglik.abs())
            && coefficient_change < options.tolerance.sqrt()
        {
            let iterations = iteration + 1;
            tracing::debug!(iterations, log_likelihood = loglik, "ZIP EM converged");
            let responsibilities =
                responsibilities(y, &(&zero_x * &beta_zero), &(x * &beta_count));
            return Ok(finish(
                count_fit,
                zero_fit,
                options.zero_design,
                iterations,
                loglik,
                responsibilities,
            ));
        }
        previous = loglik;
    }

    tracing::warn!(max_iter = options.max_iter, "ZIP EM did not converge");
    Err(ZeroInflatedError::NonConvergence {
        iterations: options.max_iter,
    })
}

fn finish(
    count_fit: GlmFit,
    zero_fit: GlmFit,
    zero_design: ZeroDesign,
    iterations: usize,
    log_likelihood: f64,
    responsibilities: Mat<f64>,
) -> (ZeroInflatedModel, ZeroInflatedReport) {
    (
        ZeroInflatedModel {
            beta_count: count_fit.beta,
            beta_zero: zero_fit.beta,
            zero_design,
        },
        ZeroInflatedReport {
            iterations,
            log_likelihood,
            se_count: count_fit.se,
            se_zero: zero_fit.se,
            responsibilities,
        },
    )
}

impl ZeroInflatedModel {
    /// Predict `π`, `μ`, the mixture mean, and `Pr(y = 0)` for each row of `x`.
    ///
    /// # Errors
    ///
    /// Returns `ZeroInflatedError::DesignWidth` if `x` has the wrong number of columns.
    pub fn predict(&self, x: &Mat<f64>) -> Result<ZeroInflatedPrediction, ZeroInflatedError> {
        if x.ncols() != self.beta_count.nrows() {
            return Err(ZeroInflatedError::DesignWidth {
                expected: self.beta_count.nrows(),
                got: x.ncols(),
            });
        }
        let zero_x = zero_design_matrix(x, self.zero_design);
        let zero_inflation = map_mat(&(&zero_x * &self.beta_zero), inverse_logit);
        let count_mean = map_mat(&(x * &self.beta_count), f64::exp);
        let expected = Mat::from_fn(x.nrows(), 1, |i, _| {
            (1.0 - zero_inflation[(i, 0)]) * count_mean[(i, 0)]
        });
        let prob_zero = Mat::from_fn(x.nrows(), 1, |i, _| {
            let pi = zero_inflation[(i, 0)];
            (1.0 - pi).mul_add((-count_mean[(i, 0)]).exp(), pi)
        });
        Ok(ZeroInflatedPrediction {
            zero_inflation,
            count_mean,
            expected,
            prob_zero,
        })
    }

    /// Excess-zero probability at the reference design point.
    #[must_use]
    pub fn baseline_zero_inflation(&self) -> f64 {
        inverse_logit(self.beta_zero[(0, 0)])
    }

    /// Excess-zero probability at the reference design point with its
    /// back-transformed Wald interval.
    ///
    /// # Errors
    ///
    /// Returns `ZeroInflatedError::Link` if the interval saturates.
    pub fn zero_inflation_interval(
        &self,
        report: &ZeroInflatedReport,
    ) -> Result<ProbabilityInterval, ZeroInflatedError> {
        Ok(back_transform_logit(
            self.beta_zero[(0, 0)],
            report.se_zero[(0, 0)],
        )?)
    }
}

/// Zero-inflated Poisson log-likelihood given both linear predictors.
///
/// Returns NaN on shape mismatch or a non-count outcome.
#[must_use]
pub fn zip_log_likelihood(y: &Mat<f64>, eta_zero: &Mat<f64>, eta_count: &Mat<f64>) -> f64 {
    if y.ncols() != 1 || y.nrows() != eta_zero.nrows() || y.nrows() != eta_count.nrows() {
        return f64::NAN;
    }
    let mut loglik = 0.0;
    for i in 0..y.nrows() {
        let Some(count) = f64_to_count(y[(i, 0)]) else {
            return f64::NAN;
        };
        let pi = inverse_logit(eta_zero[(i, 0)]).clamp(1e-12, 1.0 - 1e-12);
        let mu = eta_count[(i, 0)].exp();
        loglik += if count == 0 {
            (1.0 - pi).mul_add((-mu).exp(), pi).ln()
        } else {
            (-pi).ln_1p() + poisson_log_pmf(count, mu)
        };
    }
    loglik
}

fn responsibilities(y: &Mat<f64>, eta_zero: &Mat<f64>, eta_count: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(y.nrows(), 1, |i, _| {
        if y[(i, 0)] > 0.0 {
            return 0.0;
        }
        let pi = inverse_logit(eta_zero[(i, 0)]);
        let poisson_zero = (1.0 - pi) * (-eta_count[(i, 0)].exp()).exp();
        pi / (pi + poisson_zero)
    })
}

fn zero_design_matrix(x: &Mat<f64>, design: ZeroDesign) -> Mat<f64> {
    match design {
        ZeroDesign::InterceptOnly => Mat::from_fn(x.nrows(), 1, |_, _| 1.0),
        ZeroDesign::Full => x.clone(),
    }
}
