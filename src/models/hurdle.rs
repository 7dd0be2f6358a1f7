/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Hurdle model for count data: logistic presence + zero-truncated Poisson.
//
// Created on: 04 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Hurdle model
//!
//! Two separately fitted parts:
//! - Part 1: logistic regression for presence (`y > 0`) on every row.
//! - Part 2: zero-truncated Poisson regression with log link on the positive
//!   rows only.
//!
//! Predictions are produced per part on the response scale, keyed by
//! observation id, and multiplied with [`combine_keyed`].

use std::collections::BTreeMap;

use faer::Mat;
use thiserror::Error;

use super::combine::{
    CombineError, CombinedPrediction, PredictionScale, ResponseTransform, ScoredPredictions,
    combine_keyed,
};
use super::glm::{
    Family, FitOptions, GlmError, binomial_log_likelihood, fit_glm,
    truncated_poisson_log_likelihood,
};
use super::link::{LinkError, ProbabilityInterval, back_transform_logit, inverse_logit};
use super::matrix_ops::{column_to_vec, map_mat};
use crate::input::{InputError, ModelInput};

/// Errors returned by hurdle model fitting and prediction.
#[derive(Debug, Error)]
pub enum HurdleError {
    #[error("invalid model input: {0}")]
    Input(#[from] InputError),
    #[error("presence model failed: {0}")]
    Presence(#[source] GlmError),
    #[error("positive-count model failed: {0}")]
    PositiveCount(#[source] GlmError),
    #[error("hurdle model needs at least one positive outcome")]
    NoPositiveOutcomes,
    #[error("hurdle model needs at least one zero outcome")]
    NoZeroOutcomes,
    #[error("design has {got} columns but the model expects {expected}")]
    DesignWidth { expected: usize, got: usize },
    #[error("combining predictions failed: {0}")]
    Combine(#[from] CombineError),
    #[error("back-transform failed: {0}")]
    Link(#[from] LinkError),
}

/// Hurdle model coefficients for both parts.
#[derive(Debug, Clone)]
pub struct HurdleModel {
    /// Logistic regression coefficients for Pr(y > 0).
    pub beta_presence: Mat<f64>,
    /// Log-link coefficients of the zero-truncated Poisson rate.
    pub beta_count: Mat<f64>,
}

/// Model diagnostics and inference outputs.
#[derive(Debug, Clone)]
pub struct HurdleReport {
    pub iterations_presence: usize,
    pub iterations_count: usize,
    pub se_presence: Mat<f64>,
    pub se_count: Mat<f64>,
    pub cov_presence: Mat<f64>,
    pub cov_count: Mat<f64>,
    /// Number of rows used by the positive-count part.
    pub n_positive: usize,
    /// Joint log-likelihood of both parts.
    pub log_likelihood: f64,
}

impl HurdleReport {
    /// Number of estimated coefficients across both parts.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.se_presence.nrows() + self.se_count.nrows()
    }
}

/// Keyed component predictions and their combination.
#[derive(Debug, Clone)]
pub struct HurdlePrediction {
    /// Pr(y > 0) per observation (response scale).
    pub presence: ScoredPredictions,
    /// E[y | y > 0] per observation (response scale).
    pub positive_mean: ScoredPredictions,
    /// Presence times positive mean, in input row order.
    pub expected: Vec<CombinedPrediction>,
}

impl HurdlePrediction {
    /// Defined combined predictions keyed by observation id.
    #[must_use]
    pub fn expected_by_id(&self) -> BTreeMap<u64, f64> {
        self.expected
            .iter()
            .filter_map(|row| row.value.map(|value| (row.id, value)))
            .collect()
    }
}

/// Fit a hurdle model from a `ModelInput` container.
///
/// # Errors
///
/// Returns `HurdleError` if the input is malformed, either part has no rows,
/// or either IRLS fit fails.
///
/// # Examples
///
/// ```
/// use zero_inflated_models::{
///     DesignOptions, FitOptions, HurdleConfig, ModelInput, fit_hurdle_input, seeded_rng,
///     simulate_hurdle,
/// };
///
/// let table = simulate_hurdle(&HurdleConfig::default(), &mut seeded_rng(4)).expect("simulate");
/// let input = ModelInput::from_table(&table, DesignOptions::default());
/// let (model, report) = fit_hurdle_input(&input, FitOptions::default()).expect("fit");
///
/// let prediction = model.predict(&input).expect("predict");
/// assert_eq!(prediction.expected.len(), input.nrows());
/// assert!(report.n_positive > 0);
/// ```
pub fn fit_hurdle_input(
    input: &ModelInput,
    options: FitOptions,
) -> Result<(HurdleModel, HurdleReport), HurdleError> {
    input.validate()?;
    let positive_rows = input.positive_rows();
    if positive_rows.is_empty() {
        return Err(HurdleError::NoPositiveOutcomes);
    }
    if positive_rows.len() == input.nrows() {
        return Err(HurdleError::NoZeroOutcomes);
    }

    let presence_indicator = input.presence_indicator();
    let presence = fit_glm(
        &input.design_matrix,
        &presence_indicator,
        None,
        Family::Binomial,
        options,
    )
    .map_err(HurdleError::Presence)?;

    let positive = input.subset(&positive_rows);
    let count = fit_glm(
        &positive.design_matrix,
        &positive.outcome,
        None,
        Family::TruncatedPoisson,
        options,
    )
    .map_err(HurdleError::PositiveCount)?;

    let prob = presence.fitted_mean(&input.design_matrix);
    let lambda = map_mat(&count.linear_predictor(&positive.design_matrix), f64::exp);
    let log_likelihood = binomial_log_likelihood(&presence_indicator, &prob)
        + truncated_poisson_log_likelihood(&positive.outcome, &lambda);

    tracing::debug!(
        n_rows = input.nrows(),
        n_positive = positive_rows.len(),
        log_likelihood,
        "fitted hurdle model"
    );

    Ok((
        HurdleModel {
            beta_presence: presence.beta,
            beta_count: count.beta,
        },
        HurdleReport {
            iterations_presence: presence.iterations,
            iterations_count: count.iterations,
            se_presence: presence.se,
            se_count: count.se,
            cov_presence: presence.cov,
            cov_count: count.cov,
            n_positive: positive_rows.len(),
            log_likelihood,
        },
    ))
}

impl HurdleModel {
    /// Link-scale scores of both parts, keyed by the input's observation ids.
    ///
    /// # Errors
    ///
    /// Returns `HurdleError::DesignWidth` if the design has the wrong number of columns.
    pub fn predict_link(
        &self,
        input: &ModelInput,
    ) -> Result<(ScoredPredictions, ScoredPredictions), HurdleError> {
        self.check_width(&input.design_matrix)?;
        let eta_presence = &input.design_matrix * &self.beta_presence;
        let eta_count = &input.design_matrix * &self.beta_count;
        let ids = input.observation_ids();
        let presence = ScoredPredictions::from_aligned(
            PredictionScale::Link,
            ids,
            &column_to_vec(&eta_presence),
        )?;
        let count =
            ScoredPredictions::from_aligned(PredictionScale::Link, ids, &column_to_vec(&eta_count))?;
        Ok((presence, count))
    }

    /// Predict presence probability, positive mean, and their product.
    ///
    /// # Errors
    ///
    /// Returns `HurdleError` if the design width is wrong or the input repeats
    /// an observation id.
    pub fn predict(&self, input: &ModelInput) -> Result<HurdlePrediction, HurdleError> {
        let (presence_link, count_link) = self.predict_link(input)?;
        let presence = presence_link.to_response_scale(ResponseTransform::Logistic);
        let positive_mean = count_link.to_response_scale(ResponseTransform::TruncatedPoissonMean);
        let expected = combine_keyed(&presence, &positive_mean, input.observation_ids())?;
        Ok(HurdlePrediction {
            presence,
            positive_mean,
            expected,
        })
    }

    /// Presence probability at the reference design point (intercept only),
    /// with its logit-scale Wald interval back-transformed.
    ///
    /// # Errors
    ///
    /// Returns `HurdleError::Link` if the interval saturates.
    pub fn baseline_presence(
        &self,
        report: &HurdleReport,
    ) -> Result<ProbabilityInterval, HurdleError> {
        Ok(back_transform_logit(
            self.beta_presence[(0, 0)],
            report.se_presence[(0, 0)],
        )?)
    }

    /// Presence probability at the reference design point, without an interval.
    #[must_use]
    pub fn baseline_presence_estimate(&self) -> f64 {
        inverse_logit(self.beta_presence[(0, 0)])
    }

    fn check_width(&self, x: &Mat<f64>) -> Result<(), HurdleError> {
        if x.ncols() == self.beta_presence.nrows() {
            Ok(())
        } else {
            Err(HurdleError::DesignWidth {
                expected: self.beta_presence.nrows(),
                got: x.ncols(),
            })
        }
    }
}
