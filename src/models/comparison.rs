/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Count model comparison (information criteria, fit metrics, zero counts).
//
// Created on: 05 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Count model comparison
//!
//! Fits a plain Poisson GLM, a zero-inflated Poisson, and a hurdle model on
//! one input and ranks them by AIC. Alongside the information criteria each
//! row reports in-sample errors of the expected count and the number of zeros
//! the model predicts, which is where Poisson fits on zero-heavy data fall short.

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED,
};
use faer::Mat;
use thiserror::Error;

use super::glm::{FitOptions, GlmError, fit_poisson_input};
use super::hurdle::{HurdleError, fit_hurdle_input};
use super::matrix_ops::{column_to_vec, map_mat};
use super::zero_inflated::{EmOptions, ZeroInflatedError, fit_zero_inflated_input};
use crate::input::{InputError, ModelInput};
use crate::preprocess::{ZeroExcess, zero_excess};
use crate::utils::usize_to_f64;

/// AIC and BIC for one log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InformationCriteria {
    pub loglik: f64,
    pub aic: f64,
    pub bic: f64,
}

/// Compute AIC/BIC for a given log-likelihood, parameter count, and sample size.
///
/// # Examples
///
/// ```
/// use zero_inflated_models::compute_information_criteria;
///
/// let ic = compute_information_criteria(-100.0, 3, 50);
/// assert!((ic.aic - 206.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn compute_information_criteria(loglik: f64, k: usize, n: usize) -> InformationCriteria {
    let k_f = usize_to_f64(k);
    let n_f = usize_to_f64(n);
    let aic = (-2.0f64).mul_add(loglik, 2.0 * k_f);
    let bic = if n > 1 {
        (-2.0f64).mul_add(loglik, n_f.ln() * k_f)
    } else {
        f64::NAN
    };
    InformationCriteria { loglik, aic, bic }
}

/// Configuration for count model comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonOptions {
    pub glm: FitOptions,
    pub em: EmOptions,
}

/// Errors returned by the comparison workflow.
#[derive(Debug, Error)]
pub enum ModelComparisonError {
    #[error("invalid model input: {0}")]
    Input(#[from] InputError),
    #[error("poisson fit failed: {0}")]
    Poisson(#[from] GlmError),
    #[error("zero-inflated fit failed: {0}")]
    ZeroInflated(#[from] ZeroInflatedError),
    #[error("hurdle fit failed: {0}")]
    Hurdle(#[from] HurdleError),
}

/// One fitted model in the comparison.
#[derive(Debug, Clone)]
pub struct CountModelScore {
    pub name: String,
    pub parameters: usize,
    pub criteria: InformationCriteria,
    /// Root mean squared error of the expected count.
    pub rmse: f64,
    /// Mean absolute error of the expected count.
    pub mae: f64,
    /// Sum over rows of the predicted `Pr(y = 0)`.
    pub predicted_zeros: f64,
}

/// Comparison output, ranked by AIC (best first).
#[derive(Debug, Clone)]
pub struct CountModelComparison {
    pub ranking: Vec<CountModelScore>,
    pub observed_zeros: usize,
    /// Observed zeros against the Poisson fit's expectation.
    pub poisson_zero_excess: ZeroExcess,
}

impl CountModelComparison {
    #[must_use]
    pub fn best(&self) -> Option<&CountModelScore> {
        self.ranking.first()
    }

    #[must_use]
    pub fn score(&self, name: &str) -> Option<&CountModelScore> {
        self.ranking.iter().find(|row| row.name == name)
    }
}

/// Fit Poisson, zero-inflated Poisson, and hurdle models and rank them by AIC.
///
/// # Errors
///
/// Returns `ModelComparisonError` if the input is malformed or any fit fails.
pub fn compare_count_models_input(
    input: &ModelInput,
    options: ComparisonOptions,
) -> Result<CountModelComparison, ModelComparisonError> {
    input.validate()?;
    let n = input.nrows();
    let x = &input.design_matrix;
    let y = &input.outcome;

    let (poisson, poisson_report) = fit_poisson_input(input, options.glm)?;
    let poisson_mu = poisson.predict(x);
    let poisson_zeros = column_to_vec(&map_mat(&poisson_mu, |mu| (-mu).exp()));
    let poisson_zero_excess = zero_excess(y, &poisson_mu);
    let poisson_k = poisson_report.se.nrows();

    let (zip, zip_report) = fit_zero_inflated_input(input, options.em)?;
    let zip_prediction = zip.predict(x)?;

    let (hurdle, hurdle_report) = fit_hurdle_input(input, options.glm)?;
    let hurdle_prediction = hurdle.predict(input)?;
    let hurdle_expected = Mat::from_fn(n, 1, |i, _| {
        hurdle_prediction.expected[i].value.unwrap_or(f64::NAN)
    });
    let hurdle_zeros: Vec<f64> = input
        .observation_ids()
        .iter()
        .map(|&id| {
            hurdle_prediction
                .presence
                .get(id)
                .map_or(f64::NAN, |p| 1.0 - p)
        })
        .collect();

    let mut ranking = vec![
        score_row(
            "poisson",
            poisson_report.log_likelihood,
            poisson_k,
            y,
            &poisson_mu,
            &poisson_zeros,
        ),
        score_row(
            "zero_inflated_poisson",
            zip_report.log_likelihood,
            zip_report.parameter_count(),
            y,
            &zip_prediction.expected,
            &column_to_vec(&zip_prediction.prob_zero),
        ),
        score_row(
            "hurdle_poisson",
            hurdle_report.log_likelihood,
            hurdle_report.parameter_count(),
            y,
            &hurdle_expected,
            &hurdle_zeros,
        ),
    ];
    ranking.sort_by(|a, b| a.criteria.aic.total_cmp(&b.criteria.aic));

    let observed_zeros = n - input.positive_rows().len();
    tracing::debug!(
        best = ranking.first().map_or("", |row| row.name.as_str()),
        observed_zeros,
        "compared count models"
    );

    Ok(CountModelComparison {
        ranking,
        observed_zeros,
        poisson_zero_excess,
    })
}

/// Render a comparison to a formatted table using `comfy_table`.
#[must_use]
pub fn render_comparison_table(report: &CountModelComparison) -> String {
    let mut table = make_table(&[
        "model", "k", "loglik", "aic", "bic", "rmse", "mae", "zeros",
    ]);
    let best = best_values(&report.ranking, usize_to_f64(report.observed_zeros));
    for row in &report.ranking {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.parameters),
            highlight_metric_cell(row.criteria.loglik, best.loglik, 2),
            highlight_metric_cell(row.criteria.aic, best.aic, 2),
            highlight_metric_cell(row.criteria.bic, best.bic, 2),
            highlight_metric_cell(row.rmse, best.rmse, 4),
            highlight_metric_cell(row.mae, best.mae, 4),
            highlight_metric_cell(row.predicted_zeros, best.zeros, 1),
        ]);
    }
    table.add_row(vec![
        Cell::new("observed"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(report.observed_zeros),
    ]);
    table.to_string()
}

fn score_row(
    name: &str,
    loglik: f64,
    parameters: usize,
    y: &Mat<f64>,
    expected: &Mat<f64>,
    prob_zero: &[f64],
) -> CountModelScore {
    let n = y.nrows();
    let criteria = compute_information_criteria(loglik, parameters, n);
    let denom = usize_to_f64(n.max(1));
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for i in 0..n {
        let diff = y[(i, 0)] - expected[(i, 0)];
        squared += diff * diff;
        absolute += diff.abs();
    }
    CountModelScore {
        name: name.to_string(),
        parameters,
        criteria,
        rmse: (squared / denom).sqrt(),
        mae: absolute / denom,
        predicted_zeros: prob_zero.iter().sum(),
    }
}

fn make_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}

#[derive(Debug, Clone, Copy)]
struct MetricBest {
    loglik: f64,
    aic: f64,
    bic: f64,
    rmse: f64,
    mae: f64,
    /// Predicted zero count closest to the observed one.
    zeros: f64,
}

fn best_values(rows: &[CountModelScore], observed_zeros: f64) -> MetricBest {
    MetricBest {
        loglik: rows
            .iter()
            .map(|s| s.criteria.loglik)
            .fold(f64::NEG_INFINITY, f64::max),
        aic: rows.iter().map(|s| s.criteria.aic).fold(f64::INFINITY, f64::min),
        bic: rows.iter().map(|s| s.criteria.bic).fold(f64::INFINITY, f64::min),
        rmse: rows.iter().map(|s| s.rmse).fold(f64::INFINITY, f64::min),
        mae: rows.iter().map(|s| s.mae).fold(f64::INFINITY, f64::min),
        zeros: rows
            .iter()
            .map(|s| s.predicted_zeros)
            .min_by(|a, b| (a - observed_zeros).abs().total_cmp(&(b - observed_zeros).abs()))
            .unwrap_or(f64::NAN),
    }
}

fn highlight_metric_cell(value: f64, best: f64, precision: usize) -> Cell {
    let is_best = (value - best).abs() < 1e-12;
    if is_best {
        Cell::new(format!("{value:.precision$}"))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(format!("{value:.precision$}"))
    }
}
