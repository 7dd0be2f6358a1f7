/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Combining hurdle components into one prediction per observation.
//
// Created on: 03 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Prediction combiner
//!
//! A hurdle prediction is `Pr(present) * E[y | present]`. The positive part is
//! usually fitted (and often predicted) on a filtered subset of rows, so the
//! two components are joined by observation id rather than by position.
//! Components must be on the response scale; link-scale scores are converted
//! with [`ScoredPredictions::to_response_scale`] first.
//!
//! # Examples
//!
//! ```
//! use zero_inflated_models::{PredictionScale, ScoredPredictions, combine_keyed};
//!
//! let presence = ScoredPredictions::from_pairs(PredictionScale::Response, [(0, 0.8), (1, 0.3)]);
//! let positive = ScoredPredictions::from_pairs(PredictionScale::Response, [(0, 5.0)]);
//! let combined = combine_keyed(&presence, &positive, &[0, 1]).expect("response scale");
//!
//! assert_eq!(combined[0].value, Some(4.0));
//! assert_eq!(combined[1].value, None);
//! ```

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use super::link::inverse_logit;

/// Errors returned when combining component predictions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("presence predictions ({presence}) and positive-part predictions ({positive}) differ in length")]
    ShapeMismatch { presence: usize, positive: usize },
    #[error("{component} predictions are on the link scale; convert them to the response scale first")]
    LinkScaleInput { component: &'static str },
    #[error("{ids} observation ids paired with {values} values")]
    IdLengthMismatch { ids: usize, values: usize },
    #[error("observation id {0} requested more than once")]
    DuplicateObservation(u64),
}

/// Scale on which a component prediction is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionScale {
    /// Linear predictor (logit or log).
    Link,
    /// Probability or expected value.
    Response,
}

/// Mapping from a link-scale score to its response-scale value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTransform {
    /// Logit link: `1 / (1 + exp(-eta))`.
    Logistic,
    /// Log link: `exp(eta)`.
    Exp,
    /// Log link of a zero-truncated Poisson: `λ / (1 - exp(-λ))` with `λ = exp(eta)`.
    TruncatedPoissonMean,
}

impl ResponseTransform {
    #[must_use]
    pub fn apply(self, eta: f64) -> f64 {
        match self {
            Self::Logistic => inverse_logit(eta),
            Self::Exp => eta.exp(),
            Self::TruncatedPoissonMean => truncated_poisson_mean(eta.exp()),
        }
    }
}

/// `E[y | y >= 1]` for Poisson rate `lambda`.
///
/// `lambda == 0` gives the limit 1; a negative rate gives NaN.
#[must_use]
pub fn truncated_poisson_mean(lambda: f64) -> f64 {
    if lambda < 0.0 {
        return f64::NAN;
    }
    if lambda == 0.0 {
        return 1.0;
    }
    lambda / -(-lambda).exp_m1()
}

/// Component predictions keyed by observation id.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPredictions {
    pub scale: PredictionScale,
    pub values: BTreeMap<u64, f64>,
}

impl ScoredPredictions {
    #[must_use]
    pub const fn new(scale: PredictionScale, values: BTreeMap<u64, f64>) -> Self {
        Self { scale, values }
    }

    #[must_use]
    pub fn from_pairs(scale: PredictionScale, pairs: impl IntoIterator<Item = (u64, f64)>) -> Self {
        Self {
            scale,
            values: pairs.into_iter().collect(),
        }
    }

    /// Pair ids with values positionally; the caller guarantees alignment.
    ///
    /// # Errors
    ///
    /// Returns `CombineError::IdLengthMismatch` if the lengths differ.
    pub fn from_aligned(
        scale: PredictionScale,
        ids: &[u64],
        values: &[f64],
    ) -> Result<Self, CombineError> {
        if ids.len() != values.len() {
            return Err(CombineError::IdLengthMismatch {
                ids: ids.len(),
                values: values.len(),
            });
        }
        Ok(Self::from_pairs(
            scale,
            ids.iter().copied().zip(values.iter().copied()),
        ))
    }

    /// Explicit link-to-response conversion; response-scale input is returned unchanged.
    #[must_use]
    pub fn to_response_scale(&self, transform: ResponseTransform) -> Self {
        match self.scale {
            PredictionScale::Response => self.clone(),
            PredictionScale::Link => Self {
                scale: PredictionScale::Response,
                values: self
                    .values
                    .iter()
                    .map(|(&id, &eta)| (id, transform.apply(eta)))
                    .collect(),
            },
        }
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<f64> {
        self.values.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Combined prediction for one observation; `None` when a component is unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedPrediction {
    pub id: u64,
    pub value: Option<f64>,
}

/// Elementwise `presence * positive` over two aligned slices.
///
/// NaN in either component propagates to the result.
///
/// # Errors
///
/// Returns `CombineError::ShapeMismatch` if the slices differ in length.
pub fn combine_aligned(presence: &[f64], positive: &[f64]) -> Result<Vec<f64>, CombineError> {
    if presence.len() != positive.len() {
        return Err(CombineError::ShapeMismatch {
            presence: presence.len(),
            positive: positive.len(),
        });
    }
    Ok(presence
        .iter()
        .zip(positive)
        .map(|(&p, &m)| p * m)
        .collect())
}

/// Join presence and positive-part predictions by id and multiply.
///
/// Output follows the order of `ids`. A missing or non-finite component
/// yields `value: None` for that observation.
///
/// # Errors
///
/// Returns `CombineError::LinkScaleInput` if either component is on the link
/// scale, or `CombineError::DuplicateObservation` if `ids` repeats an id.
pub fn combine_keyed(
    presence: &ScoredPredictions,
    positive: &ScoredPredictions,
    ids: &[u64],
) -> Result<Vec<CombinedPrediction>, CombineError> {
    if presence.scale != PredictionScale::Response {
        return Err(CombineError::LinkScaleInput {
            component: "presence",
        });
    }
    if positive.scale != PredictionScale::Response {
        return Err(CombineError::LinkScaleInput {
            component: "positive-part",
        });
    }

    let mut seen = HashSet::with_capacity(ids.len());
    let mut combined = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(CombineError::DuplicateObservation(id));
        }
        let value = match (presence.get(id), positive.get(id)) {
            (Some(p), Some(m)) if p.is_finite() && m.is_finite() => Some(p * m),
            _ => None,
        };
        combined.push(CombinedPrediction { id, value });
    }

    let undefined = combined.iter().filter(|row| row.value.is_none()).count();
    if undefined > 0 {
        tracing::debug!(undefined, total = combined.len(), "combined predictions with missing components");
    }
    Ok(combined)
}
