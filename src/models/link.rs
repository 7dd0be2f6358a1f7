//! Link functions and logit-scale back-transforms.

use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

/// Two-sided 95% normal critical value used by the default back-transform.
pub const WALD_Z_95: f64 = 1.96;

/// Errors returned by link transforms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkError {
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Stable logistic transform (inverse logit).
#[must_use]
pub fn inverse_logit(value: f64) -> f64 {
    if value >= 0.0 {
        let z = (-value).exp();
        1.0 / (1.0 + z)
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}

/// Log-odds of a probability.
///
/// # Errors
///
/// Returns `LinkError::InvalidParameter` unless `0 < probability < 1`.
pub fn logit(probability: f64) -> Result<f64, LinkError> {
    if probability > 0.0 && probability < 1.0 {
        Ok((probability / (1.0 - probability)).ln())
    } else {
        Err(LinkError::InvalidParameter {
            name: "probability",
            value: probability,
        })
    }
}

/// Point estimate and interval bounds on the probability scale.
///
/// The bounds are the logistic images of a symmetric logit-scale Wald
/// interval; they are ordered but not symmetric around `estimate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityInterval {
    pub lower: f64,
    pub estimate: f64,
    pub upper: f64,
}

/// Back-transform `(e - 1.96 se, e, e + 1.96 se)` to the probability scale.
///
/// # Errors
///
/// Returns `LinkError::InvalidParameter` if `se` is negative, an input is not
/// finite, or a bound saturates to 0 or 1.
///
/// # Examples
///
/// ```
/// use zero_inflated_models::back_transform_logit;
///
/// let interval = back_transform_logit(0.0, 0.5).expect("finite inputs");
/// assert!((interval.estimate - 0.5).abs() < 1e-12);
/// assert!(interval.lower < interval.estimate && interval.estimate < interval.upper);
/// ```
pub fn back_transform_logit(estimate: f64, se: f64) -> Result<ProbabilityInterval, LinkError> {
    back_transform_with_z(estimate, se, WALD_Z_95)
}

/// Back-transform a `1 - alpha` Wald interval to the probability scale.
///
/// # Errors
///
/// Returns `LinkError::InvalidParameter` if `alpha` is outside `(0, 1)`, `se`
/// is negative, an input is not finite, or a bound saturates to 0 or 1.
pub fn back_transform_logit_level(
    estimate: f64,
    se: f64,
    alpha: f64,
) -> Result<ProbabilityInterval, LinkError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(LinkError::InvalidParameter {
            name: "alpha",
            value: alpha,
        });
    }
    back_transform_with_z(estimate, se, normal_quantile(1.0 - alpha / 2.0))
}

fn back_transform_with_z(
    estimate: f64,
    se: f64,
    z: f64,
) -> Result<ProbabilityInterval, LinkError> {
    if !estimate.is_finite() {
        return Err(LinkError::InvalidParameter {
            name: "estimate",
            value: estimate,
        });
    }
    if !(se.is_finite() && se >= 0.0) {
        return Err(LinkError::InvalidParameter {
            name: "se",
            value: se,
        });
    }
    let half_width = z * se;
    Ok(ProbabilityInterval {
        lower: open_unit_probability(estimate - half_width)?,
        estimate: open_unit_probability(estimate)?,
        upper: open_unit_probability(estimate + half_width)?,
    })
}

fn open_unit_probability(logit_value: f64) -> Result<f64, LinkError> {
    let p = inverse_logit(logit_value);
    if p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(LinkError::InvalidParameter {
            name: "logit",
            value: logit_value,
        })
    }
}

pub(crate) fn normal_quantile(p: f64) -> f64 {
    Normal::new(0.0, 1.0).map_or(f64::NAN, |normal| normal.inverse_cdf(p))
}
