//! # Distributions
//!
//! Count distributions that the generic sampling crates do not provide.

use thiserror::Error;

pub mod truncated_poisson;

pub use truncated_poisson::{TruncatedPoisson, sample_truncated_poisson};

/// Errors returned when constructing a distribution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
