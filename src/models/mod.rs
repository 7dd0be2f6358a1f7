//! # Models
//!
//! Count models for zero-heavy outcomes: canonical-link GLMs, zero-inflated
//! Poisson, and the two-part hurdle model, with the link transforms and
//! prediction combiner they share and a comparison workflow across them.

pub mod combine;
pub mod comparison;
pub mod glm;
pub mod hurdle;
pub mod link;
pub mod matrix_ops;
pub mod zero_inflated;
