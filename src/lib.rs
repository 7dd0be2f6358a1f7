#![forbid(unsafe_code)]

//! # `zero_inflated_models`
//!
//! Simulation and fitting of zero-heavy count data:
//! - seeded generators for zero-inflated Poisson and hurdle (binomial +
//!   zero-truncated Poisson) data with grouped random intercepts,
//! - an exact zero-truncated Poisson sampler,
//! - Poisson, zero-inflated Poisson, and hurdle fits with AIC/BIC comparison,
//! - a keyed combiner for hurdle component predictions and a logit-scale
//!   back-transform for interval estimates.
//!
//! # Examples
//!
//! ```
//! use zero_inflated_models::{ZeroInflatedConfig, seeded_rng, simulate_zero_inflated};
//!
//! let config = ZeroInflatedConfig { n_obs: 200, ..ZeroInflatedConfig::default() };
//! let table = simulate_zero_inflated(&config, &mut seeded_rng(1)).expect("valid config");
//!
//! assert_eq!(table.len(), 200);
//! assert!(table.observations().iter().filter(|obs| obs.is_excess_zero()).all(|obs| obs.response == 0));
//! ```

pub mod distributions;
pub mod input;
pub mod models;
pub mod preprocess;
pub mod simulation;
pub mod utils;

pub use distributions::{DistributionError, TruncatedPoisson, sample_truncated_poisson};
pub use input::{DesignOptions, InputError, ModelInput};
pub use preprocess::{CountDiagnostics, ZeroExcess, count_diagnostics, zero_excess};
pub use simulation::{
    Branch, GroupEffects, HurdleConfig, LinearPredictor, Observation, ObservationTable,
    SimulationError, ZeroInflatedConfig, seeded_rng, simulate_hurdle, simulate_zero_inflated,
};
pub mod comparison {
    pub use crate::models::comparison::*;
}
pub mod matrix_ops {
    pub use crate::models::matrix_ops::*;
}

pub use models::link::{
    LinkError, ProbabilityInterval, WALD_Z_95, back_transform_logit, back_transform_logit_level,
    inverse_logit, logit,
};

pub use models::combine::{
    CombineError, CombinedPrediction, PredictionScale, ResponseTransform, ScoredPredictions,
    combine_aligned, combine_keyed, truncated_poisson_mean,
};

pub use models::glm::{
    Family, FitOptions, GlmError, GlmFit, PoissonModel, PoissonReport, binomial_log_likelihood,
    fit_glm, fit_poisson_input, poisson_log_likelihood, truncated_poisson_log_likelihood,
};

pub use models::hurdle::{
    HurdleError, HurdleModel, HurdlePrediction, HurdleReport, fit_hurdle_input,
};

pub use models::zero_inflated::{
    EmOptions, ZeroDesign, ZeroInflatedError, ZeroInflatedModel, ZeroInflatedPrediction,
    ZeroInflatedReport, fit_zero_inflated_input, zip_log_likelihood,
};

pub use models::comparison::{
    ComparisonOptions, CountModelComparison, CountModelScore, InformationCriteria,
    ModelComparisonError, compare_count_models_input, compute_information_criteria,
    render_comparison_table,
};
