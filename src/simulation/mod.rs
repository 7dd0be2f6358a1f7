//! # Simulation
//!
//! Seeded data-generating processes for zero-inflated and hurdle count data
//! with a per-group random intercept.
//!
//! Generators never touch a global seed: the caller constructs a `StdRng`
//! (see [`seeded_rng`]) and threads it through each call, so independent
//! datasets can be produced side by side and reproduced bit for bit.
//!
//! # Examples
//!
//! ```
//! use zero_inflated_models::{ZeroInflatedConfig, seeded_rng, simulate_zero_inflated};
//!
//! let config = ZeroInflatedConfig { n_obs: 200, ..ZeroInflatedConfig::default() };
//! let table = simulate_zero_inflated(&config, &mut seeded_rng(1)).expect("simulate");
//!
//! assert_eq!(table.len(), 200);
//! assert!(table.observations().iter().all(|obs| !obs.is_excess_zero() || obs.response == 0));
//! ```

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::{u64_to_f64, usize_to_f64};

pub mod hurdle;
pub mod zero_inflated;

pub use hurdle::{HurdleConfig, simulate_hurdle};
pub use zero_inflated::{ZeroInflatedConfig, simulate_zero_inflated};

/// Errors returned by the data generators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Construct the caller-owned random source used by the generators.
#[must_use]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Fixed-effect part of a linear predictor `intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPredictor {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearPredictor {
    #[must_use]
    pub const fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }

    #[must_use]
    pub fn evaluate(self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    pub(crate) fn validate(self, name: &'static str) -> Result<(), SimulationError> {
        if self.intercept.is_finite() && self.slope.is_finite() {
            Ok(())
        } else {
            Err(SimulationError::invalid(
                name,
                "intercept and slope must be finite",
            ))
        }
    }
}

/// Ground-truth generative branch of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum Branch {
    /// Structural zero from the zero-inflation component.
    ExcessZero,
    /// Draw from the untruncated count distribution (may still be zero).
    Count,
    /// Hurdle not crossed; the response is exactly zero.
    Absent { presence_probability: f64 },
    /// Hurdle crossed; the response is a zero-truncated draw.
    Present { presence_probability: f64 },
}

/// One simulated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub group: u64,
    pub x: f64,
    pub linear_predictor: f64,
    pub response: u64,
    pub branch: Branch,
}

impl Observation {
    #[must_use]
    pub const fn is_excess_zero(&self) -> bool {
        matches!(self.branch, Branch::ExcessZero)
    }

    /// True if the hurdle was crossed. Observations from the zero-inflation
    /// scenario report `false`.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self.branch, Branch::Present { .. })
    }

    /// Derived presence indicator (`response > 0`).
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.response > 0
    }
}

/// Per-group random intercept offsets, indexed by group label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEffects {
    offsets: Vec<f64>,
}

impl GroupEffects {
    /// Draw `n_groups` offsets from `Normal(0, sd)`.
    pub(crate) fn draw(
        n_groups: usize,
        sd: f64,
        rng: &mut StdRng,
    ) -> Result<Self, SimulationError> {
        let normal = Normal::new(0.0, sd)
            .map_err(|err| SimulationError::invalid("group_sd", err.to_string()))?;
        let offsets = (0..n_groups).map(|_| normal.sample(rng)).collect();
        Ok(Self { offsets })
    }

    #[must_use]
    pub fn from_offsets(offsets: Vec<f64>) -> Self {
        Self { offsets }
    }

    #[must_use]
    pub fn offset(&self, group: u64) -> Option<f64> {
        usize::try_from(group)
            .ok()
            .and_then(|idx| self.offsets.get(idx).copied())
    }

    #[must_use]
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// In-memory observation table shared by generation, fitting, and plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    observations: Vec<Observation>,
    group_effects: GroupEffects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predictions: Option<Vec<Option<f64>>>,
}

impl ObservationTable {
    #[must_use]
    pub const fn new(observations: Vec<Observation>, group_effects: GroupEffects) -> Self {
        Self {
            observations,
            group_effects,
            predictions: None,
        }
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[must_use]
    pub const fn group_effects(&self) -> &GroupEffects {
        &self.group_effects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.observations.iter().map(|obs| obs.id).collect()
    }

    #[must_use]
    pub fn responses(&self) -> Vec<u64> {
        self.observations.iter().map(|obs| obs.response).collect()
    }

    /// Derived presence-indicator column (`response > 0`).
    #[must_use]
    pub fn presence_indicator(&self) -> Vec<bool> {
        self.observations.iter().map(Observation::is_positive).collect()
    }

    /// Share of observations with a zero response.
    #[must_use]
    pub fn zero_share(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        let zeros = self.observations.iter().filter(|obs| obs.response == 0).count();
        usize_to_f64(zeros) / usize_to_f64(self.observations.len())
    }

    /// Mean response.
    #[must_use]
    pub fn mean_response(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        let total: f64 = self.observations.iter().map(|obs| u64_to_f64(obs.response)).sum();
        total / usize_to_f64(self.observations.len())
    }

    /// Attach a prediction column, matched to rows by observation id.
    ///
    /// Rows without a prediction receive `None`.
    pub fn attach_predictions(&mut self, predictions: &BTreeMap<u64, f64>) {
        let column = self
            .observations
            .iter()
            .map(|obs| predictions.get(&obs.id).copied())
            .collect();
        self.predictions = Some(column);
    }

    /// The attached prediction column, if any.
    #[must_use]
    pub fn predictions(&self) -> Option<&[Option<f64>]> {
        self.predictions.as_deref()
    }
}

/// Group label for observation `index` under equal contiguous blocks.
pub(crate) fn block_group(index: usize, n_obs: usize, n_groups: usize) -> u64 {
    let group = index.saturating_mul(n_groups) / n_obs.max(1);
    u64::try_from(group).unwrap_or(u64::MAX)
}

pub(crate) fn validate_design(
    n_obs: usize,
    n_groups: usize,
    group_sd: f64,
) -> Result<(), SimulationError> {
    if n_obs == 0 {
        return Err(SimulationError::invalid("n_obs", "must be positive"));
    }
    if n_groups == 0 {
        return Err(SimulationError::invalid("n_groups", "must be positive"));
    }
    if n_groups > n_obs {
        return Err(SimulationError::invalid(
            "n_groups",
            format!("{n_groups} groups cannot be filled by {n_obs} observations"),
        ));
    }
    if !(group_sd.is_finite() && group_sd >= 0.0) {
        return Err(SimulationError::invalid(
            "group_sd",
            format!("must be finite and non-negative, got {group_sd}"),
        ));
    }
    Ok(())
}

pub(crate) fn observation_id(index: usize) -> u64 {
    u64::try_from(index).unwrap_or(u64::MAX)
}
