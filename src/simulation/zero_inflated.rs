/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Zero-inflated Poisson data generator with group random intercepts.
//
// Created on: 02 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Zero-inflated generator
//!
//! Each observation is a structural zero with probability `zero_probability`
//! and otherwise a `Poisson(exp(eta))` draw, where
//! `eta = group_offset + intercept + slope * x`.

use rand::RngExt;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use super::{
    Branch, GroupEffects, LinearPredictor, Observation, ObservationTable, SimulationError,
    block_group, observation_id, validate_design,
};
use crate::utils::f64_to_count;

/// Parameters of the zero-inflated data-generating process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroInflatedConfig {
    /// Number of observations (N).
    pub n_obs: usize,
    /// Number of groups (G), filled as equal contiguous blocks.
    pub n_groups: usize,
    /// Probability of a structural zero (`pz`).
    pub zero_probability: f64,
    /// Fixed effects of the count part.
    pub count: LinearPredictor,
    /// Standard deviation of the group random intercept.
    pub group_sd: f64,
}

impl Default for ZeroInflatedConfig {
    fn default() -> Self {
        Self {
            n_obs: 1_000,
            n_groups: 10,
            zero_probability: 0.3,
            count: LinearPredictor::new(0.5, 1.5),
            group_sd: 0.5,
        }
    }
}

impl ZeroInflatedConfig {
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidParameter` if any parameter is out of range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        validate_design(self.n_obs, self.n_groups, self.group_sd)?;
        if !(0.0..=1.0).contains(&self.zero_probability) {
            return Err(SimulationError::invalid(
                "zero_probability",
                format!("must lie in [0, 1], got {}", self.zero_probability),
            ));
        }
        self.count.validate("count")
    }
}

/// Simulate a zero-inflated Poisson table.
///
/// Draw order: group offsets first, then per observation `x`, the
/// structural-zero indicator, and (for non-structural rows) the Poisson count.
///
/// # Errors
///
/// Returns `SimulationError::InvalidParameter` if the configuration is invalid
/// or a Poisson mean overflows.
pub fn simulate_zero_inflated(
    config: &ZeroInflatedConfig,
    rng: &mut StdRng,
) -> Result<ObservationTable, SimulationError> {
    config.validate()?;
    let group_effects = GroupEffects::draw(config.n_groups, config.group_sd, rng)?;

    let mut observations = Vec::with_capacity(config.n_obs);
    for index in 0..config.n_obs {
        let group = block_group(index, config.n_obs, config.n_groups);
        let offset = group_effects.offset(group).unwrap_or(0.0);
        let x = rng.random::<f64>();
        let linear_predictor = offset + config.count.evaluate(x);

        let excess_zero = rng.random_bool(config.zero_probability);
        let (response, branch) = if excess_zero {
            (0, Branch::ExcessZero)
        } else {
            (poisson_draw(linear_predictor.exp(), rng)?, Branch::Count)
        };

        observations.push(Observation {
            id: observation_id(index),
            group,
            x,
            linear_predictor,
            response,
            branch,
        });
    }

    let table = ObservationTable::new(observations, group_effects);
    tracing::debug!(
        n_obs = table.len(),
        zero_share = table.zero_share(),
        mean_response = table.mean_response(),
        "simulated zero-inflated table"
    );
    Ok(table)
}

/// Untruncated Poisson draw; a mean that underflows to zero yields zero.
pub(crate) fn poisson_draw(mean: f64, rng: &mut StdRng) -> Result<u64, SimulationError> {
    if mean == 0.0 {
        return Ok(0);
    }
    let poisson = Poisson::new(mean).map_err(|err| {
        SimulationError::invalid("linear_predictor", format!("Poisson mean {mean}: {err}"))
    })?;
    let draw: f64 = poisson.sample(rng);
    f64_to_count(draw).ok_or_else(|| {
        SimulationError::invalid("linear_predictor", format!("Poisson draw {draw} is not a count"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::seeded_rng;

    #[test]
    fn excess_zeros_always_have_zero_response() {
        let table = simulate_zero_inflated(&ZeroInflatedConfig::default(), &mut seeded_rng(42))
            .expect("simulate");
        let violations = table
            .observations()
            .iter()
            .filter(|obs| obs.is_excess_zero() && obs.response != 0)
            .count();
        assert_eq!(violations, 0);
        assert!(table.observations().iter().any(Observation::is_excess_zero));
        // Poisson zeros exist alongside structural zeros.
        assert!(
            table
                .observations()
                .iter()
                .any(|obs| !obs.is_excess_zero() && obs.response == 0)
        );
    }

    #[test]
    fn zero_probability_of_one_yields_all_zeros() {
        let config = ZeroInflatedConfig {
            zero_probability: 1.0,
            ..ZeroInflatedConfig::default()
        };
        let table = simulate_zero_inflated(&config, &mut seeded_rng(1)).expect("simulate");
        assert!(table.responses().iter().all(|&y| y == 0));
        assert!(table.observations().iter().all(Observation::is_excess_zero));
    }

    #[test]
    fn zero_probability_of_zero_has_no_structural_zeros() {
        let config = ZeroInflatedConfig {
            zero_probability: 0.0,
            ..ZeroInflatedConfig::default()
        };
        let table = simulate_zero_inflated(&config, &mut seeded_rng(2)).expect("simulate");
        assert!(!table.observations().iter().any(Observation::is_excess_zero));
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        for zero_probability in [-0.1, 1.1, f64::NAN] {
            let config = ZeroInflatedConfig {
                zero_probability,
                ..ZeroInflatedConfig::default()
            };
            let err = simulate_zero_inflated(&config, &mut seeded_rng(0))
                .expect_err("invalid probability");
            assert!(matches!(
                err,
                SimulationError::InvalidParameter {
                    name: "zero_probability",
                    ..
                }
            ));
        }
    }

    #[test]
    fn overflowing_mean_is_reported() {
        let config = ZeroInflatedConfig {
            zero_probability: 0.0,
            count: LinearPredictor::new(800.0, 0.0),
            ..ZeroInflatedConfig::default()
        };
        let err = simulate_zero_inflated(&config, &mut seeded_rng(0)).expect_err("overflow");
        assert!(matches!(
            err,
            SimulationError::InvalidParameter {
                name: "linear_predictor",
                ..
            }
        ));
    }

    #[test]
    fn linear_predictor_includes_group_offset() {
        let table = simulate_zero_inflated(&ZeroInflatedConfig::default(), &mut seeded_rng(8))
            .expect("simulate");
        let count = ZeroInflatedConfig::default().count;
        for obs in table.observations() {
            let offset = table.group_effects().offset(obs.group).expect("group offset");
            assert!((obs.linear_predictor - (offset + count.evaluate(obs.x))).abs() < 1e-12);
        }
    }
}
