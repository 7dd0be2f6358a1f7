/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Hurdle data generator: logistic presence and zero-truncated Poisson positives.
//
// Created on: 02 Feb 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Hurdle generator
//!
//! Presence is `Bernoulli(inverse_logit(eta0))` per observation. Present rows
//! draw from a zero-truncated Poisson with rate `exp(eta)`, so absent rows are
//! exactly zero and present rows are at least one.

use rand::RngExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{
    Branch, GroupEffects, LinearPredictor, Observation, ObservationTable, SimulationError,
    block_group, observation_id, validate_design,
};
use crate::distributions::TruncatedPoisson;
use crate::models::link::inverse_logit;

/// Parameters of the hurdle data-generating process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HurdleConfig {
    pub n_obs: usize,
    pub n_groups: usize,
    /// Fixed effects of the zero-truncated count part.
    pub count: LinearPredictor,
    /// Fixed effects of the presence part (`eta0`, logit scale).
    pub presence: LinearPredictor,
    pub group_sd: f64,
    /// Add the group offset to `eta0` as well as to the count predictor.
    pub presence_shares_group_effect: bool,
}

impl Default for HurdleConfig {
    fn default() -> Self {
        Self {
            n_obs: 1_000,
            n_groups: 10,
            count: LinearPredictor::new(0.5, 1.5),
            presence: LinearPredictor::new(-0.5, 2.0),
            group_sd: 0.5,
            presence_shares_group_effect: true,
        }
    }
}

impl HurdleConfig {
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidParameter` if any parameter is out of range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        validate_design(self.n_obs, self.n_groups, self.group_sd)?;
        self.count.validate("count")?;
        self.presence.validate("presence")
    }
}

/// Simulate a hurdle table.
///
/// # Errors
///
/// Returns `SimulationError::InvalidParameter` if the configuration is invalid,
/// `inverse_logit(eta0)` leaves the open unit interval, or the truncated
/// Poisson rate is not a finite positive number.
pub fn simulate_hurdle(
    config: &HurdleConfig,
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
        let presence_offset = if config.presence_shares_group_effect {
            offset
        } else {
            0.0
        };
        let eta0 = presence_offset + config.presence.evaluate(x);

        let presence_probability = presence_probability(eta0)?;
        let (response, branch) = if rng.random_bool(presence_probability) {
            let dist = TruncatedPoisson::new(linear_predictor.exp()).map_err(|err| {
                SimulationError::invalid("linear_predictor", err.to_string())
            })?;
            (
                dist.sample(rng),
                Branch::Present {
                    presence_probability,
                },
            )
        } else {
            (
                0,
                Branch::Absent {
                    presence_probability,
                },
            )
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
        "simulated hurdle table"
    );
    Ok(table)
}

fn presence_probability(eta0: f64) -> Result<f64, SimulationError> {
    let p = inverse_logit(eta0);
    if p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(SimulationError::invalid(
            "presence",
            format!("inverse_logit({eta0}) = {p} is outside (0, 1)"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::seeded_rng;

    #[test]
    fn presence_determines_zero_and_positive_responses() {
        let table =
            simulate_hurdle(&HurdleConfig::default(), &mut seeded_rng(42)).expect("simulate");
        for obs in table.observations() {
            if obs.is_present() {
                assert!(obs.response >= 1, "present row {} has zero", obs.id);
            } else {
                assert_eq!(obs.response, 0);
            }
        }
        assert_eq!(
            table.presence_indicator(),
            table
                .observations()
                .iter()
                .map(Observation::is_present)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn branch_records_presence_probability() {
        let config = HurdleConfig {
            presence_shares_group_effect: false,
            ..HurdleConfig::default()
        };
        let table = simulate_hurdle(&config, &mut seeded_rng(3)).expect("simulate");
        for obs in table.observations() {
            let expected = inverse_logit(config.presence.evaluate(obs.x));
            match obs.branch {
                Branch::Absent {
                    presence_probability,
                }
                | Branch::Present {
                    presence_probability,
                } => assert!((presence_probability - expected).abs() < 1e-12),
                Branch::ExcessZero | Branch::Count => panic!("unexpected branch"),
            }
        }
    }

    #[test]
    fn saturated_presence_predictor_is_rejected() {
        let config = HurdleConfig {
            presence: LinearPredictor::new(60.0, 0.0),
            ..HurdleConfig::default()
        };
        let err = simulate_hurdle(&config, &mut seeded_rng(1)).expect_err("saturated logit");
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "presence", .. }
        ));
    }

    #[test]
    fn tiny_count_rate_still_yields_positive_responses() {
        let config = HurdleConfig {
            count: LinearPredictor::new(-30.0, 0.0),
            group_sd: 0.0,
            ..HurdleConfig::default()
        };
        let table = simulate_hurdle(&config, &mut seeded_rng(5)).expect("simulate");
        assert!(
            table
                .observations()
                .iter()
                .filter(|obs| obs.is_present())
                .all(|obs| obs.response == 1)
        );
    }
}
