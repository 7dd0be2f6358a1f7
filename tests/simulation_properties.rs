use std::collections::BTreeMap;

use approx::assert_relative_eq;
use zero_inflated_models::{
    Branch, CombineError, HurdleConfig, LinearPredictor, PredictionScale, ScoredPredictions,
    SimulationError, TruncatedPoisson, ZeroInflatedConfig, back_transform_logit, combine_aligned,
    combine_keyed, sample_truncated_poisson, seeded_rng, simulate_hurdle, simulate_zero_inflated,
};

fn idx_to_f64(idx: usize) -> f64 {
    f64::from(u32::try_from(idx).unwrap_or(u32::MAX))
}

#[test]
fn zero_inflated_composition_matches_mixture_weights() {
    let config = ZeroInflatedConfig {
        n_obs: 20_000,
        ..ZeroInflatedConfig::default()
    };
    let table = simulate_zero_inflated(&config, &mut seeded_rng(101)).expect("simulate");
    let n = idx_to_f64(table.len());
    let excess = table
        .observations()
        .iter()
        .filter(|obs| obs.is_excess_zero())
        .count();
    let share = idx_to_f64(excess) / n;
    let se = (0.3f64 * 0.7 / n).sqrt();
    assert!((share - 0.3).abs() < 4.0 * se, "excess share {share}");
    assert!(
        table
            .observations()
            .iter()
            .filter(|obs| obs.is_excess_zero())
            .all(|obs| obs.response == 0)
    );
    // Count-branch zeros make the overall zero share exceed the excess share.
    assert!(table.zero_share() > share);
}

#[test]
fn hurdle_rows_respect_truncation() {
    let table = simulate_hurdle(&HurdleConfig::default(), &mut seeded_rng(102)).expect("simulate");
    for obs in table.observations() {
        match obs.branch {
            Branch::Present {
                presence_probability,
            } => {
                assert!(obs.response >= 1);
                assert!(presence_probability > 0.0 && presence_probability < 1.0);
            }
            Branch::Absent { .. } => assert_eq!(obs.response, 0),
            Branch::ExcessZero | Branch::Count => panic!("unexpected branch in hurdle table"),
        }
        assert_eq!(obs.is_present(), obs.is_positive());
    }
}

#[test]
fn group_offsets_are_shared_within_groups() {
    let config = ZeroInflatedConfig {
        n_obs: 100,
        n_groups: 4,
        group_sd: 1.0,
        ..ZeroInflatedConfig::default()
    };
    let table = simulate_zero_inflated(&config, &mut seeded_rng(103)).expect("simulate");
    assert_eq!(table.group_effects().len(), 4);
    for obs in table.observations() {
        let offset = table.group_effects().offset(obs.group).expect("known group");
        assert_relative_eq!(
            obs.linear_predictor,
            offset + config.count.evaluate(obs.x),
            epsilon = 1e-12
        );
        assert!(obs.x >= 0.0 && obs.x < 1.0);
    }
    let groups: Vec<u64> = table.observations().iter().map(|obs| obs.group).collect();
    assert!(groups.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(groups.first(), Some(&0));
    assert_eq!(groups.last(), Some(&3));
}

#[test]
fn truncated_poisson_sampler_matches_cdf() {
    let lambda = 2.0;
    let draws = 100_000usize;
    let dist = TruncatedPoisson::new(lambda).expect("valid rate");
    let mut rng = seeded_rng(104);
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for _ in 0..draws {
        let k = sample_truncated_poisson(lambda, &mut rng).expect("valid rate");
        assert!(k >= 1);
        *counts.entry(k).or_default() += 1;
    }
    let max_k = counts.keys().copied().max().unwrap_or(1);
    let mut cumulative = 0usize;
    let mut ks = 0.0f64;
    for k in 1..=max_k {
        cumulative += counts.get(&k).copied().unwrap_or(0);
        let empirical = idx_to_f64(cumulative) / idx_to_f64(draws);
        ks = ks.max((empirical - dist.cdf(k)).abs());
    }
    assert!(ks < 0.01, "discrete KS statistic {ks}");
}

#[test]
fn sampler_rejects_invalid_rates() {
    let mut rng = seeded_rng(105);
    for lambda in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(sample_truncated_poisson(lambda, &mut rng).is_err());
    }
}

#[test]
fn generators_are_reproducible_from_seed() {
    let config = HurdleConfig {
        n_obs: 300,
        ..HurdleConfig::default()
    };
    let first = simulate_hurdle(&config, &mut seeded_rng(7)).expect("simulate");
    let second = simulate_hurdle(&config, &mut seeded_rng(7)).expect("simulate");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );

    let other = simulate_hurdle(&config, &mut seeded_rng(8)).expect("simulate");
    assert_ne!(first, other);
}

#[test]
fn independent_streams_do_not_interfere() {
    let config = ZeroInflatedConfig {
        n_obs: 200,
        ..ZeroInflatedConfig::default()
    };
    let alone = simulate_zero_inflated(&config, &mut seeded_rng(9)).expect("simulate");

    let mut rng_a = seeded_rng(9);
    let mut rng_b = seeded_rng(10);
    let _ = simulate_hurdle(&HurdleConfig::default(), &mut rng_b).expect("simulate");
    let interleaved = simulate_zero_inflated(&config, &mut rng_a).expect("simulate");
    assert_eq!(alone, interleaved);
}

#[test]
fn observation_table_serializes_branch_tags() {
    let config = HurdleConfig {
        n_obs: 20,
        n_groups: 2,
        ..HurdleConfig::default()
    };
    let table = simulate_hurdle(&config, &mut seeded_rng(11)).expect("simulate");
    let json = serde_json::to_value(&table).expect("serialize");
    let first = &json["observations"][0];
    let tag = first["branch"]["branch"].as_str().expect("tag");
    assert!(tag == "present" || tag == "absent");
    assert!(first["branch"]["presence_probability"].is_number());
}

#[test]
fn invalid_configs_are_rejected() {
    let bad_probability = ZeroInflatedConfig {
        zero_probability: 1.5,
        ..ZeroInflatedConfig::default()
    };
    assert!(matches!(
        simulate_zero_inflated(&bad_probability, &mut seeded_rng(1)),
        Err(SimulationError::InvalidParameter {
            name: "zero_probability",
            ..
        })
    ));

    let too_many_groups = HurdleConfig {
        n_obs: 3,
        n_groups: 4,
        ..HurdleConfig::default()
    };
    assert!(simulate_hurdle(&too_many_groups, &mut seeded_rng(1)).is_err());

    let saturated = HurdleConfig {
        presence: LinearPredictor::new(60.0, 0.0),
        group_sd: 0.0,
        ..HurdleConfig::default()
    };
    assert!(matches!(
        simulate_hurdle(&saturated, &mut seeded_rng(1)),
        Err(SimulationError::InvalidParameter { name: "presence", .. })
    ));
}

#[test]
fn back_transform_is_monotone_in_estimate() {
    let mut previous = back_transform_logit(-4.0, 0.3).expect("interval");
    for step in 1..=80 {
        let estimate = -4.0 + 0.1 * idx_to_f64(step);
        let current = back_transform_logit(estimate, 0.3).expect("interval");
        assert!(current.lower > previous.lower);
        assert!(current.estimate > previous.estimate);
        assert!(current.upper > previous.upper);
        previous = current;
    }
}

#[test]
fn combiner_matches_worked_example() {
    let combined = combine_aligned(&[0.8, 0.3], &[5.0, 2.0]).expect("same length");
    assert_relative_eq!(combined[0], 4.0);
    assert_relative_eq!(combined[1], 0.6);
    assert!(matches!(
        combine_aligned(&[0.8], &[5.0, 2.0]),
        Err(CombineError::ShapeMismatch { .. })
    ));

    let presence = ScoredPredictions::from_pairs(PredictionScale::Response, [(3, 0.8), (4, 0.3)]);
    let positive = ScoredPredictions::from_pairs(PredictionScale::Response, [(4, 2.0)]);
    let keyed = combine_keyed(&presence, &positive, &[3, 4]).expect("combine");
    assert_eq!(keyed[0].value, None);
    assert_relative_eq!(keyed[1].value.expect("defined"), 0.6);
}
