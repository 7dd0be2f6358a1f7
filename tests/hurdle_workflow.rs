use std::collections::BTreeMap;

use approx::assert_relative_eq;
use zero_inflated_models::{
    ComparisonOptions, DesignOptions, EmOptions, FitOptions, HurdleConfig, LinearPredictor,
    ModelInput, ResponseTransform, ZeroInflatedConfig, combine_keyed, compare_count_models_input,
    count_diagnostics, fit_hurdle_input, fit_zero_inflated_input, render_comparison_table,
    seeded_rng, simulate_hurdle, simulate_zero_inflated,
};

#[test]
fn hurdle_public_workflow_attaches_predictions_by_id() {
    let config = HurdleConfig {
        n_obs: 3_000,
        n_groups: 6,
        group_sd: 0.3,
        ..HurdleConfig::default()
    };
    let mut table = simulate_hurdle(&config, &mut seeded_rng(2024)).expect("simulate");
    let input = ModelInput::from_table(
        &table,
        DesignOptions {
            group_intercepts: true,
        },
    );
    assert_eq!(input.design_matrix.ncols(), 2 + 5);

    let (model, report) = fit_hurdle_input(&input, FitOptions::default()).expect("fit");
    assert_eq!(report.n_positive, input.positive_rows().len());
    assert_relative_eq!(model.beta_presence[(1, 0)], 2.0, epsilon = 0.4);
    assert_relative_eq!(model.beta_count[(1, 0)], 1.5, epsilon = 0.3);

    // Positive part predicted only on the fitted subset, joined back by id.
    let positive_input = input.subset(&input.positive_rows());
    let (presence_link, _) = model.predict_link(&input).expect("presence");
    let (_, count_link) = model.predict_link(&positive_input).expect("count");
    let presence = presence_link.to_response_scale(ResponseTransform::Logistic);
    let positive = count_link.to_response_scale(ResponseTransform::TruncatedPoissonMean);
    let combined = combine_keyed(&presence, &positive, input.observation_ids()).expect("combine");

    let keyed: BTreeMap<u64, f64> = combined
        .iter()
        .filter_map(|row| row.value.map(|value| (row.id, value)))
        .collect();
    table.attach_predictions(&keyed);
    let attached = table.predictions().expect("attached column");
    assert_eq!(attached.len(), table.len());
    for (obs, prediction) in table.observations().iter().zip(attached) {
        assert_eq!(prediction.is_some(), obs.is_positive());
        if let Some(value) = prediction {
            assert!(*value > 0.0);
        }
    }

    // The full-data prediction defines every row.
    let full = model.predict(&input).expect("predict");
    table.attach_predictions(&full.expected_by_id());
    assert!(
        table
            .predictions()
            .expect("attached column")
            .iter()
            .all(Option::is_some)
    );
}

#[test]
fn zero_inflated_fit_beats_poisson_on_aic() {
    let config = ZeroInflatedConfig {
        n_obs: 3_000,
        zero_probability: 0.35,
        count: LinearPredictor::new(0.4, 1.2),
        group_sd: 0.0,
        ..ZeroInflatedConfig::default()
    };
    let table = simulate_zero_inflated(&config, &mut seeded_rng(77)).expect("simulate");
    let input = ModelInput::from_table(&table, DesignOptions::default());

    let diagnostics = count_diagnostics(&input.outcome);
    assert_eq!(diagnostics.n_invalid, 0);
    assert!(diagnostics.dispersion > 1.0);

    let (zip, zip_report) = fit_zero_inflated_input(&input, EmOptions::default()).expect("zip");
    assert_relative_eq!(zip.baseline_zero_inflation(), 0.35, epsilon = 0.05);
    let interval = zip.zero_inflation_interval(&zip_report).expect("interval");
    assert!(interval.lower < interval.estimate && interval.estimate < interval.upper);
    assert!(interval.lower < 0.40 && interval.upper > 0.30);

    let comparison =
        compare_count_models_input(&input, ComparisonOptions::default()).expect("comparison");
    let poisson = comparison.score("poisson").expect("poisson");
    let zip_row = comparison
        .score("zero_inflated_poisson")
        .expect("zero-inflated row");
    assert!(zip_row.criteria.aic < poisson.criteria.aic);
    assert_relative_eq!(
        zip_row.criteria.loglik,
        zip_report.log_likelihood,
        epsilon = 1e-9
    );

    let rendered = render_comparison_table(&comparison);
    assert!(rendered.contains("zero_inflated_poisson"));
}
