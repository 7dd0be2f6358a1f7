use tracing_subscriber::EnvFilter;
use zero_inflated_models::{
    ComparisonOptions, DesignOptions, ModelInput, ZeroInflatedConfig, compare_count_models_input,
    render_comparison_table, seeded_rng, simulate_zero_inflated,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ZeroInflatedConfig {
        n_obs: 2_000,
        ..ZeroInflatedConfig::default()
    };
    let table = simulate_zero_inflated(&config, &mut seeded_rng(123)).expect("simulate");
    let input = ModelInput::from_table(
        &table,
        DesignOptions {
            group_intercepts: true,
        },
    );

    let report =
        compare_count_models_input(&input, ComparisonOptions::default()).expect("compare models");
    println!(
        "Observed zeros {} vs. {:.1} expected under Poisson (ratio {:.2})\n",
        report.observed_zeros,
        report.poisson_zero_excess.expected_zeros,
        report.poisson_zero_excess.ratio
    );
    println!(
        "Count model comparison (ranked by AIC; zeros = predicted zero count)\n\n{}",
        render_comparison_table(&report)
    );
    if let Some(best) = report.best() {
        println!("\nPreferred by AIC: {}", best.name);
    }
}
