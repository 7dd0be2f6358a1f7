use tracing_subscriber::EnvFilter;
use zero_inflated_models::{
    DesignOptions, EmOptions, ModelInput, ZeroInflatedConfig, count_diagnostics,
    fit_zero_inflated_input, seeded_rng, simulate_zero_inflated,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ZeroInflatedConfig::default();
    let table = simulate_zero_inflated(&config, &mut seeded_rng(42)).expect("simulate");
    let excess = table
        .observations()
        .iter()
        .filter(|obs| obs.is_excess_zero())
        .count();
    println!(
        "Simulated {} rows in {} groups: zero share {:.3}, excess zeros {excess}, mean {:.3}",
        table.len(),
        table.group_effects().len(),
        table.zero_share(),
        table.mean_response()
    );

    let input = ModelInput::from_table(&table, DesignOptions::default());
    let diagnostics = count_diagnostics(&input.outcome);
    println!(
        "Dispersion (variance / mean): {:.3}",
        diagnostics.dispersion
    );

    let (model, report) = fit_zero_inflated_input(&input, EmOptions::default()).expect("fit");
    println!(
        "EM converged in {} iterations, log-likelihood {:.2}",
        report.iterations, report.log_likelihood
    );
    println!(
        "Count part: intercept {:.3} (true {}), slope {:.3} (true {})",
        model.beta_count[(0, 0)],
        config.count.intercept,
        model.beta_count[(1, 0)],
        config.count.slope
    );
    let interval = model
        .zero_inflation_interval(&report)
        .expect("back-transform");
    println!(
        "Zero-inflation probability {:.3} [{:.3}, {:.3}] (true {})",
        interval.estimate, interval.lower, interval.upper, config.zero_probability
    );
}
