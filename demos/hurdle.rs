use tracing_subscriber::EnvFilter;
use zero_inflated_models::{
    DesignOptions, FitOptions, HurdleConfig, ModelInput, fit_hurdle_input, seeded_rng,
    simulate_hurdle,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = HurdleConfig::default();
    let mut table = simulate_hurdle(&config, &mut seeded_rng(7)).expect("simulate");
    println!(
        "Simulated {} rows: zero share {:.3}, mean {:.3}",
        table.len(),
        table.zero_share(),
        table.mean_response()
    );

    let input = ModelInput::from_table(
        &table,
        DesignOptions {
            group_intercepts: true,
        },
    );
    let (model, report) = fit_hurdle_input(&input, FitOptions::default()).expect("fit");
    println!(
        "Presence slope {:.3} (true {}), count slope {:.3} (true {}), positives {}",
        model.beta_presence[(1, 0)],
        config.presence.slope,
        model.beta_count[(1, 0)],
        config.count.slope,
        report.n_positive
    );
    let baseline = model.baseline_presence(&report).expect("back-transform");
    println!(
        "Baseline presence probability {:.3} [{:.3}, {:.3}]",
        baseline.estimate, baseline.lower, baseline.upper
    );

    let prediction = model.predict(&input).expect("predict");
    table.attach_predictions(&prediction.expected_by_id());
    println!("\n   id  group      x  y  expected");
    for (obs, expected) in table
        .observations()
        .iter()
        .zip(table.predictions().unwrap_or_default())
        .take(10)
    {
        println!(
            "{:>5} {:>6} {:>6.3} {:>2} {:>9}",
            obs.id,
            obs.group,
            obs.x,
            obs.response,
            expected.map_or_else(|| "-".to_string(), |value| format!("{value:.3}"))
        );
    }
}
