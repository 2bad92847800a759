use std::f64::consts::PI;

use log::info;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use perceptron::trainer::{Logging, StopCondition, Trainer};
use perceptron::{Network, NetworkConfig, TransferFunction};

type Pattern = (Vec<f64>, Vec<f64>);

/// Samples `x` uniformly from `[-pi, pi]` with target `0.8 * sin(x)`.
fn generate_data(rng: &mut StdRng, num_samples: usize) -> Vec<Pattern> {
    let range = Uniform::new_inclusive(-PI, PI);
    (0..num_samples)
        .map(|_| {
            let x = range.sample(&mut *rng);
            (vec![x], vec![0.8 * x.sin()])
        })
        .collect()
}

fn score(
    set_name: &str,
    network: &mut Network,
    test_data: &[Pattern],
) -> perceptron::Result<()> {
    let mut total = 0.0;
    for (input, expected) in test_data {
        total += network.get_error(input, expected)?;
    }
    println!(
        "{} set: mean squared error {:.6} over {} patterns",
        set_name,
        total / test_data.len() as f64,
        test_data.len()
    );
    Ok(())
}

fn main() -> perceptron::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let mut rng = StdRng::seed_from_u64(2017);
    let training_data = generate_data(&mut rng, 150);

    let config = NetworkConfig::new(&[1, 10, 10, 1])
        .transfer_functions(&[
            TransferFunction::Identity,
            TransferFunction::Tanh,
            TransferFunction::Tanh,
            TransferFunction::Tanh,
        ])
        .learning_rate(0.01);
    let network = Network::new(&config, &mut rng)?;

    let (mut network, report) = Trainer::new(network)
        .stop_condition(StopCondition::Epochs(400))
        .logging(Logging::Epochs(50))
        .train(&training_data)?;
    info!(
        "Recorded {} per-pattern errors; non-finite: {}",
        report.error_trace.len(),
        network.has_non_finite_error()
    );

    println!();
    score("Training", &mut network, &training_data)?;
    score("Test", &mut network, &generate_data(&mut rng, 1_000))?;
    Ok(())
}
