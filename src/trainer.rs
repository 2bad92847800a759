//! Utilities for training networks over several epochs.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::Result;
use crate::network::Network;

/// Makes a model trainable one epoch at a time.
pub trait Trainable {
    /// Trains on every `(input, target)` pattern once, in order, and
    /// returns the squared error recorded for each pattern.
    fn train_epoch<I, O>(&mut self, patterns: &[(I, O)]) -> Result<&[f64]>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>;
}

impl Trainable for Network {
    fn train_epoch<I, O>(&mut self, patterns: &[(I, O)]) -> Result<&[f64]>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        self.train(patterns)?;
        Ok(self.error_trace())
    }
}

/// A builder for training a model repeatedly on the same patterns.
///
/// Each epoch is one `Trainable::train_epoch` pass over the patterns in the
/// order given; reordering them between epochs is up to the caller.
#[derive(Debug)]
pub struct Trainer<T: Trainable> {
    model: T,
    logging: Logging,
    stop_condition: StopCondition,
}

impl<T: Trainable> Trainer<T> {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * Stops after 1000 epochs.
    /// * Logs on training completion.
    pub fn new(model: T) -> Self {
        Trainer {
            model,
            logging: Logging::Completion,
            stop_condition: StopCondition::Epochs(1000),
        }
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// Trains the model using the provided labelled data.
    ///
    /// The provided `patterns` should be a list of labelled data, where each
    /// element takes the form `(network input, expected output)`.
    ///
    /// Training also stops early once an epoch's error is no longer finite.
    ///
    /// Returns:
    ///   The trained model with a report of every epoch, or an error if
    ///   the patterns do not fit the model.
    pub fn train<I, O>(mut self, patterns: &[(I, O)]) -> Result<(T, TrainingReport)>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        let start_time = Instant::now();
        let mut report = TrainingReport::default();
        loop {
            let trace = self.model.train_epoch(patterns)?;
            let training_error = mean(trace);
            report.error_trace.extend_from_slice(trace);
            report.epoch_errors.push(training_error);
            report.epochs += 1;

            self.logging.epoch(report.epochs, training_error);
            if !training_error.is_finite() {
                warn!(
                    "Stopping after epoch {}: error is {}",
                    report.epochs, training_error
                );
                break;
            }
            if self
                .stop_condition
                .should_stop(report.epochs, training_error, start_time)
            {
                break;
            }
        }
        report.elapsed = start_time.elapsed();
        self.logging.completion(&report);
        Ok((self.model, report))
    }
}

/// What happened during a `Trainer` run.
#[derive(Clone, Debug, Default)]
pub struct TrainingReport {
    /// The number of completed epochs.
    pub epochs: usize,
    /// Mean squared error of each epoch.
    pub epoch_errors: Vec<f64>,
    /// Squared error of every pattern of every epoch, in training order.
    pub error_trace: Vec<f64>,
    pub elapsed: Duration,
}

impl TrainingReport {
    /// Mean squared error of the last epoch.
    pub fn final_error(&self) -> Option<f64> {
        self.epoch_errors.last().copied()
    }
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` epochs
    Epochs(usize),
}

impl Logging {
    /// Performs logging at the current `epoch` of training.
    fn epoch(&self, epoch: usize, training_error: f64) {
        if let Logging::Epochs(freq) = *self {
            if freq > 0 && epoch % freq == 0 {
                info!("Epoch {}:\tMSE={}", epoch, training_error);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, report: &TrainingReport) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            "Ran {} epochs in {:.3} seconds.",
            report.epochs,
            report.elapsed.as_secs_f64()
        );
        if let Some(error) = report.final_error() {
            info!("Final MSE: {}", error);
        }
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug)]
pub enum StopCondition {
    /// Stops after the provided number of epochs
    Epochs(usize),
    /// Stops when an epoch's mean error drops below the provided threshold
    ErrorThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(&self, epoch: usize, training_error: f64, start_time: Instant) -> bool {
        match *self {
            StopCondition::Epochs(epochs) => epoch >= epochs,
            StopCondition::ErrorThreshold(threshold) => training_error < threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}

/// Mean of the per-pattern errors; zero for an empty pass.
fn mean(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().sum::<f64>() / errors.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::error::NetworkError;
    use crate::transfer::TransferFunction;

    fn sine_patterns() -> Vec<(Vec<f64>, Vec<f64>)> {
        (0..20)
            .map(|i| {
                let x = -std::f64::consts::PI + i as f64 * 2.0 * std::f64::consts::PI / 19.0;
                (vec![x], vec![0.8 * x.sin()])
            })
            .collect()
    }

    fn network() -> Network {
        let config = NetworkConfig::new(&[1, 4, 1]).learning_rate(0.05);
        Network::with_weights(&config, |layer, neuron, source| {
            (1.0 + layer as f64 * 1.3 + neuron as f64 * 0.7 + source as f64 * 0.4).sin()
        })
        .unwrap()
    }

    #[test]
    fn runs_requested_epochs() {
        let patterns = sine_patterns();
        let (network, report) = Trainer::new(network())
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Epochs(200))
            .train(&patterns)
            .unwrap();
        assert_eq!(report.epochs, 200);
        assert_eq!(report.epoch_errors.len(), 200);
        assert_eq!(report.error_trace.len(), 200 * patterns.len());
        assert_eq!(network.error_trace(), &report.error_trace[199 * 20..]);

        let first = report.epoch_errors[0];
        let last = report.final_error().unwrap();
        assert!(last < first / 4.0, "{} -> {}", first, last);
    }

    #[test]
    fn stops_at_error_threshold() {
        let (_, report) = Trainer::new(network())
            .logging(Logging::Silent)
            .stop_condition(StopCondition::ErrorThreshold(1.0))
            .train(&sine_patterns())
            .unwrap();
        assert_eq!(report.epochs, 1);
    }

    #[test]
    fn stops_after_duration() {
        let (_, report) = Trainer::new(network())
            .logging(Logging::Silent)
            .stop_condition(Duration::from_millis(0))
            .train(&sine_patterns())
            .unwrap();
        assert!(report.epochs >= 1);
    }

    #[test]
    fn stops_when_poisoned() {
        let config = NetworkConfig::new(&[1, 1])
            .transfer_functions(&[TransferFunction::Identity, TransferFunction::Identity]);
        let network = Network::with_weights(&config, |_, _, _| 1.0).unwrap();
        let (network, report) = Trainer::new(network)
            .logging(Logging::Silent)
            .stop_condition(StopCondition::ErrorThreshold(0.0))
            .train(&[([f64::INFINITY], [0.0])])
            .unwrap();
        assert_eq!(report.epochs, 1);
        assert!(network.has_non_finite_error());
    }

    #[test]
    fn rejects_mismatched_patterns() {
        let result = Trainer::new(network())
            .logging(Logging::Silent)
            .train(&[(vec![0.0, 1.0], vec![0.0])]);
        assert!(matches!(result, Err(NetworkError::DimensionMismatch { .. })));
    }

    #[test]
    fn empty_pattern_list() {
        let patterns: Vec<(Vec<f64>, Vec<f64>)> = Vec::new();
        let (_, report) = Trainer::new(network())
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Epochs(3))
            .train(&patterns)
            .unwrap();
        assert_eq!(report.epoch_errors, vec![0.0; 3]);
        assert!(report.error_trace.is_empty());
    }

    /// Pretends to halve its error on every epoch.
    #[derive(Debug)]
    struct Halving {
        errors: Vec<f64>,
    }

    impl Trainable for Halving {
        fn train_epoch<I, O>(&mut self, patterns: &[(I, O)]) -> Result<&[f64]>
        where
            I: AsRef<[f64]>,
            O: AsRef<[f64]>,
        {
            let error = self.errors.last().map_or(1.0, |e| e / 2.0);
            self.errors = vec![error; patterns.len()];
            Ok(&self.errors)
        }
    }

    #[test]
    fn drives_any_trainable_model() {
        let (model, report) = Trainer::new(Halving { errors: Vec::new() })
            .logging(Logging::Silent)
            .stop_condition(StopCondition::ErrorThreshold(0.1))
            .train(&[([0.0], [0.0]), ([1.0], [1.0])])
            .unwrap();
        assert_eq!(report.epoch_errors, vec![1.0, 0.5, 0.25, 0.125, 0.0625]);
        assert_eq!(report.error_trace.len(), 10);
        assert_eq!(model.errors, vec![0.0625; 2]);
    }

    #[test]
    fn network_epoch_returns_its_trace() {
        let mut network = network();
        let patterns = sine_patterns();
        let trace = network.train_epoch(&patterns).unwrap().to_vec();
        assert_eq!(trace.len(), patterns.len());
        assert_eq!(network.error_trace(), &trace[..]);
    }
}
