//! A fully connected [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) trained with
//! online backpropagation.
//!
//! # Example
//!
//! Let's fit a single pattern with a small network:
//!
//! ```
//! # use perceptron::{Network, NetworkConfig, TransferFunction};
//! let config = NetworkConfig::new(&[1, 3, 1])
//!     .transfer_functions(&[
//!         TransferFunction::Identity,
//!         TransferFunction::Tanh,
//!         TransferFunction::Identity,
//!     ])
//!     .learning_rate(0.05);
//! let mut network = Network::seeded(&config, 42).unwrap();
//!
//! let patterns = vec![(vec![0.5], vec![0.25]); 200];
//! network.train(&patterns).unwrap();
//!
//! let trace = network.error_trace();
//! assert_eq!(trace.len(), 200);
//! assert!(trace[199] <= trace[0]);
//! ```

use itertools::Itertools;
use log::{debug, info, warn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result, VectorKind};
use crate::graph::Graph;
use crate::neuron::{Neuron, NeuronId, NeuronInput, NeuronKind};
use crate::synapse::RawInputId;
use crate::transfer::TransferFunction;

/// Bounds of the uniform distribution initial weights are drawn from.
const INITIAL_WEIGHT: f64 = 2.0;

/// A feedforward network of neurons connected by synapses.
///
/// The topology is fixed at construction; only synapse weights change
/// afterwards.
#[derive(Clone, Debug)]
pub struct Network {
    graph: Graph,
    /// Neuron ids per layer, input layer first.
    layers: Vec<Vec<NeuronId>>,
    input_cells: Vec<RawInputId>,
    transfer_functions: Vec<TransferFunction>,
    learning_rate: f64,
    error_trace: Vec<f64>,
}

impl Network {
    /// Creates a new, untrained network with weights drawn uniformly from
    /// `[-2, 2]` using `rng`.
    pub fn new<R>(config: &NetworkConfig, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let range = Uniform::new_inclusive(-INITIAL_WEIGHT, INITIAL_WEIGHT);
        Network::with_weights(config, |_, _, _| range.sample(&mut *rng))
    }

    /// Creates a new, untrained network from a seeded generator, so the
    /// same seed always yields the same weights.
    pub fn seeded(config: &NetworkConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Network::new(config, &mut rng)
    }

    /// Creates a network whose initial weights come from `weight`.
    ///
    /// `weight(layer, neuron, source)` is called once per synapse, where
    /// `layer` is the index of the layer the synapse feeds, `neuron` the
    /// index of its target within that layer and `source` the index of the
    /// source neuron within the preceding layer.
    pub fn with_weights<F>(config: &NetworkConfig, mut weight: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        config.validate()?;
        info!(
            "Initializing {} layer network {:?}",
            config.layer_sizes.len(),
            config.layer_sizes
        );

        let mut graph = Graph::new();
        let mut input_cells = Vec::with_capacity(config.input_len());
        let mut input_layer = Vec::with_capacity(config.input_len());
        for _ in 0..config.input_len() {
            let cell = graph.add_raw_input();
            let neuron = graph.add_neuron(NeuronKind::Input, TransferFunction::Identity);
            graph.add_input(neuron, NeuronInput::Raw(cell))?;
            input_cells.push(cell);
            input_layer.push(neuron);
        }

        let layer_count = config.layer_sizes.len();
        let mut layers = Vec::with_capacity(layer_count);
        layers.push(input_layer);
        for layer in 1..layer_count {
            let kind = if layer == layer_count - 1 {
                NeuronKind::Output
            } else {
                NeuronKind::Hidden
            };
            let transfer = config.transfer_functions[layer];
            let mut neurons = Vec::with_capacity(config.layer_sizes[layer]);
            for index in 0..config.layer_sizes[layer] {
                let neuron = graph.add_neuron(kind, transfer);
                for (source_index, &source) in layers[layer - 1].iter().enumerate() {
                    graph.connect(source, neuron, weight(layer, index, source_index))?;
                }
                neurons.push(neuron);
            }
            layers.push(neurons);
        }

        let mut transfer_functions = config.transfer_functions.clone();
        transfer_functions[0] = TransferFunction::Identity;
        Ok(Network {
            graph,
            layers,
            input_cells,
            transfer_functions,
            learning_rate: config.learning_rate,
            error_trace: Vec::new(),
        })
    }

    /// Returns the size of the input layer.
    pub fn input_len(&self) -> usize {
        self.input_cells.len()
    }

    /// Returns the size of the output layer.
    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, Vec::len)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Vec::len).collect()
    }

    /// Transfer function per layer, as used; the input layer's is always
    /// the identity.
    pub fn transfer_functions(&self) -> &[TransferFunction] {
        &self.transfer_functions
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// The current synapse weights, ordered by target layer, then target
    /// neuron, then source neuron.
    pub fn weights(&self) -> Vec<f64> {
        self.graph.synapses().iter().map(|s| s.weight()).collect()
    }

    /// Read access to one neuron's cached state.
    pub fn neuron(&self, layer: usize, index: usize) -> Option<&Neuron> {
        self.layers
            .get(layer)
            .and_then(|neurons| neurons.get(index))
            .map(|&id| self.graph.neuron(id))
    }

    /// Squared error of every pattern consumed by the last `train` call,
    /// in training order.
    pub fn error_trace(&self) -> &[f64] {
        &self.error_trace
    }

    /// Returns true if the last `train` call recorded a NaN or infinite
    /// error, meaning the weights are no longer usable.
    pub fn has_non_finite_error(&self) -> bool {
        self.error_trace.iter().any(|e| !e.is_finite())
    }

    /// Feeds `inputs` through the network, returning the output layer.
    pub fn calculate_outputs(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_len(VectorKind::Input, self.input_len(), inputs.len())?;
        Ok(self.feed_forward(inputs))
    }

    /// Returns the summed squared difference between the network's output
    /// for `inputs` and `targets`.
    pub fn get_error(&mut self, inputs: &[f64], targets: &[f64]) -> Result<f64> {
        self.check_pattern(inputs, targets)?;
        let outputs = self.feed_forward(inputs);
        Ok(squared_error(&outputs, targets))
    }

    /// Performs one online training step on a single pattern.
    ///
    /// Deltas are computed for every layer, output layer first, before any
    /// weight changes; the staged updates are then applied in a second
    /// pass. If the delta pass fails, nothing is applied.
    pub fn backprop(&mut self, inputs: &[f64], targets: &[f64]) -> Result<()> {
        self.check_pattern(inputs, targets)?;
        self.feed_forward(inputs);
        if let Err(err) = self.compute_deltas(targets) {
            self.graph.discard_pending_updates();
            return Err(err);
        }
        self.apply_updates()
    }

    /// Trains on each pattern once, in the given order, recording the
    /// post-update squared error of every pattern in the error trace.
    ///
    /// All patterns are checked against the layer sizes before training
    /// starts.
    pub fn train<I, O>(&mut self, patterns: &[(I, O)]) -> Result<()>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        for (input, target) in patterns {
            self.check_pattern(input.as_ref(), target.as_ref())?;
        }
        debug!("Training on {} patterns", patterns.len());

        self.error_trace.clear();
        self.error_trace.reserve(patterns.len());
        let mut poisoned = false;
        for (index, (input, target)) in patterns.iter().enumerate() {
            self.backprop(input.as_ref(), target.as_ref())?;
            let error = self.get_error(input.as_ref(), target.as_ref())?;
            if !error.is_finite() && !poisoned {
                warn!("Pattern {} produced a non-finite error ({})", index, error);
                poisoned = true;
            }
            self.error_trace.push(error);
        }
        Ok(())
    }

    /// Pushes `inputs` into the raw input cells and pulls every output
    /// neuron. Lengths must already be checked.
    fn feed_forward(&mut self, inputs: &[f64]) -> Vec<f64> {
        for (&cell, &value) in self.input_cells.iter().zip_eq(inputs) {
            self.graph.set_raw_input(cell, value);
        }
        let graph = &mut self.graph;
        match self.layers.last() {
            Some(outputs) => outputs.iter().map(|&id| graph.calculate_output(id)).collect(),
            None => Vec::new(),
        }
    }

    fn compute_deltas(&mut self, targets: &[f64]) -> Result<()> {
        let output_layer = self.layers.len() - 1;
        for layer in (1..self.layers.len()).rev() {
            for (index, &neuron) in self.layers[layer].iter().enumerate() {
                let target = if layer == output_layer {
                    targets.get(index).copied()
                } else {
                    None
                };
                self.graph.backprop(neuron, target, self.learning_rate)?;
            }
        }
        Ok(())
    }

    fn apply_updates(&mut self) -> Result<()> {
        for layer in (1..self.layers.len()).rev() {
            for &neuron in &self.layers[layer] {
                self.graph.apply_synapse_weight_updates(neuron)?;
            }
        }
        Ok(())
    }

    fn check_pattern(&self, inputs: &[f64], targets: &[f64]) -> Result<()> {
        check_len(VectorKind::Input, self.input_len(), inputs.len())?;
        check_len(VectorKind::Target, self.output_len(), targets.len())
    }
}

fn check_len(kind: VectorKind, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(NetworkError::DimensionMismatch {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Computes the summed squared error between `actual` and `expected`.
fn squared_error(actual: &[f64], expected: &[f64]) -> f64 {
    actual
        .iter()
        .zip_eq(expected)
        .map(|(a, e)| (e - a) * (e - a))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::Phase;
    use approx::assert_abs_diff_eq;

    use crate::transfer::TransferFunction::{Identity, Tanh};

    fn fixed(sizes: &[usize], functions: &[TransferFunction], weights: &[f64]) -> Network {
        let config = NetworkConfig::new(sizes).transfer_functions(functions);
        let mut weights = weights.iter().copied();
        Network::with_weights(&config, |_, _, _| weights.next().unwrap()).unwrap()
    }

    #[test]
    fn single_synapse_scenario() {
        let mut network = fixed(&[1, 1], &[Identity, Identity], &[2.0]);
        assert_eq!(network.calculate_outputs(&[3.0]).unwrap(), vec![6.0]);
        assert_eq!(network.get_error(&[3.0], &[6.0]).unwrap(), 0.0);
        assert_eq!(network.get_error(&[3.0], &[5.0]).unwrap(), 1.0);
    }

    #[test]
    fn zero_hidden_weight_scenario() {
        let mut network = fixed(&[1, 1, 1], &[Identity, Tanh, Identity], &[0.0, 1.0]);
        for &x in &[-100.0, -1.0, 0.0, 0.3, 7.5] {
            assert_eq!(network.calculate_outputs(&[x]).unwrap(), vec![0.0]);
        }
    }

    #[test]
    fn input_transfer_function_is_ignored() {
        let mut network = fixed(&[1, 1], &[Tanh, Identity], &[1.0]);
        assert_eq!(network.transfer_functions(), &[Identity, Identity]);
        assert_eq!(network.calculate_outputs(&[3.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn builds_fully_connected_layers() {
        let config = NetworkConfig::new(&[2, 3, 4, 2]);
        let mut sites = Vec::new();
        let network = Network::with_weights(&config, |layer, neuron, source| {
            sites.push((layer, neuron, source));
            0.0
        })
        .unwrap();
        assert_eq!(network.layer_sizes(), vec![2, 3, 4, 2]);
        assert_eq!(network.weights().len(), 2 * 3 + 3 * 4 + 4 * 2);
        assert_eq!(sites[0], (1, 0, 0));
        assert_eq!(sites[1], (1, 0, 1));
        assert_eq!(sites[2], (1, 1, 0));
        assert_eq!(sites[sites.len() - 1], (3, 1, 3));
        assert_eq!(network.neuron(0, 0).unwrap().kind(), NeuronKind::Input);
        assert_eq!(network.neuron(2, 3).unwrap().kind(), NeuronKind::Hidden);
        assert_eq!(network.neuron(3, 1).unwrap().kind(), NeuronKind::Output);
        assert!(network.neuron(3, 2).is_none());
        assert!(network.neuron(4, 0).is_none());
    }

    #[test]
    fn rejects_invalid_topologies() {
        let too_deep = NetworkConfig::new(&[1, 1, 1, 1, 1]);
        assert!(matches!(
            Network::seeded(&too_deep, 0),
            Err(NetworkError::InvalidTopology(_))
        ));
        let mismatched = NetworkConfig::new(&[1, 1]).transfer_functions(&[Identity]);
        assert!(Network::seeded(&mismatched, 0).is_err());
    }

    #[test]
    fn single_layer_passes_inputs_through() {
        let mut network = Network::seeded(&NetworkConfig::new(&[3]), 1).unwrap();
        let inputs = [0.5, -1.0, 2.0];
        assert_eq!(network.calculate_outputs(&inputs).unwrap(), inputs.to_vec());
        network.train(&[(inputs, [0.0, 0.0, 0.0])]).unwrap();
        assert!(network.weights().is_empty());
        assert_abs_diff_eq!(network.error_trace()[0], 5.25, epsilon = 1e-12);
    }

    #[test]
    fn seeded_weights_are_reproducible_and_bounded() {
        let config = NetworkConfig::new(&[2, 5, 5, 2]);
        let a = Network::seeded(&config, 7).unwrap();
        let b = Network::seeded(&config, 7).unwrap();
        let c = Network::seeded(&config, 8).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_ne!(a.weights(), c.weights());
        assert!(a.weights().iter().all(|w| (-2.0..=2.0).contains(w)));
    }

    #[test]
    fn dimension_mismatches() {
        let mut network = Network::seeded(&NetworkConfig::new(&[2, 3, 1]), 3).unwrap();
        assert_eq!(
            network.calculate_outputs(&[1.0]),
            Err(NetworkError::DimensionMismatch {
                kind: VectorKind::Input,
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(
            network.get_error(&[1.0, 2.0], &[1.0, 2.0]),
            Err(NetworkError::DimensionMismatch {
                kind: VectorKind::Target,
                expected: 1,
                actual: 2,
            })
        );
        let before = network.weights();
        assert!(network.backprop(&[1.0, 2.0, 3.0], &[0.0]).is_err());
        assert_eq!(network.weights(), before);
    }

    #[test]
    fn train_checks_every_pattern_first() {
        let mut network = Network::seeded(&NetworkConfig::new(&[1, 2, 1]), 5).unwrap();
        let before = network.weights();
        let patterns = vec![(vec![0.1], vec![0.2]), (vec![0.1], vec![0.2, 0.3])];
        assert!(network.train(&patterns).is_err());
        assert_eq!(network.weights(), before);
        assert!(network.error_trace().is_empty());
    }

    #[test]
    fn deltas_use_weights_from_before_the_step() {
        let (w1, w2, lr) = (0.8, -1.5, 0.25);
        let config = NetworkConfig::new(&[1, 1, 1])
            .transfer_functions(&[Identity, Tanh, Tanh])
            .learning_rate(lr);
        let mut weights = vec![w1, w2].into_iter();
        let mut network =
            Network::with_weights(&config, |_, _, _| weights.next().unwrap()).unwrap();
        let (x, y) = (0.6, 0.9);

        network.backprop(&[x], &[y]).unwrap();

        let h = (w1 * x).tanh();
        let o = (w2 * h).tanh();
        let output_delta = (y - o) * (1.0 - o * o);
        let hidden_delta = (1.0 - h * h) * output_delta * w2;
        let output = network.neuron(2, 0).unwrap();
        assert_abs_diff_eq!(output.delta(), output_delta, epsilon = 1e-12);
        let hidden = network.neuron(1, 0).unwrap();
        assert_abs_diff_eq!(hidden.delta(), hidden_delta, epsilon = 1e-12);
        let after = network.weights();
        assert_abs_diff_eq!(after[0], w1 + lr * hidden_delta * x, epsilon = 1e-12);
        assert_abs_diff_eq!(after[1], w2 + lr * output_delta * h, epsilon = 1e-12);
    }

    #[test]
    fn every_neuron_finishes_the_step() {
        let mut network = Network::seeded(&NetworkConfig::new(&[2, 3, 2]), 11).unwrap();
        network.backprop(&[0.1, 0.2], &[0.3, 0.4]).unwrap();
        for layer in 1..3 {
            for index in 0..network.layer_sizes()[layer] {
                let neuron = network.neuron(layer, index).unwrap();
                assert_eq!(neuron.phase(), Phase::WeightsApplied);
            }
        }
        for index in 0..2 {
            let input = network.neuron(0, index).unwrap();
            assert_eq!(input.phase(), Phase::OutputComputed);
        }
        network.calculate_outputs(&[0.1, 0.2]).unwrap();
        assert_eq!(network.neuron(2, 1).unwrap().phase(), Phase::OutputComputed);
    }

    #[test]
    fn repeated_steps_reduce_error() {
        let config = NetworkConfig::new(&[1, 1, 1])
            .transfer_functions(&[Identity, Tanh, Identity])
            .learning_rate(0.1);
        let mut network = Network::with_weights(&config, |_, _, _| 0.5).unwrap();
        let mut previous = network.get_error(&[0.5], &[0.5]).unwrap();
        for _ in 0..200 {
            network.backprop(&[0.5], &[0.5]).unwrap();
            let error = network.get_error(&[0.5], &[0.5]).unwrap();
            assert!(error < previous, "{} did not improve on {}", error, previous);
            previous = error;
        }
        assert!(previous < 1e-4);
    }

    #[test]
    fn seeded_steps_descend_on_the_identity() {
        let config = NetworkConfig::new(&[1, 1, 1])
            .transfer_functions(&[Identity, Tanh, Identity])
            .learning_rate(0.05);
        for seed in 0..8 {
            for &x in &[-0.9, -0.4, 0.3, 0.8] {
                let mut network = Network::seeded(&config, seed).unwrap();
                let initial = network.get_error(&[x], &[x]).unwrap();
                let mut previous = initial;
                for _ in 0..100 {
                    network.backprop(&[x], &[x]).unwrap();
                    let error = network.get_error(&[x], &[x]).unwrap();
                    if previous > 1e-12 {
                        assert!(
                            error < previous,
                            "seed {}, x = {}: {} did not improve on {}",
                            seed,
                            x,
                            error,
                            previous
                        );
                    }
                    previous = error;
                }
                assert!(previous <= initial, "seed {}, x = {}", seed, x);
            }
        }
    }

    #[test]
    fn train_records_one_error_per_pattern() {
        let mut network = Network::seeded(&NetworkConfig::new(&[2, 2, 1]), 9).unwrap();
        let patterns = [
            ([0.0, 0.0], [0.0]),
            ([0.0, 1.0], [1.0]),
            ([1.0, 0.0], [1.0]),
        ];
        network.train(&patterns).unwrap();
        assert_eq!(network.error_trace().len(), 3);

        let mut replay = network.clone();
        let last = replay.get_error(&[1.0, 0.0], &[1.0]).unwrap();
        assert_eq!(network.error_trace()[2], last);

        network.train(&patterns[..1]).unwrap();
        assert_eq!(network.error_trace().len(), 1);
        assert!(!network.has_non_finite_error());
    }

    #[test]
    fn non_finite_errors_are_flagged() {
        let mut network = fixed(&[1, 1], &[Identity, Identity], &[1.0]);
        network.train(&[([f64::INFINITY], [0.0])]).unwrap();
        assert!(network.has_non_finite_error());
    }
}
