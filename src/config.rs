//! Construction-time network configuration.

use crate::error::{NetworkError, Result};
use crate::transfer::TransferFunction;

/// The largest supported number of layers: one input layer followed by up
/// to three hidden/output layers.
pub const MAX_LAYERS: usize = 4;

fn default_learning_rate() -> f64 {
    0.1
}

/// Topology and learning parameters of a `Network`.
///
/// The first entry of `transfer_functions` belongs to the input layer and
/// is ignored; input neurons always use the identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub layer_sizes: Vec<usize>,
    pub transfer_functions: Vec<TransferFunction>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

impl NetworkConfig {
    /// Creates a configuration with the given number of neurons per layer.
    ///
    /// Defaults:
    ///
    /// * Tanh on every layer after the input layer.
    /// * A learning rate of 0.1.
    pub fn new(layer_sizes: &[usize]) -> Self {
        let transfer_functions = (0..layer_sizes.len())
            .map(|layer| {
                if layer == 0 {
                    TransferFunction::Identity
                } else {
                    TransferFunction::Tanh
                }
            })
            .collect();
        NetworkConfig {
            layer_sizes: layer_sizes.into(),
            transfer_functions,
            learning_rate: default_learning_rate(),
        }
    }

    /// Sets the transfer function of each layer.
    pub fn transfer_functions(mut self, functions: &[TransferFunction]) -> Self {
        self.transfer_functions = functions.into();
        self
    }

    /// Sets the learning rate used by every weight update.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn input_len(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    pub fn output_len(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Verifies the topology and learning rate, returning an error if
    /// something is wrong.
    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.is_empty() {
            return Err(NetworkError::InvalidTopology(
                "at least one layer is required".into(),
            ));
        }
        if self.layer_sizes.len() > MAX_LAYERS {
            return Err(NetworkError::InvalidTopology(format!(
                "{} layers requested, at most {} are supported",
                self.layer_sizes.len(),
                MAX_LAYERS
            )));
        }
        if let Some(layer) = self.layer_sizes.iter().position(|&size| size == 0) {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {} has no neurons",
                layer
            )));
        }
        if self.transfer_functions.len() != self.layer_sizes.len() {
            return Err(NetworkError::InvalidTopology(format!(
                "{} transfer functions given for {} layers",
                self.transfer_functions.len(),
                self.layer_sizes.len()
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(NetworkError::InvalidLearningRate(self.learning_rate));
        }
        Ok(())
    }
}
