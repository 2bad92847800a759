//! Error types for network construction, inference and training.

use std::fmt;

use thiserror::Error;

use crate::neuron::{NeuronId, Phase};
use crate::synapse::SynapseId;

/// Which vector of a pattern failed a dimension check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VectorKind {
    /// The values pushed into the input layer.
    Input,
    /// The teaching values compared against the output layer.
    Target,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VectorKind::Input => write!(f, "input"),
            VectorKind::Target => write!(f, "target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("learning rate must be finite and positive, got {0}")]
    InvalidLearningRate(f64),

    #[error("{kind} vector has {actual} values, expected {expected}")]
    DimensionMismatch {
        kind: VectorKind,
        expected: usize,
        actual: usize,
    },

    #[error("neuron {neuron} cannot accept a {input} input")]
    IncompatibleInput {
        neuron: NeuronId,
        input: &'static str,
    },

    #[error("output neuron {0} needs a target value")]
    MissingTarget(NeuronId),

    #[error("neuron {neuron} is {phase:?}, cannot {operation}")]
    OutOfPhase {
        neuron: NeuronId,
        phase: Phase,
        operation: &'static str,
    },

    #[error("synapse {0} already has an output neuron")]
    SynapseAlreadyBound(SynapseId),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
