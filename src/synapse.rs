//! Raw input cells and weighted synapses.

use std::fmt;

use crate::error::{NetworkError, Result};
use crate::neuron::NeuronId;

/// Stable index of a raw input cell inside a `Graph`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawInputId(pub(crate) usize);

/// Stable index of a synapse inside a `Graph`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SynapseId(pub(crate) usize);

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One externally set feature of the current pattern.
#[derive(Copy, Clone, Debug, Default)]
pub struct RawInput {
    value: f64,
}

impl RawInput {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}

/// A directed, weighted edge from a source neuron to its output neuron.
///
/// The weight only changes through `stage_update` followed by
/// `apply_update`, so every delta of a training step is computed against
/// the same weights.
#[derive(Clone, Debug)]
pub struct Synapse {
    source: NeuronId,
    target: Option<NeuronId>,
    weight: f64,
    pending: f64,
}

impl Synapse {
    pub fn new(source: NeuronId, weight: f64) -> Self {
        Synapse {
            source,
            target: None,
            weight,
            pending: 0.0,
        }
    }

    pub fn source(&self) -> NeuronId {
        self.source
    }

    /// The downstream neuron, once bound.
    pub fn output_neuron(&self) -> Option<NeuronId> {
        self.target
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// The weight delta staged by the last delta phase, not yet applied.
    pub fn pending(&self) -> f64 {
        self.pending
    }

    /// Binds the downstream neuron. A synapse is bound exactly once.
    pub(crate) fn set_output_neuron(
        &mut self,
        id: SynapseId,
        target: NeuronId,
    ) -> Result<()> {
        if self.target.is_some() {
            return Err(NetworkError::SynapseAlreadyBound(id));
        }
        self.target = Some(target);
        Ok(())
    }

    pub(crate) fn stage_update(&mut self, delta: f64) {
        self.pending = delta;
    }

    pub(crate) fn apply_update(&mut self) {
        self.weight += self.pending;
        self.pending = 0.0;
    }

    pub(crate) fn discard_update(&mut self) {
        self.pending = 0.0;
    }
}
