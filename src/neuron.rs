//! Neurons and their per-step state.

use std::fmt;

use crate::error::{NetworkError, Result};
use crate::synapse::{RawInputId, SynapseId};
use crate::transfer::TransferFunction;

/// Stable index of a neuron inside a `Graph`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NeuronId(pub(crate) usize);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The role a neuron plays in the network.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeuronKind {
    /// Reads exactly one raw input cell through the identity function.
    Input,
    /// Fed by synapses; its delta is propagated back from the next layer.
    Hidden,
    /// Fed by synapses; its delta is taken against a target value.
    Output,
}

/// A single summand of a neuron's net input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeuronInput {
    Raw(RawInputId),
    Synapse(SynapseId),
}

impl NeuronInput {
    fn describe(&self) -> &'static str {
        match self {
            NeuronInput::Raw(_) => "raw",
            NeuronInput::Synapse(_) => "synapse",
        }
    }
}

/// Where a neuron stands within one training step.
///
/// Every step moves each hidden and output neuron through these phases in
/// order; a new forward pass starts the next step. Input neurons have no
/// incoming synapses and stay at `OutputComputed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    OutputComputed,
    DeltaComputed,
    WeightsApplied,
}

#[derive(Clone, Debug)]
pub struct Neuron {
    kind: NeuronKind,
    transfer: TransferFunction,
    inputs: Vec<NeuronInput>,
    outgoing: Vec<SynapseId>,
    net: f64,
    output: f64,
    delta: f64,
    phase: Phase,
}

impl Neuron {
    /// Creates an unconnected neuron. Input neurons ignore `transfer` and
    /// use the identity.
    pub fn new(kind: NeuronKind, transfer: TransferFunction) -> Self {
        let transfer = match kind {
            NeuronKind::Input => TransferFunction::Identity,
            _ => transfer,
        };
        Neuron {
            kind,
            transfer,
            inputs: Vec::new(),
            outgoing: Vec::new(),
            net: 0.0,
            output: 0.0,
            delta: 0.0,
            phase: Phase::Uninitialized,
        }
    }

    pub fn kind(&self) -> NeuronKind {
        self.kind
    }

    pub fn transfer(&self) -> TransferFunction {
        self.transfer
    }

    pub fn inputs(&self) -> &[NeuronInput] {
        &self.inputs
    }

    /// Synapses leading out of this neuron into the next layer.
    pub fn outgoing(&self) -> &[SynapseId] {
        &self.outgoing
    }

    /// The summed input of the last forward pass.
    pub fn net(&self) -> f64 {
        self.net
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Appends an input, rejecting kinds this neuron cannot be fed by.
    ///
    /// Input neurons take a single raw cell; hidden and output neurons take
    /// any number of synapses.
    pub(crate) fn add_input(&mut self, id: NeuronId, input: NeuronInput) -> Result<()> {
        let accepted = match (self.kind, input) {
            (NeuronKind::Input, NeuronInput::Raw(_)) => self.inputs.is_empty(),
            (NeuronKind::Input, NeuronInput::Synapse(_)) => false,
            (_, NeuronInput::Raw(_)) => false,
            (_, NeuronInput::Synapse(_)) => true,
        };
        if !accepted {
            return Err(NetworkError::IncompatibleInput {
                neuron: id,
                input: input.describe(),
            });
        }
        self.inputs.push(input);
        Ok(())
    }

    pub(crate) fn add_outgoing(&mut self, synapse: SynapseId) {
        self.outgoing.push(synapse);
    }

    /// Caches `net` and its activation, returning the output.
    pub(crate) fn activate(&mut self, net: f64) -> f64 {
        self.net = net;
        self.output = self.transfer.evaluate(net);
        self.phase = Phase::OutputComputed;
        self.output
    }

    pub(crate) fn record_delta(&mut self, delta: f64) {
        self.delta = delta;
        self.phase = Phase::DeltaComputed;
    }

    pub(crate) fn mark_applied(&mut self) {
        self.phase = Phase::WeightsApplied;
    }

    pub(crate) fn expect_phase(
        &self,
        id: NeuronId,
        phase: Phase,
        operation: &'static str,
    ) -> Result<()> {
        if self.phase != phase {
            return Err(NetworkError::OutOfPhase {
                neuron: id,
                phase: self.phase,
                operation,
            });
        }
        Ok(())
    }
}
