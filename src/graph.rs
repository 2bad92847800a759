//! Arena holding the computation graph.
//!
//! Neurons, synapses and raw input cells live in flat vectors and refer to
//! each other by index, so forward and backward traversal never needs
//! shared ownership between nodes.

use crate::error::{NetworkError, Result};
use crate::neuron::{Neuron, NeuronId, NeuronInput, NeuronKind, Phase};
use crate::synapse::{RawInput, RawInputId, Synapse, SynapseId};
use crate::transfer::TransferFunction;

/// Ids handed out by one graph are only meaningful to that graph; the
/// accessors below panic on an id it never issued.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    raw_inputs: Vec<RawInput>,
    neurons: Vec<Neuron>,
    synapses: Vec<Synapse>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn add_raw_input(&mut self) -> RawInputId {
        self.raw_inputs.push(RawInput::default());
        RawInputId(self.raw_inputs.len() - 1)
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this graph.
    pub fn set_raw_input(&mut self, id: RawInputId, value: f64) {
        self.raw_inputs[id.0].set(value);
    }

    pub fn add_neuron(&mut self, kind: NeuronKind, transfer: TransferFunction) -> NeuronId {
        self.neurons.push(Neuron::new(kind, transfer));
        NeuronId(self.neurons.len() - 1)
    }

    pub fn add_input(&mut self, neuron: NeuronId, input: NeuronInput) -> Result<()> {
        self.neurons[neuron.0].add_input(neuron, input)
    }

    /// Creates a synapse from `source` to `target` and wires it into both
    /// ends.
    ///
    /// Edges only run forward: the target must have been added after the
    /// source, and output neurons feed nothing. This keeps the graph
    /// acyclic, which `calculate_output` relies on.
    pub fn connect(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f64,
    ) -> Result<SynapseId> {
        if target.0 <= source.0 || self.neurons[source.0].kind() == NeuronKind::Output {
            return Err(NetworkError::InvalidTopology(format!(
                "synapse {} -> {} does not lead forward",
                source, target
            )));
        }
        let id = SynapseId(self.synapses.len());
        let mut synapse = Synapse::new(source, weight);
        synapse.set_output_neuron(id, target)?;
        self.neurons[target.0].add_input(target, NeuronInput::Synapse(id))?;
        self.synapses.push(synapse);
        self.neurons[source.0].add_outgoing(id);
        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this graph.
    pub fn neuron(&self, id: NeuronId) -> &Neuron {
        &self.neurons[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this graph.
    pub fn synapse(&self, id: SynapseId) -> &Synapse {
        &self.synapses[id.0]
    }

    /// All synapses, in creation order.
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// Sums the neuron's inputs, activates and caches the result.
    ///
    /// Every upstream neuron reached through a synapse is recomputed on
    /// the way, so the result only depends on the raw inputs and weights.
    pub fn calculate_output(&mut self, id: NeuronId) -> f64 {
        let mut net = 0.0;
        for index in 0..self.neurons[id.0].inputs().len() {
            let input = self.neurons[id.0].inputs()[index];
            net += match input {
                NeuronInput::Raw(cell) => self.raw_inputs[cell.0].value(),
                NeuronInput::Synapse(synapse) => {
                    let (source, weight) = {
                        let synapse = &self.synapses[synapse.0];
                        (synapse.source(), synapse.weight())
                    };
                    self.calculate_output(source) * weight
                }
            };
        }
        self.neurons[id.0].activate(net)
    }

    /// Computes the neuron's delta and stages a weight delta on every
    /// incoming synapse.
    ///
    /// Hidden neurons read the deltas of their downstream neurons, which
    /// must already be computed for this step. No weight is changed here.
    pub fn backprop(
        &mut self,
        id: NeuronId,
        target: Option<f64>,
        learning_rate: f64,
    ) -> Result<()> {
        let neuron = &self.neurons[id.0];
        neuron.expect_phase(id, Phase::OutputComputed, "compute its delta")?;

        let slope = neuron.transfer().derivative(neuron.net());
        let delta = match neuron.kind() {
            NeuronKind::Output => {
                let target = target.ok_or(NetworkError::MissingTarget(id))?;
                (target - neuron.output()) * slope
            }
            NeuronKind::Hidden | NeuronKind::Input => {
                let downstream: f64 = neuron
                    .outgoing()
                    .iter()
                    .map(|&synapse| {
                        let synapse = &self.synapses[synapse.0];
                        synapse
                            .output_neuron()
                            .map_or(0.0, |next| self.neurons[next.0].delta() * synapse.weight())
                    })
                    .sum();
                slope * downstream
            }
        };

        for input in self.neurons[id.0].inputs() {
            if let NeuronInput::Synapse(synapse) = *input {
                let source = self.synapses[synapse.0].source();
                let update = learning_rate * delta * self.neurons[source.0].output();
                self.synapses[synapse.0].stage_update(update);
            }
        }
        self.neurons[id.0].record_delta(delta);
        Ok(())
    }

    /// Applies the weight deltas staged by `backprop` to every incoming
    /// synapse.
    pub fn apply_synapse_weight_updates(&mut self, id: NeuronId) -> Result<()> {
        self.neurons[id.0].expect_phase(id, Phase::DeltaComputed, "apply weight updates")?;
        for input in self.neurons[id.0].inputs() {
            if let NeuronInput::Synapse(synapse) = *input {
                self.synapses[synapse.0].apply_update();
            }
        }
        self.neurons[id.0].mark_applied();
        Ok(())
    }

    /// Drops every staged weight delta without applying it.
    pub fn discard_pending_updates(&mut self) {
        for synapse in &mut self.synapses {
            synapse.discard_update();
        }
    }
}
