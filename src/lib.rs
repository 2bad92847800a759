//! A small feed-forward neural network built from individual neurons and
//! synapses, trained online with backpropagation.

#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod error;
pub mod graph;
pub mod network;
pub mod neuron;
pub mod synapse;
pub mod trainer;
pub mod transfer;

pub use config::NetworkConfig;
pub use error::{NetworkError, Result, VectorKind};
pub use network::Network;
pub use transfer::TransferFunction;
