//! NEAT: evolving the topology and weights of small feed-forward networks
//!
//! [`Population::run`] drives the loop; callers only supply a fitness function
//! that scores every genome of a generation.

pub mod activation;
pub mod config;
pub mod genome;
pub mod network;
pub mod population;
pub mod reporting;
pub mod reproduction;
pub mod species;
pub mod stagnation;

pub use activation::Activation;
pub use config::{FitnessAggregate, GenomeConfig, InitialConnection, NeatConfig};
pub use genome::{ConnectionGene, Genome, NodeGene};
pub use network::FeedForwardNetwork;
pub use population::Population;
pub use reporting::{LogReporter, Reporter, StatisticsReporter};
pub use species::SpeciesSet;
