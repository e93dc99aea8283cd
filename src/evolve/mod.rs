//! Evolving flappy-bird controllers
//!
//! Glue between the game simulation and the NEAT population: observation of
//! the world, the generation-wide fitness harness and persistence of the winner.

pub mod harness;
pub mod observation;
pub mod persistence;

pub use harness::{
    Contestant, FitnessHarness, FrameSink, FrameView, GenerationReport, GenerationRun, Headless,
    TrainingProgress,
};
pub use observation::{next_pipe_index, observe, validate_controller, OBSERVATION_SIZE};
pub use persistence::{load_genome, save_genome, ModelMetadata};
