//! Flappy NEAT - Flappy Bird in the terminal with neuroevolution
//!
//! This library provides:
//! - Core game logic and the human-play state machine (game module)
//! - A NEAT implementation: genomes, networks, speciation, reproduction (neat module)
//! - The generation-wide fitness harness and genome persistence (evolve module)
//! - TUI rendering, keyboard input and metrics (render, input, metrics modules)
//! - Execution modes (human, train, visualize)

pub mod evolve;
pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod neat;
pub mod render;
