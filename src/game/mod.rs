//! Core game logic module for Flappy Bird
//!
//! This module contains all the simulation logic without any I/O or rendering
//! dependencies. It is shared by human play and by the evolution harness.

pub mod action;
pub mod base;
pub mod bird;
pub mod config;
pub mod engine;
pub mod mask;
pub mod pipe;
pub mod session;
pub mod sprites;
pub mod state;

// Re-export commonly used types
pub use action::Action;
pub use base::Base;
pub use bird::Bird;
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use mask::Mask;
pub use pipe::Pipe;
pub use session::{MenuChoice, Phase, Session, SessionInput, Transition};
pub use state::{CollisionType, GameState};
