use super::base::Base;
use super::bird::Bird;
use super::pipe::Pipe;

/// What ended a bird's flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Touched a pipe
    Pipe,
    /// Lower edge reached the ground line
    Ground,
    /// Flew above the top of the play area (evolution only)
    Ceiling,
}

/// Complete state of a single-bird game
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub bird: Bird,
    pub pipes: Vec<Pipe>,
    pub base: Base,
    pub score: u32,
    pub frames: u64,
    pub is_alive: bool,
    pub collision: Option<CollisionType>,
}

impl GameState {
    pub fn new(bird: Bird, pipes: Vec<Pipe>, base: Base) -> Self {
        Self {
            bird,
            pipes,
            base,
            score: 0,
            frames: 0,
            is_alive: true,
            collision: None,
        }
    }
}
