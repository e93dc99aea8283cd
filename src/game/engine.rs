use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{
    action::Action,
    base::Base,
    bird::Bird,
    config::GameConfig,
    pipe::Pipe,
    state::{CollisionType, GameState},
};

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether a pipe was cleared this step
    pub passed_pipe: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Whether the game has terminated
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

/// The game engine that handles all game logic
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine whose pipe gaps are reproducible
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Reset the game to initial state
    pub fn reset(&mut self) -> GameState {
        GameState::new(self.spawn_bird(), vec![self.spawn_pipe()], self.spawn_base())
    }

    /// A bird at the starting position
    pub fn spawn_bird(&self) -> Bird {
        Bird::new(self.config.bird_start_x, self.config.bird_start_y)
    }

    /// A fresh pipe just off the right edge
    pub fn spawn_pipe(&mut self) -> Pipe {
        Pipe::new(self.config.pipe_spawn_x, &self.config, &mut self.rng)
    }

    pub fn spawn_base(&self) -> Base {
        Base::new(self.config.floor_y, self.config.scroll_velocity)
    }

    /// Whether the bird's lower edge has reached the ground line
    pub fn hit_ground(&self, bird: &Bird) -> bool {
        bird.bottom() >= self.config.floor_y
    }

    /// Whether the bird has left the play area at the top or bottom
    pub fn out_of_bounds(&self, bird: &Bird) -> Option<CollisionType> {
        if self.hit_ground(bird) {
            Some(CollisionType::Ground)
        } else if bird.y < 0.0 {
            Some(CollisionType::Ceiling)
        } else {
            None
        }
    }

    /// Execute one frame of the single-bird game
    pub fn step(&mut self, state: &mut GameState, action: Action) -> StepResult {
        if !state.is_alive {
            return StepResult {
                terminated: true,
                info: StepInfo {
                    passed_pipe: false,
                    collision_type: None,
                },
            };
        }

        if action == Action::Jump {
            state.bird.jump();
        }
        state.bird.advance();
        state.base.advance();

        let mut collision_type = None;
        let mut passed_pipe = false;
        let mut expired = Vec::with_capacity(state.pipes.len());

        for pipe in &mut state.pipes {
            if pipe.collide(&state.bird) {
                collision_type = Some(CollisionType::Pipe);
            }
            if pipe.check_passed(state.bird.x) {
                passed_pipe = true;
            }
            expired.push(pipe.is_offscreen());
            pipe.advance();
        }

        if passed_pipe {
            state.score += 1;
            let pipe = self.spawn_pipe();
            state.pipes.push(pipe);
        }

        // Expiry is judged before the move, as in the training harness
        let mut expired = expired.into_iter();
        state.pipes.retain(|_| !expired.next().unwrap_or(false));

        // Only the ground ends a human game; flying high is allowed
        if collision_type.is_none() && self.hit_ground(&state.bird) {
            collision_type = Some(CollisionType::Ground);
        }

        state.bird.animate();
        state.frames += 1;

        if collision_type.is_some() {
            state.is_alive = false;
            state.collision = collision_type;
        }

        StepResult {
            terminated: !state.is_alive,
            info: StepInfo {
                passed_pipe,
                collision_type,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GameEngine {
        GameEngine::with_seed(GameConfig::default(), 42)
    }

    #[test]
    fn test_reset() {
        let mut engine = engine();
        let state = engine.reset();

        assert!(state.is_alive);
        assert_eq!(state.score, 0);
        assert_eq!(state.frames, 0);
        assert_eq!(state.bird.x, 230.0);
        assert_eq!(state.bird.y, 350.0);
        assert_eq!(state.pipes.len(), 1);
        assert_eq!(state.pipes[0].x, 600.0);
        assert_eq!(state.base.y, 730.0);
    }

    #[test]
    fn test_jump_then_step_from_spawn() {
        let mut engine = engine();
        let mut state = engine.reset();

        let result = engine.step(&mut state, Action::Jump);

        assert!(!result.terminated);
        assert_eq!(state.bird.velocity, -10.5);
        assert_eq!(state.bird.tick_count, 1);
        assert_eq!(state.bird.y, 339.0);
        assert_eq!(state.pipes[0].x, 595.0);
        assert_eq!(state.frames, 1);
    }

    #[test]
    fn test_falling_bird_hits_ground() {
        let mut engine = engine();
        let mut state = engine.reset();

        let mut frames = 0;
        loop {
            let result = engine.step(&mut state, Action::Idle);
            frames += 1;
            if result.terminated {
                assert_eq!(result.info.collision_type, Some(CollisionType::Ground));
                break;
            }
            assert!(frames < 100, "bird never landed");
        }

        assert!(!state.is_alive);
        assert_eq!(state.collision, Some(CollisionType::Ground));
        assert!(state.bird.bottom() >= 730.0);
    }

    #[test]
    fn test_pipe_collision_ends_game() {
        let mut engine = engine();
        let mut state = engine.reset();
        let config = engine.config().clone();
        // Gap far below the bird, pipe right on top of it
        state.pipes = vec![Pipe::with_height(230.0, 449.0, &config)];

        let result = engine.step(&mut state, Action::Idle);

        assert!(result.terminated);
        assert_eq!(result.info.collision_type, Some(CollisionType::Pipe));
    }

    #[test]
    fn test_passing_pipe_scores_and_spawns() {
        let mut engine = engine();
        let mut state = engine.reset();
        let config = engine.config().clone();
        // Bird sits in the gap; pipe is just about to slip behind it
        state.pipes = vec![Pipe::with_height(229.0, 320.0, &config)];
        state.bird.y = 400.0;
        state.bird.jump_height = 400.0;

        let result = engine.step(&mut state, Action::Idle);

        assert!(result.info.passed_pipe);
        assert_eq!(state.score, 1);
        assert_eq!(state.pipes.len(), 2);
        assert_eq!(state.pipes[1].x, 600.0);

        // The same pipe never scores twice
        let result = engine.step(&mut state, Action::Idle);
        assert!(!result.info.passed_pipe);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_offscreen_pipes_removed() {
        let mut engine = engine();
        let mut state = engine.reset();
        let config = engine.config().clone();
        let mut gone = Pipe::with_height(-105.0, 320.0, &config);
        gone.passed = true;
        state.pipes = vec![gone, Pipe::with_height(600.0, 320.0, &config)];

        engine.step(&mut state, Action::Idle);

        assert_eq!(state.pipes.len(), 1);
        assert_eq!(state.pipes[0].x, 595.0);
    }

    #[test]
    fn test_expiry_judged_before_pipe_moves() {
        let mut engine = engine();
        let mut state = engine.reset();
        let config = engine.config().clone();
        // Right edge at 2: still on screen this frame, off it after the move
        let mut leaving = Pipe::with_height(-102.0, 320.0, &config);
        leaving.passed = true;
        state.pipes = vec![leaving, Pipe::with_height(600.0, 320.0, &config)];

        engine.step(&mut state, Action::Idle);
        assert_eq!(state.pipes.len(), 2);
        assert_eq!(state.pipes[0].x, -107.0);

        engine.step(&mut state, Action::Idle);
        assert_eq!(state.pipes.len(), 1);
        assert_eq!(state.pipes[0].x, 590.0);
    }

    #[test]
    fn test_no_ceiling_in_single_bird_game() {
        let mut engine = engine();
        let mut state = engine.reset();
        state.pipes.clear();
        state.bird.y = -500.0;
        state.bird.jump_height = -500.0;

        let result = engine.step(&mut state, Action::Jump);
        assert!(!result.terminated);
    }

    #[test]
    fn test_terminated_game_no_update() {
        let mut engine = engine();
        let mut state = engine.reset();
        state.is_alive = false;
        let frames_before = state.frames;

        let result = engine.step(&mut state, Action::Jump);

        assert!(result.terminated);
        assert_eq!(state.frames, frames_before);
    }

    #[test]
    fn test_out_of_bounds() {
        let engine = engine();
        assert_eq!(engine.out_of_bounds(&Bird::new(230.0, 350.0)), None);
        assert_eq!(
            engine.out_of_bounds(&Bird::new(230.0, -1.0)),
            Some(CollisionType::Ceiling)
        );
        assert_eq!(
            engine.out_of_bounds(&Bird::new(230.0, 682.0)),
            Some(CollisionType::Ground)
        );
    }
}
