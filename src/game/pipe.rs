use rand::Rng;

use super::bird::Bird;
use super::config::GameConfig;
use super::sprites::{sprites, PIPE_HEIGHT, PIPE_WIDTH};

/// A pair of pipes (one hanging, one standing) with a gap between them
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub x: f64,
    /// Gap-center: the y coordinate where the hanging pipe ends
    pub height: f64,
    /// Y coordinate of the hanging pipe's top-left corner
    pub top: f64,
    /// Y coordinate of the standing pipe's top-left corner
    pub bottom: f64,
    /// Whether the lead bird has flown past this pipe
    pub passed: bool,
    gap: f64,
    velocity: f64,
}

impl Pipe {
    /// Create a pipe at `x` with a randomly sampled gap
    pub fn new<R: Rng>(x: f64, config: &GameConfig, rng: &mut R) -> Self {
        let mut pipe = Self::blank(x, config);
        pipe.set_height(config, rng);
        pipe
    }

    /// Create a pipe with a known gap-center height
    pub fn with_height(x: f64, height: f64, config: &GameConfig) -> Self {
        let mut pipe = Self::blank(x, config);
        pipe.place_gap(height);
        pipe
    }

    fn blank(x: f64, config: &GameConfig) -> Self {
        Self {
            x,
            height: 0.0,
            top: 0.0,
            bottom: 0.0,
            passed: false,
            gap: config.pipe_gap,
            velocity: config.scroll_velocity,
        }
    }

    /// Sample the gap-center uniformly from the configured range
    fn set_height<R: Rng>(&mut self, config: &GameConfig, rng: &mut R) {
        let height = rng.gen_range(config.gap_min..config.gap_max).floor();
        self.place_gap(height);
    }

    fn place_gap(&mut self, height: f64) {
        self.height = height;
        self.top = height - PIPE_HEIGHT as f64;
        self.bottom = height + self.gap;
    }

    /// Scroll one frame to the left
    pub fn advance(&mut self) {
        self.x -= self.velocity;
    }

    /// Pixel-exact collision against either half of the pipe
    pub fn collide(&self, bird: &Bird) -> bool {
        let sprites = sprites();
        let bird_mask = bird.mask();
        let bird_y = bird.y.round();
        let dx = (self.x.round() - bird.x.round()) as i32;

        let top_offset = (dx, (self.top.round() - bird_y) as i32);
        let bottom_offset = (dx, (self.bottom.round() - bird_y) as i32);

        bird_mask.overlaps(sprites.pipe_bottom(), bottom_offset)
            || bird_mask.overlaps(sprites.pipe_top(), top_offset)
    }

    /// X coordinate of the right edge
    pub fn right_edge(&self) -> f64 {
        self.x + PIPE_WIDTH as f64
    }

    /// Whether the pipe has scrolled fully past the left edge
    pub fn is_offscreen(&self) -> bool {
        self.right_edge() < 0.0
    }

    /// Mark the pipe passed the first time it moves behind `bird_x`.
    /// Returns true only on that first transition.
    pub fn check_passed(&mut self, bird_x: f64) -> bool {
        if !self.passed && self.x < bird_x {
            self.passed = true;
            return true;
        }
        false
    }
}
