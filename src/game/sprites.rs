//! Procedurally generated sprite masks
//!
//! Sizes match the classic Flappy Bird art scaled 2x. Only opacity matters for the
//! simulation, so every sprite is described as a [`Mask`].

use std::sync::LazyLock;

use super::mask::Mask;

pub const BIRD_WIDTH: usize = 68;
pub const BIRD_HEIGHT: usize = 48;

pub const PIPE_WIDTH: usize = 104;
pub const PIPE_HEIGHT: usize = 640;
/// Rows of the wider lip at the open end of a pipe
pub const PIPE_CAP_HEIGHT: usize = 48;
/// Horizontal inset of the pipe shaft relative to its lip
pub const PIPE_SHAFT_INSET: usize = 4;

pub const BASE_WIDTH: usize = 672;

/// Wing position of a bird animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WingPose {
    Up,
    Mid,
    Down,
}

impl WingPose {
    fn index(self) -> usize {
        match self {
            WingPose::Up => 0,
            WingPose::Mid => 1,
            WingPose::Down => 2,
        }
    }

    /// Vertical centre of the wing within the bird sprite
    fn wing_center(self) -> f64 {
        match self {
            WingPose::Up => 14.0,
            WingPose::Mid => 26.0,
            WingPose::Down => 36.0,
        }
    }
}

/// All masks used by the simulation
#[derive(Debug)]
pub struct Sprites {
    bird_frames: [Mask; 3],
    pipe_top: Mask,
    pipe_bottom: Mask,
}

static SPRITES: LazyLock<Sprites> = LazyLock::new(Sprites::build);

/// Shared sprite set, built on first use
pub fn sprites() -> &'static Sprites {
    &SPRITES
}

impl Sprites {
    fn build() -> Self {
        let pipe_bottom = pipe_mask();
        let pipe_top = pipe_bottom.flipped_vertically();

        Self {
            bird_frames: [
                bird_mask(WingPose::Up),
                bird_mask(WingPose::Mid),
                bird_mask(WingPose::Down),
            ],
            pipe_top,
            pipe_bottom,
        }
    }

    pub fn bird(&self, pose: WingPose) -> &Mask {
        &self.bird_frames[pose.index()]
    }

    /// Pipe hanging from the ceiling, opening at its lower end
    pub fn pipe_top(&self) -> &Mask {
        &self.pipe_top
    }

    /// Pipe standing on the ground, opening at its upper end
    pub fn pipe_bottom(&self) -> &Mask {
        &self.pipe_bottom
    }
}

fn inside_ellipse(x: usize, y: usize, cx: f64, cy: f64, rx: f64, ry: f64) -> bool {
    let dx = (x as f64 + 0.5 - cx) / rx;
    let dy = (y as f64 + 0.5 - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

fn bird_mask(pose: WingPose) -> Mask {
    let wing_y = pose.wing_center();
    Mask::from_fn(BIRD_WIDTH, BIRD_HEIGHT, |x, y| {
        let body = inside_ellipse(x, y, 32.0, 26.0, 26.0, 20.0);
        let wing = inside_ellipse(x, y, 18.0, wing_y, 14.0, 8.0);
        let beak = (56..BIRD_WIDTH).contains(&x) && (24..34).contains(&y);
        body || wing || beak
    })
}

fn pipe_mask() -> Mask {
    Mask::from_fn(PIPE_WIDTH, PIPE_HEIGHT, |x, y| {
        y < PIPE_CAP_HEIGHT || (PIPE_SHAFT_INSET..PIPE_WIDTH - PIPE_SHAFT_INSET).contains(&x)
    })
}
