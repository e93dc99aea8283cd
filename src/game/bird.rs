use super::mask::Mask;
use super::sprites::{sprites, WingPose, BIRD_HEIGHT, BIRD_WIDTH};

/// Velocity applied by a jump (negative is upward)
pub const JUMP_VELOCITY: f64 = -10.5;
/// Largest downward displacement per frame
pub const TERMINAL_DISPLACEMENT: f64 = 16.0;
/// Extra lift added to every upward displacement
pub const UPWARD_BOOST: f64 = 2.0;
/// Coefficient of the quadratic term of the fall arc
pub const GRAVITY: f64 = 1.5;

/// Nose-up tilt held while climbing
pub const MAX_TILT: f64 = 25.0;
/// Lowest tilt (straight down)
pub const MIN_TILT: f64 = -90.0;
/// Degrees the nose drops per frame while falling
pub const TILT_VELOCITY: f64 = 20.0;
/// Below this tilt the wings stop flapping
pub const NOSE_DIVE_TILT: f64 = -80.0;
/// The bird keeps its nose up until it drops this far below its last jump height
pub const TILT_LATCH_DISTANCE: f64 = 50.0;

/// Frames each wing pose is shown for
pub const ANIMATION_TIME: u32 = 5;

/// Vertical displacement `t` ticks after a jump with velocity `v`.
///
/// `d = v*t + 1.5*t^2`, capped at [`TERMINAL_DISPLACEMENT`] and, when moving up,
/// lowered by a further [`UPWARD_BOOST`].
pub fn displacement(velocity: f64, ticks: u32) -> f64 {
    let t = f64::from(ticks);
    let mut d = velocity * t + GRAVITY * t * t;

    if d > TERMINAL_DISPLACEMENT {
        d = TERMINAL_DISPLACEMENT;
    }

    if d < 0.0 {
        d -= UPWARD_BOOST;
    }

    d
}

/// The player-controlled (or network-controlled) bird
#[derive(Debug, Clone, PartialEq)]
pub struct Bird {
    pub x: f64,
    pub y: f64,
    /// Nose angle in degrees, within [`MIN_TILT`, `MAX_TILT`]
    pub tilt: f64,
    /// Velocity set by the last jump
    pub velocity: f64,
    /// Frames since the last jump
    pub tick_count: u32,
    /// Y position at the last jump
    pub jump_height: f64,
    animation_ticks: u32,
    pose: WingPose,
}

impl Bird {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            tilt: 0.0,
            velocity: 0.0,
            tick_count: 0,
            jump_height: y,
            animation_ticks: 0,
            pose: WingPose::Up,
        }
    }

    /// Flap: restart the fall arc from the current height
    pub fn jump(&mut self) {
        self.velocity = JUMP_VELOCITY;
        self.tick_count = 0;
        self.jump_height = self.y;
    }

    /// Advance one physics frame. Returns the displacement applied.
    pub fn advance(&mut self) -> f64 {
        self.tick_count += 1;
        let d = displacement(self.velocity, self.tick_count);
        self.y += d;

        if d < 0.0 || self.y < self.jump_height + TILT_LATCH_DISTANCE {
            self.tilt = self.tilt.max(MAX_TILT);
        } else {
            self.tilt = (self.tilt - TILT_VELOCITY).max(MIN_TILT);
        }

        d
    }

    /// Advance the wing-flap animation by one frame
    pub fn animate(&mut self) {
        self.animation_ticks += 1;

        self.pose = if self.animation_ticks < ANIMATION_TIME {
            WingPose::Up
        } else if self.animation_ticks < ANIMATION_TIME * 2 {
            WingPose::Mid
        } else if self.animation_ticks < ANIMATION_TIME * 3 {
            WingPose::Down
        } else if self.animation_ticks < ANIMATION_TIME * 4 {
            WingPose::Mid
        } else {
            self.animation_ticks = 0;
            WingPose::Up
        };

        // Gliding nose-down: wings held level
        if self.tilt <= NOSE_DIVE_TILT {
            self.pose = WingPose::Mid;
            self.animation_ticks = ANIMATION_TIME * 2;
        }
    }

    pub fn pose(&self) -> WingPose {
        self.pose
    }

    /// Opacity mask of the current animation frame
    pub fn mask(&self) -> &'static Mask {
        sprites().bird(self.pose)
    }

    pub fn width(&self) -> f64 {
        BIRD_WIDTH as f64
    }

    pub fn height(&self) -> f64 {
        BIRD_HEIGHT as f64
    }

    /// Y coordinate of the lower edge of the sprite
    pub fn bottom(&self) -> f64 {
        self.y + self.height()
    }
}
