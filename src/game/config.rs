use serde::{Deserialize, Serialize};

/// World constants shared by the human and evolution variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Width of the play area in world units
    pub window_width: f64,
    /// Height of the play area in world units
    pub window_height: f64,
    /// Y coordinate of the ground line
    pub floor_y: f64,

    /// Bird spawn position
    pub bird_start_x: f64,
    pub bird_start_y: f64,

    /// X coordinate where new pipes appear (just off the right edge)
    pub pipe_spawn_x: f64,
    /// Vertical opening between the top and bottom pipe
    pub pipe_gap: f64,
    /// Gap-center samples are drawn from `[gap_min, gap_max)`
    pub gap_min: f64,
    pub gap_max: f64,
    /// Horizontal scroll speed of pipes and ground, per frame
    pub scroll_velocity: f64,

    /// Target frame rate of the paced front-ends
    pub frames_per_second: u32,
    /// Frames the final frame is held before the game-over menu opens
    pub game_over_hold_frames: u32,

    // Fitness (for evolution)
    /// Fitness earned for every frame survived
    pub frame_reward: f64,
    /// Fitness earned by every surviving bird when a pipe is passed
    pub pipe_reward: f64,
    /// Controller output above which the bird jumps
    pub jump_threshold: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: 550.0,
            window_height: 800.0,
            floor_y: 730.0,
            bird_start_x: 230.0,
            bird_start_y: 350.0,
            pipe_spawn_x: 600.0,
            pipe_gap: 200.0,
            gap_min: 50.0,
            gap_max: 450.0,
            scroll_velocity: 5.0,
            frames_per_second: 30,
            game_over_hold_frames: 30,
            frame_reward: 0.1,
            pipe_reward: 3.0,
            jump_threshold: 0.5,
        }
    }
}

impl GameConfig {
    /// Duration of a single frame in milliseconds
    pub fn frame_millis(&self) -> u64 {
        1000 / u64::from(self.frames_per_second.max(1))
    }

    /// Check that the world constants describe a playable field
    pub fn validate(&self) -> Result<(), String> {
        if self.window_width <= 0.0 || self.window_height <= 0.0 {
            return Err(format!(
                "window must have a positive size, got {}x{}",
                self.window_width, self.window_height
            ));
        }

        if self.floor_y <= 0.0 || self.floor_y > self.window_height {
            return Err(format!(
                "floor_y must be in (0, {}], got {}",
                self.window_height, self.floor_y
            ));
        }

        if self.gap_min >= self.gap_max {
            return Err(format!(
                "gap range is empty: [{}, {})",
                self.gap_min, self.gap_max
            ));
        }

        if self.scroll_velocity <= 0.0 {
            return Err(format!(
                "scroll_velocity must be positive, got {}",
                self.scroll_velocity
            ));
        }

        if self.frames_per_second == 0 {
            return Err("frames_per_second must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.window_width, 550.0);
        assert_eq!(config.floor_y, 730.0);
        assert_eq!(config.pipe_gap, 200.0);
        assert_eq!(config.frames_per_second, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frame_millis() {
        let config = GameConfig::default();
        assert_eq!(config.frame_millis(), 33);
    }

    #[test]
    fn test_validation_rejects_empty_gap_range() {
        let config = GameConfig {
            gap_min: 300.0,
            gap_max: 300.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_floor_outside_window() {
        let config = GameConfig {
            floor_y: 900.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
