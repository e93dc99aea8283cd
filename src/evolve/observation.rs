//! What a controller sees each frame

use crate::game::sprites::PIPE_WIDTH;
use crate::game::{Bird, Pipe};
use crate::neat::GenomeConfig;

/// Number of controller inputs
pub const OBSERVATION_SIZE: usize = 3;

/// Index of the pipe the birds are steering towards.
///
/// The second pipe becomes the target once the lead bird is past the first
/// pipe's right edge. `None` when there are no pipes.
pub fn next_pipe_index(pipes: &[Pipe], lead_x: f64) -> Option<usize> {
    if pipes.is_empty() {
        None
    } else if pipes.len() > 1 && lead_x > pipes[0].x + PIPE_WIDTH as f64 {
        Some(1)
    } else {
        Some(0)
    }
}

/// Check that networks built from `config` take exactly the observation
/// [`observe`] produces
pub fn validate_controller(config: &GenomeConfig) -> Result<(), String> {
    if config.num_inputs != OBSERVATION_SIZE {
        return Err(format!(
            "controllers need {} inputs (y, gap distance, bottom distance), got {}",
            OBSERVATION_SIZE, config.num_inputs
        ));
    }
    Ok(())
}

/// `[y, |y - gap center|, |y - bottom pipe top|]`
pub fn observe(bird: &Bird, pipe: &Pipe) -> [f64; OBSERVATION_SIZE] {
    [
        bird.y,
        (bird.y - pipe.height).abs(),
        (bird.y - pipe.bottom).abs(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::neat::NeatConfig;

    fn pipe(x: f64) -> Pipe {
        Pipe::with_height(x, 300.0, &GameConfig::default())
    }

    #[test]
    fn test_no_pipes() {
        assert_eq!(next_pipe_index(&[], 230.0), None);
    }

    #[test]
    fn test_first_pipe_until_passed() {
        let pipes = [pipe(200.0), pipe(600.0)];
        // 200 + 104 = 304
        assert_eq!(next_pipe_index(&pipes, 230.0), Some(0));
        assert_eq!(next_pipe_index(&pipes, 304.0), Some(0));
        assert_eq!(next_pipe_index(&pipes, 305.0), Some(1));
    }

    #[test]
    fn test_single_pipe_always_first() {
        let pipes = [pipe(-50.0)];
        assert_eq!(next_pipe_index(&pipes, 230.0), Some(0));
    }

    #[test]
    fn test_observe() {
        let bird = Bird::new(230.0, 350.0);
        let pipe = pipe(600.0);
        assert_eq!(observe(&bird, &pipe), [350.0, 50.0, 150.0]);
    }

    #[test]
    fn test_controller_must_match_observation() {
        let mut config = NeatConfig::default().genome;
        assert!(validate_controller(&config).is_ok());

        config.num_inputs = 2;
        assert!(validate_controller(&config).is_err());
        config.num_inputs = 4;
        assert!(validate_controller(&config).is_err());
    }
}
