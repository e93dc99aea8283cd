use std::time::{Duration, Instant};

/// Blocking frame limiter for loops that cannot await
#[derive(Debug)]
pub struct FramePacer {
    frame_duration: Duration,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            frame_duration: Duration::from_secs(1) / frames_per_second.max(1),
            frame_start: Instant::now(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Time left in the current frame
    pub fn remaining(&self) -> Duration {
        self.frame_duration.saturating_sub(self.frame_start.elapsed())
    }

    /// Sleep out the rest of the frame and start the next one
    pub fn wait(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.frame_start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(FramePacer::new(30).frame_duration(), Duration::from_nanos(33_333_333));
        assert_eq!(FramePacer::new(0).frame_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_wait_fills_the_frame() {
        let mut pacer = FramePacer::new(50);
        let start = Instant::now();
        pacer.wait();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(38));
    }

    #[test]
    fn test_late_frame_does_not_sleep() {
        let mut pacer = FramePacer::new(1000);
        std::thread::sleep(Duration::from_millis(5));
        assert!(pacer.remaining().is_zero());
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
