use std::time::{Duration, Instant};

/// Format a duration as `MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Human-play metrics across the attempts of one session
pub struct GameMetrics {
    attempt_start: Instant,
    attempt_time: Duration,
    /// Time flown in finished attempts
    finished_time: Duration,
    /// The attempt clock stops on game over
    flying: bool,
    pub high_score: u32,
    pub attempts: u32,
    /// Longest flight in frames
    pub longest_flight: u64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self {
            attempt_start: Instant::now(),
            attempt_time: Duration::ZERO,
            finished_time: Duration::ZERO,
            flying: true,
            high_score: 0,
            attempts: 0,
            longest_flight: 0,
        }
    }

    pub fn update(&mut self) {
        if self.flying {
            self.attempt_time = self.attempt_start.elapsed();
        }
    }

    pub fn on_game_start(&mut self) {
        self.attempt_start = Instant::now();
        self.attempt_time = Duration::ZERO;
        self.flying = true;
    }

    pub fn on_game_over(&mut self, final_score: u32, frames: u64) {
        if !self.flying {
            return;
        }
        self.update();
        self.flying = false;
        self.finished_time += self.attempt_time;
        self.attempts += 1;
        self.high_score = self.high_score.max(final_score);
        self.longest_flight = self.longest_flight.max(frames);
    }

    pub fn is_flying(&self) -> bool {
        self.flying
    }

    /// Duration of the current (or just finished) attempt
    pub fn attempt_time(&self) -> Duration {
        self.attempt_time
    }

    /// Time flown over the whole session
    pub fn total_time(&self) -> Duration {
        if self.flying {
            self.finished_time + self.attempt_time
        } else {
            self.finished_time
        }
    }

    pub fn format_time(&self) -> String {
        format_duration(self.attempt_time)
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}
