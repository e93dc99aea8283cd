//! Training statistics tracking for NEAT runs
//!
//! Per-generation results (fitness, score, frames survived)
//! kept in rolling windows for smoothed progress lines.

use std::collections::VecDeque;

use crate::evolve::GenerationReport;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust,ignore
/// use flappy_neat::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(10);
/// stats.record_generation(&report);
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Best fitness of each generation (rolling window)
    best_fitnesses: VecDeque<f64>,

    /// Mean fitness of each generation (rolling window)
    mean_fitnesses: VecDeque<f64>,

    /// Pipes passed in each generation (rolling window)
    scores: VecDeque<u32>,

    /// Frames each generation lasted (rolling window)
    frames: VecDeque<u64>,

    /// Highest fitness of any generation so far
    top_fitness: Option<f64>,

    /// Highest score of any generation so far
    top_score: u32,

    total_generations: usize,

    total_frames: u64,

    /// Window size for rolling averages
    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker averaging over the last `window_size` generations
    pub fn new(window_size: usize) -> Self {
        Self {
            best_fitnesses: VecDeque::with_capacity(window_size),
            mean_fitnesses: VecDeque::with_capacity(window_size),
            scores: VecDeque::with_capacity(window_size),
            frames: VecDeque::with_capacity(window_size),
            top_fitness: None,
            top_score: 0,
            total_generations: 0,
            total_frames: 0,
            window_size,
        }
    }

    /// Record one evaluated generation
    pub fn record_generation(&mut self, report: &GenerationReport) {
        Self::push_deque(&mut self.best_fitnesses, report.best_fitness, self.window_size);
        Self::push_deque(&mut self.mean_fitnesses, report.mean_fitness, self.window_size);
        Self::push_deque(&mut self.scores, report.score, self.window_size);
        Self::push_deque(&mut self.frames, report.frames, self.window_size);

        self.top_fitness = Some(
            self.top_fitness
                .map_or(report.best_fitness, |top| top.max(report.best_fitness)),
        );
        self.top_score = self.top_score.max(report.score);
        self.total_generations += 1;
        self.total_frames += report.frames;
    }

    /// Mean of the per-generation best fitness over the rolling window
    pub fn mean_best_fitness(&self) -> f64 {
        Self::mean(self.best_fitnesses.iter().copied())
    }

    /// Mean of the per-generation mean fitness over the rolling window
    pub fn mean_fitness(&self) -> f64 {
        Self::mean(self.mean_fitnesses.iter().copied())
    }

    pub fn mean_score(&self) -> f64 {
        Self::mean(self.scores.iter().map(|&s| f64::from(s)))
    }

    pub fn mean_frames(&self) -> f64 {
        Self::mean(self.frames.iter().map(|&f| f as f64))
    }

    pub fn top_fitness(&self) -> Option<f64> {
        self.top_fitness
    }

    pub fn top_score(&self) -> u32 {
        self.top_score
    }

    pub fn total_generations(&self) -> usize {
        self.total_generations
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line summary of the current statistics
    pub fn format_summary(&self) -> String {
        format!(
            "Generations: {} | Best: {:.2} | Mean: {:.2} | Score: {:.2} | Frames: {:.1} | Top score: {}",
            self.total_generations,
            self.mean_best_fitness(),
            self.mean_fitness(),
            self.mean_score(),
            self.mean_frames(),
            self.top_score,
        )
    }

    fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
        let len = values.len();
        if len == 0 {
            0.0
        } else {
            values.sum::<f64>() / len as f64
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
