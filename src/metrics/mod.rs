pub mod game_metrics;
pub mod training_stats;

pub use game_metrics::{format_duration, GameMetrics};
pub use training_stats::TrainingStats;
