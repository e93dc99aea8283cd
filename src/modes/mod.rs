pub mod human;
pub mod pacer;
pub mod train;
pub mod visualize;

pub use human::HumanMode;
pub use pacer::FramePacer;
pub use train::{TrainConfig, TrainMode};
pub use visualize::VisualizeMode;
