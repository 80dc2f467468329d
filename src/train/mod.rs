pub mod batch;
pub mod concurrent;
pub mod epoch_stats;
mod progress;
pub mod train_config;
pub mod trainer;

pub use batch::random_subset;
pub use concurrent::train_concurrent;
pub use epoch_stats::EpochStats;
pub use train_config::TrainConfig;
pub use trainer::train_single_threaded;
