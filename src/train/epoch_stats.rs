use serde::{Deserialize, Serialize};

/// Progress record sent over `TrainConfig::progress_tx` at every reported
/// epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Learning rate used during this epoch.
    pub learning_rate: f64,
    /// Average loss over the full dataset (single-threaded driver) or over
    /// the last mini-batch (concurrent driver).
    pub loss: f64,
    /// Wall-clock time since training started.
    pub elapsed_ms: u64,
}
