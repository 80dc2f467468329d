use std::sync::mpsc;
use std::sync::{atomic::AtomicBool, Arc};

use crate::optim::Sgd;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a training run.
///
/// # Fields
/// - `epochs`        — number of epochs. The single-threaded driver takes one
///                     full-batch step per epoch; the concurrent driver takes
///                     `ceil(samples / batch_size)` mini-batch steps per epoch
/// - `learning_rate` — starting learning rate
/// - `decay`         — the rate at epoch `e` is `learning_rate / (1 + decay * e)`
/// - `batch_size`    — samples per step of the concurrent driver; `0` means
///                     the full dataset
/// - `workers`       — worker threads for the concurrent driver; `0` means
///                     the available parallelism
/// - `verbose_steps` — how many progress reports to log over the run; `0`
///                     disables them
/// - `seed`          — seeds mini-batch sampling for reproducible runs
/// - `progress_tx`   — optional channel receiving one `EpochStats` per
///                     reported epoch. If the receiver is dropped, training
///                     stops after the current step.
/// - `stop_flag`     — optional flag; when set from another thread training
///                     stops before the next parameter update step.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub decay: f64,
    pub batch_size: usize,
    pub workers: usize,
    pub verbose_steps: usize,
    pub seed: Option<u64>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Full-batch run with automatic worker count, no reporting and no
    /// stop flag.
    pub fn new(epochs: usize, learning_rate: f64, decay: f64) -> Self {
        TrainConfig {
            epochs,
            learning_rate,
            decay,
            batch_size: 0,
            workers: 0,
            verbose_steps: 0,
            seed: None,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn verbose_steps(mut self, verbose_steps: usize) -> Self {
        self.verbose_steps = verbose_steps;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn optimizer(&self) -> Sgd {
        Sgd::with_decay(self.learning_rate, self.decay)
    }
}
