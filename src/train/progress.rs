use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::info;

use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Decides which epochs are reported and forwards the reports to the log
/// and to the optional progress channel.
pub(crate) struct Progress<'a> {
    config: &'a TrainConfig,
    interval: Option<usize>,
    started: Instant,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(config: &'a TrainConfig) -> Self {
        let interval = if config.verbose_steps > 0 {
            Some((config.epochs / config.verbose_steps).max(1))
        } else if config.progress_tx.is_some() {
            Some(1)
        } else {
            None
        };
        Progress {
            config,
            interval,
            started: Instant::now(),
        }
    }

    pub(crate) fn is_due(&self, epoch: usize) -> bool {
        self.interval.is_some_and(|i| epoch % i == 0)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.config
            .stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Returns `false` when the progress receiver is gone and training
    /// should stop.
    pub(crate) fn report(&self, epoch: usize, learning_rate: f64, loss: f64) -> bool {
        if self.config.verbose_steps > 0 {
            info!(epoch, learning_rate, loss, "training progress");
        }
        let Some(tx) = &self.config.progress_tx else {
            return true;
        };
        let stats = EpochStats {
            epoch,
            total_epochs: self.config.epochs,
            learning_rate,
            loss,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        };
        tx.send(stats).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_interval_follows_verbose_steps() {
        let config = TrainConfig::new(100, 0.1, 0.0).verbose_steps(4);
        let progress = Progress::new(&config);
        let due: Vec<usize> = (0..100).filter(|&e| progress.is_due(e)).collect();
        assert_eq!(due, vec![0, 25, 50, 75]);
    }

    #[test]
    fn test_silent_without_verbose_or_channel() {
        let config = TrainConfig::new(10, 0.1, 0.0);
        let progress = Progress::new(&config);
        assert!((0..10).all(|e| !progress.is_due(e)));
    }

    #[test]
    fn test_more_steps_than_epochs_reports_every_epoch() {
        let config = TrainConfig::new(3, 0.1, 0.0).verbose_steps(50);
        let progress = Progress::new(&config);
        assert!((0..3).all(|e| progress.is_due(e)));
    }

    #[test]
    fn test_dropped_receiver_stops() {
        let (tx, rx) = mpsc::channel();
        let config = TrainConfig::new(3, 0.1, 0.0).progress(tx);
        let progress = Progress::new(&config);
        assert!(progress.is_due(2));
        assert!(progress.report(0, 0.1, 1.0));
        assert_eq!(rx.recv().unwrap().epoch, 0);
        drop(rx);
        assert!(!progress.report(1, 0.1, 1.0));
    }
}
