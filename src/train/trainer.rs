use tracing::{info, warn};

use crate::error::NnResult;
use crate::network::{Network, Sample};
use crate::train::progress::Progress;
use crate::train::train_config::TrainConfig;

/// Full-batch gradient descent on the calling thread: one step per epoch,
/// each using the gradient averaged over every sample.
///
/// Returns the average loss over `samples` once training ends. `batch_size`,
/// `workers` and `seed` are ignored.
///
/// # Errors
/// Stops at the first non-finite gradient and returns
/// [`NnError::NumericInstability`](crate::NnError::NumericInstability). The
/// network keeps the updates applied before that step.
pub fn train_single_threaded(
    network: &mut Network,
    samples: &[Sample],
    config: &TrainConfig,
) -> NnResult<f64> {
    if samples.is_empty() {
        warn!("no training samples, nothing to do");
        return Ok(0.0);
    }
    if config.learning_rate <= 0.0 {
        warn!(
            learning_rate = config.learning_rate,
            "non-positive learning rate, parameters will not change"
        );
    }

    info!(
        epochs = config.epochs,
        samples = samples.len(),
        learning_rate = config.learning_rate,
        decay = config.decay,
        "starting single-threaded training"
    );

    let sgd = config.optimizer();
    let progress = Progress::new(config);
    for epoch in 0..config.epochs {
        if progress.stop_requested() {
            info!(epoch, "stop requested");
            break;
        }

        let learning_rate = sgd.learning_rate_at(epoch);
        network.backprop_step(samples, learning_rate)?;

        if progress.is_due(epoch)
            && !progress.report(epoch, learning_rate, network.average_loss(samples))
        {
            info!(epoch, "progress receiver dropped, stopping");
            break;
        }
    }

    let loss = network.average_loss(samples);
    info!(loss, "training finished");
    Ok(loss)
}
