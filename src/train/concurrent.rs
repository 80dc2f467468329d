use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::error::{NnError, NnResult};
use crate::layers::Gradient;
use crate::network::{Network, NetworkGradient, Sample};
use crate::train::batch::{make_rng, random_subset};
use crate::train::progress::Progress;
use crate::train::train_config::TrainConfig;

/// A slice of one mini-batch, handed to a single worker. `network` is a
/// snapshot of the parameters for the current step.
struct WorkItem<'a> {
    network: Arc<Network>,
    samples: Vec<&'a Sample>,
}

type PartialGradient = NnResult<NetworkGradient>;

/// Mini-batch SGD on a fixed pool of worker threads.
///
/// Each step draws `batch_size` distinct samples, splits them into
/// `ceil(batch_size / work_size)` sub-batches with
/// `work_size = ceil(batch_size / workers)`, and sends them over a bounded
/// work queue. Workers return the summed gradient of their sub-batch on a
/// bounded result queue. Once every partial result of the step is in, the
/// driver averages them and updates the parameters, and only then starts
/// the next step. Workers only ever see the parameters through a shared
/// snapshot, so the update cannot overlap a forward or backward pass.
///
/// An epoch is `ceil(samples / batch_size)` steps. Returns the average loss
/// over all `samples` once training ends.
///
/// # Errors
/// Returns [`NnError::NumericInstability`] on a non-finite gradient and
/// [`NnError::WorkerPanicked`] if a worker panics. The network keeps every
/// update applied before the failing step.
pub fn train_concurrent(
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

    let n = samples.len();
    let workers = match config.workers {
        0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        w => w,
    };
    let batch_size = match config.batch_size {
        0 => n,
        b => b.min(n),
    };
    let work_size = batch_size.div_ceil(workers);
    let sub_batches = batch_size.div_ceil(work_size);
    let steps_per_epoch = n.div_ceil(batch_size);
    let total_steps = config.epochs * steps_per_epoch;

    info!(
        epochs = config.epochs,
        samples = n,
        batch_size,
        workers,
        steps = total_steps,
        learning_rate = config.learning_rate,
        decay = config.decay,
        "starting concurrent training"
    );

    let sgd = config.optimizer();
    let progress = Progress::new(config);
    let mut rng = make_rng(config.seed);
    let mut shared = Arc::new(network.clone());

    let outcome = thread::scope(|scope| -> NnResult<()> {
        // Capacity `workers` is never exceeded: a step sends at most
        // `sub_batches <= workers` items and expects as many results.
        let (work_tx, work_rx) = channel::bounded::<WorkItem>(workers);
        let (grad_tx, grad_rx) = channel::bounded::<PartialGradient>(workers);
        for id in 0..workers {
            let work_rx = work_rx.clone();
            let grad_tx = grad_tx.clone();
            scope.spawn(move || backprop_worker(id, work_rx, grad_tx));
        }
        drop(work_rx);
        drop(grad_tx);

        for step in 0..total_steps {
            if progress.stop_requested() {
                info!(step, "stop requested");
                break;
            }

            let epoch = step / steps_per_epoch;
            let batch = random_subset(samples, batch_size, &mut rng);
            for chunk in batch.chunks(work_size) {
                let item = WorkItem {
                    network: Arc::clone(&shared),
                    samples: chunk.to_vec(),
                };
                work_tx
                    .send(item)
                    .map_err(|_| NnError::WorkerPanicked("every worker has exited".into()))?;
            }

            let mut gradient = shared.zero_gradient();
            for _ in 0..sub_batches {
                let partial = grad_rx
                    .recv()
                    .map_err(|_| NnError::WorkerPanicked("every worker has exited".into()))??;
                gradient.add(&partial);
            }
            gradient.scale(1.0 / batch.len() as f64);

            // Every worker dropped its snapshot before sending its result,
            // so this does not copy.
            let learning_rate = sgd.step(Arc::make_mut(&mut shared), &gradient, epoch);
            debug!(step, epoch, learning_rate, sub_batches, "applied batch gradient");

            let last_step_of_epoch = (step + 1) % steps_per_epoch == 0;
            if last_step_of_epoch && progress.is_due(epoch) {
                let batch_loss =
                    batch.iter().map(|s| shared.loss(s)).sum::<f64>() / batch.len() as f64;
                if !progress.report(epoch, learning_rate, batch_loss) {
                    info!(epoch, "progress receiver dropped, stopping");
                    break;
                }
            }
        }
        Ok(())
    });

    *network = Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone());
    outcome?;

    let loss = network.average_loss(samples);
    info!(loss, "training finished");
    Ok(loss)
}

fn backprop_worker(id: usize, work_rx: Receiver<WorkItem<'_>>, grad_tx: Sender<PartialGradient>) {
    for WorkItem { network, samples } in work_rx.iter() {
        let partial = panic::catch_unwind(AssertUnwindSafe(|| {
            network.batch_gradient(samples.iter().copied())
        }))
        .unwrap_or_else(|payload| {
            Err(NnError::WorkerPanicked(format!(
                "worker {id}: {}",
                panic_message(payload.as_ref())
            )))
        });
        drop(network);

        if grad_tx.send(partial).is_err() {
            break;
        }
    }
    debug!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
