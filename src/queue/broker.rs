use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// JobEnvelope carries a job id to a download worker. The ledger row is the
/// source of truth; the envelope is only the wake-up signal.
#[derive(Clone, Debug)]
pub struct JobEnvelope {
    pub job_id: Uuid,
}

/// JobBroker hands submitted jobs to the download worker pool
///
/// Architecture:
/// 1. The submission handler persists the `pending` row, then calls
///    `broker.dispatch(envelope)`
/// 2. Round-robin distribution across the worker pool
/// 3. Backpressure via bounded channels (depth from config)
///
/// The broker is NOT a separate task - it's just a struct with methods
/// called by API handlers. Distribution is synchronous via mpsc::send().
/// A job whose envelope is lost (worker channel closed) stays `pending` in
/// the ledger and is re-dispatched by the startup sweep.
pub struct JobBroker {
    worker_channels: Vec<mpsc::Sender<JobEnvelope>>,
    next_worker: AtomicUsize,
}

impl JobBroker {
    /// Create a new JobBroker with worker channels
    ///
    /// Returns:
    /// - JobBroker instance (to be passed to API via Arc)
    /// - Vec of receivers (one per worker, for spawning workers)
    pub fn new(
        num_workers: usize,
        channel_size: usize,
    ) -> (Self, Vec<mpsc::Receiver<JobEnvelope>>) {
        info!(num_workers, channel_size, "Creating JobBroker");

        let mut worker_channels = Vec::with_capacity(num_workers);
        let mut worker_receivers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(channel_size);
            worker_channels.push(tx);
            worker_receivers.push(rx);
            debug!(worker_id, "Created worker channel");
        }

        let broker = Self {
            worker_channels,
            next_worker: AtomicUsize::new(0),
        };

        (broker, worker_receivers)
    }

    /// Dispatch a job to the next worker (round-robin).
    ///
    /// Awaits channel capacity when the target worker's queue is full;
    /// that bounded wait is the only admission control on submissions.
    pub async fn dispatch(&self, envelope: JobEnvelope) {
        let worker_idx =
            self.next_worker.fetch_add(1, Ordering::Relaxed) % self.worker_channels.len();
        let job_id = envelope.job_id;

        match self.worker_channels[worker_idx].send(envelope).await {
            Ok(()) => debug!(%job_id, worker_idx, "Job dispatched to worker"),
            Err(_) => {
                // Row is already persisted as pending; the startup sweep
                // re-dispatches it.
                warn!(%job_id, worker_idx, "Worker channel closed, job not delivered");
            }
        }
    }

    /// Get number of active workers
    pub fn num_workers(&self) -> usize {
        self.worker_channels.len()
    }

    /// Check if all worker channels are healthy (not closed)
    pub fn health_check(&self) -> bool {
        self.worker_channels.iter().all(|ch| !ch.is_closed())
    }
}
