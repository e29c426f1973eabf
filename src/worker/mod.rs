//! Download worker pool
//!
//! Workers receive job envelopes from the broker's mpsc channels, stream
//! the remote resource to per-user local storage, and advance the job's
//! state machine in the ledger. The pool size and channel depth come from
//! `[download]` config; together they bound concurrent downloads.

pub mod http;
pub mod runner;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ledger::Ledger;
use crate::observability::Metrics;
use crate::queue::JobEnvelope;

pub use http::{FetchClient, FetchConfig, FetchError};

/// Everything a worker needs to run jobs.
#[derive(Clone)]
pub struct WorkerContext {
    pub ledger: Arc<Ledger>,
    pub fetcher: Arc<FetchClient>,
    pub download_dir: PathBuf,
    pub metrics: Arc<Metrics>,
}

/// Spawn one task per receiver; each drains its channel until the broker
/// side is dropped.
pub fn spawn_workers(
    receivers: Vec<mpsc::Receiver<JobEnvelope>>,
    ctx: WorkerContext,
) -> Vec<JoinHandle<()>> {
    receivers
        .into_iter()
        .enumerate()
        .map(|(worker_id, mut rx)| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                info!(worker_id, "Download worker started");
                while let Some(envelope) = rx.recv().await {
                    runner::process_job(&ctx, envelope.job_id).await;
                }
                info!(worker_id, "Download worker stopped");
            })
        })
        .collect()
}
