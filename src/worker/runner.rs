//! Job runner - drives one download job through its state machine
//!
//! `pending → downloading → {completed | failed}`. Exactly one worker
//! processes a given job, so transitions on a row are strictly ordered.
//! Nothing here ever propagates an error to the submission path: every
//! failure ends as a persisted `failed` row plus a log line.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::models::{DownloadJob, JobStatus};

use super::WorkerContext;
use super::http::Result as FetchResult;

/// Fallback extension when the URL path has none; this is a video service.
const DEFAULT_EXTENSION: &str = ".mp4";

/// Process a single download job to a terminal state.
pub async fn process_job(ctx: &WorkerContext, job_id: Uuid) {
    let mut job = match ctx.ledger.get_job(&job_id) {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(%job_id, "Envelope for unknown job, skipping");
            return;
        }
        Err(e) => {
            error!(%job_id, error = %e, "Failed to load job, skipping");
            return;
        }
    };

    // Guard against re-delivery: terminal rows stay terminal, and a row
    // another worker already picked up is not touched.
    if job.status != JobStatus::Pending {
        warn!(%job_id, status = ?job.status, "Job is not pending, skipping");
        return;
    }

    job.begin();
    if let Err(e) = ctx.ledger.upsert_job(&job) {
        error!(%job_id, error = %e, "Failed to persist downloading state");
        return;
    }

    let dest = destination_path(&ctx.download_dir, &job);

    match download(ctx, &job, &dest).await {
        Ok(file_size) => {
            job.complete(dest.to_string_lossy().into_owned(), file_size);
            info!(%job_id, file_size, path = %dest.display(), "Download completed");
            ctx.metrics.download_completed(file_size);
        }
        Err(e) => {
            remove_partial_file(&dest).await;
            job.fail(e.to_string());
            warn!(%job_id, url = %job.url, error = %e, "Download failed");
            ctx.metrics.download_failed();
        }
    }

    if let Err(e) = ctx.ledger.upsert_job(&job) {
        error!(%job_id, error = %e, "Failed to persist terminal state");
    }
}

async fn download(ctx: &WorkerContext, job: &DownloadJob, dest: &Path) -> FetchResult<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    ctx.fetcher.fetch_to_file(&job.url, dest).await
}

/// Destination: `{download_dir}/{user_id}/{job_id}{ext}`.
///
/// Job ids are UUIDv7 (time-prefixed, random tail), so the filename is
/// collision-resistant without a separate nonce.
fn destination_path(download_dir: &Path, job: &DownloadJob) -> PathBuf {
    let filename = format!("{}{}", job.id, url_extension(&job.url));
    download_dir.join(job.user_id.to_string()).join(filename)
}

/// Extension of the URL's path segment, including the dot.
fn url_extension(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let segment = parsed.path().rsplit('/').next()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return None;
            }
            Some(format!(".{}", ext.to_ascii_lowercase()))
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

async fn remove_partial_file(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => info!(path = %dest.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dest.display(), error = %e, "Failed to remove partial download"),
    }
}
