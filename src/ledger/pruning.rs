/// Retention policy: terminal jobs older than the configured TTL are
/// removed together with their ownership index entries and any downloaded
/// file still on disk. Non-terminal rows are never pruned.
use chrono::{Duration, Utc};
use fjall::PartitionHandle;
use tracing::{info, warn};

use crate::api::models::{DownloadJob, JobStatus};

use super::error::Result;
use super::partitions::{encode_meta_key, encode_user_job_key};

/// Metadata key recording the last prune run (unix seconds)
const META_LAST_PRUNE: &str = "last_prune";

/// Pruning statistics
#[derive(Debug, Default)]
pub struct PruneStats {
    pub jobs_pruned: usize,
    pub files_removed: usize,
}

/// Prune expired terminal jobs from the jobs partition
pub fn prune_expired(
    jobs: &PartitionHandle,
    user_jobs: &PartitionHandle,
    metadata: &PartitionHandle,
    job_ttl_days: u32,
) -> Result<PruneStats> {
    let cutoff = Utc::now() - Duration::days(i64::from(job_ttl_days));
    let mut stats = PruneStats::default();

    // Collect first: removing while iterating an LSM range is asking for
    // trouble.
    let mut expired: Vec<DownloadJob> = Vec::new();
    for item in jobs.iter() {
        let (_, value) = item?;
        let job: DownloadJob = match serde_json::from_slice(&value) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable job row during prune");
                continue;
            }
        };
        if job.status.is_terminal() && job.updated_at < cutoff {
            expired.push(job);
        }
    }

    for job in &expired {
        jobs.remove(super::partitions::encode_job_key(&job.id))?;
        user_jobs.remove(encode_user_job_key(&job.user_id, &job.id))?;
        stats.jobs_pruned += 1;

        if job.status == JobStatus::Completed {
            if let Some(path) = &job.file_path {
                match std::fs::remove_file(path) {
                    Ok(()) => stats.files_removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %path, error = %e, "Failed to remove pruned download"),
                }
            }
        }
    }

    metadata.insert(
        encode_meta_key(META_LAST_PRUNE),
        Utc::now().timestamp().to_string().as_bytes(),
    )?;

    info!(
        jobs_pruned = stats.jobs_pruned,
        files_removed = stats.files_removed,
        "Pruning complete"
    );
    Ok(stats)
}
