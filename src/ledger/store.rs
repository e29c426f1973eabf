use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::models::{DownloadJob, JobStatus, User};

use super::error::{LedgerError, Result};
use super::partitions::{
    decode_job_key, encode_job_key, encode_user_job_key, encode_user_job_prefix, encode_user_key,
    encode_username_key,
};
use super::pruning::{PruneStats, prune_expired};

/// Fjall-backed persistent storage for identities and download jobs
#[derive(Clone)]
pub struct Ledger {
    keyspace: Keyspace,
    users: PartitionHandle,
    usernames: PartitionHandle,
    jobs: PartitionHandle,
    user_jobs: PartitionHandle,
    metadata: PartitionHandle,
}

/// Jobs found in non-terminal states when the process starts.
#[derive(Debug, Default)]
pub struct RecoveredJobs {
    /// Still `pending`: never picked up, safe to dispatch again.
    pub requeue: Vec<DownloadJob>,
    /// Were `downloading` when the process died; now marked `failed`.
    pub interrupted: usize,
}

impl Ledger {
    /// Open or create a ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ledger at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let users = keyspace.open_partition("users", PartitionCreateOptions::default())?;
        let usernames = keyspace.open_partition("usernames", PartitionCreateOptions::default())?;
        let jobs = keyspace.open_partition("jobs", PartitionCreateOptions::default())?;
        let user_jobs = keyspace.open_partition("user_jobs", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        info!("Ledger opened successfully");
        Ok(Self {
            keyspace,
            users,
            usernames,
            jobs,
            user_jobs,
            metadata,
        })
    }

    /// Store a new user and its username index entry
    pub fn create_user(&self, user: &User) -> Result<()> {
        let value = serde_json::to_vec(user)?;
        self.users.insert(encode_user_key(&user.id), value)?;
        self.usernames.insert(
            encode_username_key(&user.username),
            user.id.to_string().as_bytes(),
        )?;
        debug!(user_id = %user.id, username = %user.username, "Created user");
        Ok(())
    }

    /// Get a user by id
    pub fn get_user(&self, user_id: &Uuid) -> Result<Option<User>> {
        match self.users.get(encode_user_key(user_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Get a user by username via the index
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(id_bytes) = self.usernames.get(encode_username_key(username))? else {
            return Ok(None);
        };
        let id_str = std::str::from_utf8(&id_bytes)
            .map_err(|_| LedgerError::InvalidKey(username.to_string()))?;
        let user_id: Uuid = id_str
            .parse()
            .map_err(|_| LedgerError::InvalidKey(id_str.to_string()))?;
        self.get_user(&user_id)
    }

    /// Check whether a username is already taken
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.usernames.contains_key(encode_username_key(username))?)
    }

    /// Store or update a download job and its ownership index entry
    pub fn upsert_job(&self, job: &DownloadJob) -> Result<()> {
        let value = serde_json::to_vec(job)?;
        self.jobs.insert(encode_job_key(&job.id), value)?;
        self.user_jobs
            .insert(encode_user_job_key(&job.user_id, &job.id), "")?;
        debug!(job_id = %job.id, status = ?job.status, "Upserted job");
        Ok(())
    }

    /// Get a download job by id
    pub fn get_job(&self, job_id: &Uuid) -> Result<Option<DownloadJob>> {
        match self.jobs.get(encode_job_key(job_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// List a user's jobs newest-first.
    ///
    /// UUIDv7 job ids make the ownership index time-ordered under each user
    /// prefix, so a reverse scan gives creation-descending order directly.
    pub fn jobs_for_user(
        &self,
        user_id: &Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DownloadJob>> {
        let prefix = encode_user_job_prefix(user_id);
        let mut out = Vec::with_capacity(limit);

        for item in self.user_jobs.prefix(prefix).rev().skip(offset).take(limit) {
            let (key, _) = item?;
            let Some((_, job_id)) = super::partitions::decode_user_job_key(&key) else {
                warn!("Skipping malformed ownership index key");
                continue;
            };
            if let Some(job) = self.get_job(&job_id)? {
                out.push(job);
            }
        }

        Ok(out)
    }

    /// Reconcile job state after a restart.
    ///
    /// Rows stuck in `downloading` belonged to a worker that died mid-fetch:
    /// they are failed with an explanatory message. Rows still `pending`
    /// never reached a worker and are returned for re-dispatch.
    pub fn sweep_incomplete(&self) -> Result<RecoveredJobs> {
        let mut recovered = RecoveredJobs::default();

        for item in self.jobs.iter() {
            let (key, value) = item?;
            if decode_job_key(&key).is_none() {
                continue;
            }
            let mut job: DownloadJob = serde_json::from_slice(&value)?;
            match job.status {
                JobStatus::Pending => recovered.requeue.push(job),
                JobStatus::Downloading => {
                    job.fail("download interrupted by service restart".to_string());
                    self.upsert_job(&job)?;
                    recovered.interrupted += 1;
                }
                _ => {}
            }
        }

        if recovered.interrupted > 0 || !recovered.requeue.is_empty() {
            info!(
                requeued = recovered.requeue.len(),
                interrupted = recovered.interrupted,
                "Recovered unfinished jobs"
            );
        }
        Ok(recovered)
    }

    /// Prune terminal jobs older than the retention window
    pub fn prune_expired(&self, job_ttl_days: u32) -> Result<PruneStats> {
        let stats = prune_expired(&self.jobs, &self.user_jobs, &self.metadata, job_ttl_days)?;
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(stats)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut user_count = 0;
        let mut job_count = 0;

        for item in self.users.iter() {
            item?;
            user_count += 1;
        }

        for item in self.jobs.iter() {
            item?;
            job_count += 1;
        }

        Ok(StoreStats {
            user_count,
            job_count,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub user_count: usize,
    pub job_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_ledger() -> (Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::open(temp_dir.path().join("test_ledger")).unwrap();
        (ledger, temp_dir)
    }

    fn sample_user(username: &str) -> User {
        User::new(username.to_string(), "$2b$12$notarealhash".to_string())
    }

    fn sample_job(user_id: Uuid) -> DownloadJob {
        DownloadJob::new(user_id, "https://example.com/video.mp4".to_string())
    }

    #[test]
    fn test_create_and_get_user() {
        let (ledger, _temp) = create_test_ledger();
        let user = sample_user("alice");
        ledger.create_user(&user).unwrap();

        let by_id = ledger.get_user(&user.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_name = ledger.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[test]
    fn test_username_exists() {
        let (ledger, _temp) = create_test_ledger();
        assert!(!ledger.username_exists("bob").unwrap());
        ledger.create_user(&sample_user("bob")).unwrap();
        assert!(ledger.username_exists("bob").unwrap());
    }

    #[test]
    fn test_upsert_and_get_job() {
        let (ledger, _temp) = create_test_ledger();
        let job = sample_job(Uuid::new_v4());
        ledger.upsert_job(&job).unwrap();

        let retrieved = ledger.get_job(&job.id).unwrap().unwrap();
        assert_eq!(retrieved.id, job.id);
        assert_eq!(retrieved.status, JobStatus::Pending);
    }

    #[test]
    fn test_get_nonexistent_job() {
        let (ledger, _temp) = create_test_ledger();
        assert!(ledger.get_job(&Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn test_jobs_for_user_is_scoped_and_newest_first() {
        let (ledger, _temp) = create_test_ledger();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = sample_job(alice);
        let second = sample_job(alice);
        let other = sample_job(bob);
        ledger.upsert_job(&first).unwrap();
        ledger.upsert_job(&second).unwrap();
        ledger.upsert_job(&other).unwrap();

        let listed = ledger.jobs_for_user(&alice, 10, 0).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn test_jobs_for_user_pagination() {
        let (ledger, _temp) = create_test_ledger();
        let user = Uuid::new_v4();
        let jobs: Vec<_> = (0..5)
            .map(|_| {
                let job = sample_job(user);
                ledger.upsert_job(&job).unwrap();
                job
            })
            .collect();

        let page = ledger.jobs_for_user(&user, 2, 1).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, jobs[3].id);
        assert_eq!(page[1].id, jobs[2].id);
    }

    #[test]
    fn test_sweep_incomplete() {
        let (ledger, _temp) = create_test_ledger();
        let user = Uuid::new_v4();

        let pending = sample_job(user);
        ledger.upsert_job(&pending).unwrap();

        let mut downloading = sample_job(user);
        downloading.begin();
        ledger.upsert_job(&downloading).unwrap();

        let mut done = sample_job(user);
        done.begin();
        done.complete("downloads/x.mp4".into(), 10);
        ledger.upsert_job(&done).unwrap();

        let recovered = ledger.sweep_incomplete().unwrap();
        assert_eq!(recovered.requeue.len(), 1);
        assert_eq!(recovered.requeue[0].id, pending.id);
        assert_eq!(recovered.interrupted, 1);

        let failed = ledger.get_job(&downloading.id).unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error_message.is_some());

        // Terminal rows are untouched
        let untouched = ledger.get_job(&done.id).unwrap().unwrap();
        assert_eq!(untouched.status, JobStatus::Completed);
    }

    #[test]
    fn test_stats() {
        let (ledger, _temp) = create_test_ledger();
        ledger.create_user(&sample_user("carol")).unwrap();
        ledger.upsert_job(&sample_job(Uuid::new_v4())).unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.user_count, 1);
        assert_eq!(stats.job_count, 1);
    }

    #[test]
    fn test_persist() {
        let (ledger, _temp) = create_test_ledger();
        ledger.upsert_job(&sample_job(Uuid::new_v4())).unwrap();
        ledger.persist().unwrap();
    }
}
