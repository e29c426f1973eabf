//! API models for the vidgrab auth and download endpoints.
//!
//! The core data structures of the external contract:
//! - `POST /auth/register` and `POST /auth/login` accept credential payloads
//!   and return an [`AuthResponse`] (profile + bearer token)
//! - `POST /downloads` accepts a [`SubmitDownloadRequest`] and returns the
//!   freshly created [`DownloadJob`] snapshot (always `pending`)
//! - `GET /downloads` returns a paginated [`JobListResponse`]
//!
//! [`DownloadJob`] doubles as the persisted ledger record; the state machine
//! lives on it as methods so every transition goes through one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identity record as persisted in the ledger.
///
/// `password_hash` never leaves the process: handlers convert to
/// [`UserProfile`] before serializing a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public view of a [`User`] with secret fields stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states absorb: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One asynchronous download request and its lifecycle record.
///
/// Created `pending` by the submission handler, then mutated only by the
/// download worker: `pending → downloading → {completed | failed}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadJob {
    /// New `pending` job. Ids are UUIDv7, so they sort by creation time and
    /// carry enough randomness to double as collision-resistant filenames.
    pub fn new(user_id: Uuid, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            url,
            status: JobStatus::Pending,
            file_path: None,
            file_size: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn begin(&mut self) {
        self.status = JobStatus::Downloading;
        self.touch();
    }

    pub fn complete(&mut self, file_path: String, file_size: u64) {
        self.status = JobStatus::Completed;
        self.file_path = Some(file_path);
        self.file_size = Some(file_size);
        self.touch();
    }

    pub fn fail(&mut self, message: String) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDownloadRequest {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub data: Vec<DownloadJob>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub message: String,
    /// Seconds until the presented token expires.
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
