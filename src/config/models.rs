use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ledger_path: default_ledger_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

/// Token issuance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Fixed token lifetime (default 20 minutes)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Signing secret (loaded from the JWT_SECRET environment variable,
    /// never from config files)
    #[serde(skip)]
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
            jwt_secret: None,
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    20 * 60
}

/// Download worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Root directory for downloaded files (one subdirectory per user)
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: ByteSize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a whole transfer
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Worker pool size; with `queue_depth` this caps concurrent downloads
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
            max_file_bytes: default_max_file_bytes(),
            connect_timeout_secs: default_connect_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            workers: default_workers(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_max_file_bytes() -> ByteSize {
    ByteSize(500 * 1024 * 1024) // 500 MB
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    "vidgrab/0.1.0".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_depth() -> usize {
    100
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Terminal jobs (and their files) older than this are pruned
    #[serde(default = "default_job_ttl_days")]
    pub job_ttl_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_ttl_days: default_job_ttl_days(),
        }
    }
}

fn default_job_ttl_days() -> u32 {
    30
}
