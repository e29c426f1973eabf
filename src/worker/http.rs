//! HTTP client that streams remote resources to local files

use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("response exceeds the size limit of {0} bytes")]
    TooLarge(u64),

    #[error("file write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP fetch configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    /// Upper bound on the whole transfer; exceeding it is a failure, not a
    /// hang.
    pub request_timeout: Duration,
    pub max_file_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            max_file_bytes: 500 * 1024 * 1024,
            user_agent: "vidgrab/0.1.0".to_string(),
        }
    }
}

/// Streaming downloader
pub struct FetchClient {
    client: Client,
    max_file_bytes: u64,
}

impl FetchClient {
    /// Create a new fetch client
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            max_file_bytes: config.max_file_bytes,
        })
    }

    /// Stream a resource to `dest`, returning the byte count written.
    ///
    /// The body is written chunk by chunk, never buffered whole in memory.
    /// The size cap is enforced twice: up front against `Content-Length`
    /// when the server sends one, and again while streaming for servers
    /// that lie or omit it. On any error the partial file is left for the
    /// caller to clean up, since only the caller knows the job context.
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(url, "Starting download");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(announced) = response.content_length() {
            if announced > self.max_file_bytes {
                return Err(FetchError::TooLarge(self.max_file_bytes));
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify_transport_error)?;
            written += chunk.len() as u64;
            if written > self.max_file_bytes {
                return Err(FetchError::TooLarge(self.max_file_bytes));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        debug!(url, size = written, "Download completed");
        Ok(written)
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.max_file_bytes, 500 * 1024 * 1024);
        assert_eq!(config.user_agent, "vidgrab/0.1.0");
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        assert_eq!(
            FetchError::HttpStatus(404).to_string(),
            "server returned HTTP 404"
        );
        assert_eq!(
            FetchError::TooLarge(1024).to_string(),
            "response exceeds the size limit of 1024 bytes"
        );
    }
}
