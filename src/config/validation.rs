use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("JWT_SECRET must be set in the environment")]
    MissingJwtSecret,

    #[error("download.workers must be at least 1")]
    NoWorkers,

    #[error("download.queue_depth must be at least 1")]
    ZeroQueueDepth,

    #[error("download.max_file_bytes must be greater than zero")]
    ZeroSizeCap,

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,

    #[error("retention.job_ttl_days must be greater than zero")]
    ZeroJobTtl,
}

/// Reject configurations the server cannot run with.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config
        .auth
        .jwt_secret
        .as_deref()
        .is_none_or(|secret| secret.is_empty())
    {
        return Err(ValidationError::MissingJwtSecret);
    }

    if config.auth.token_ttl_secs == 0 {
        return Err(ValidationError::ZeroTokenTtl);
    }

    if config.download.workers == 0 {
        return Err(ValidationError::NoWorkers);
    }

    if config.download.queue_depth == 0 {
        return Err(ValidationError::ZeroQueueDepth);
    }

    if config.download.max_file_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroSizeCap);
    }

    if config.retention.job_ttl_days == 0 {
        return Err(ValidationError::ZeroJobTtl);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config {
            server: Default::default(),
            auth: Default::default(),
            download: Default::default(),
            retention: Default::default(),
        };
        config.auth.jwt_secret = Some("test-secret".to_string());
        config
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_missing_secret() {
        let mut config = valid_config();
        config.auth.jwt_secret = None;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingJwtSecret)
        ));

        config.auth.jwt_secret = Some(String::new());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingJwtSecret)
        ));
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = valid_config();
        config.download.workers = 0;
        assert!(matches!(validate(&config), Err(ValidationError::NoWorkers)));
    }

    #[test]
    fn rejects_zero_size_cap() {
        let mut config = valid_config();
        config.download.max_file_bytes = crate::humanize::ByteSize(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroSizeCap)
        ));
    }
}
