use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputValidationError {
    #[error("url is required")]
    MissingUrl,

    #[error("url is not a valid URL")]
    MalformedUrl,

    #[error("url scheme must be http or https")]
    UnsupportedScheme,

    #[error("username must be between {0} and {1} characters")]
    BadUsernameLength(usize, usize),

    #[error("username may only contain letters, digits, '_', '-' and '.'")]
    BadUsernameCharset,

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
}

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 64;
const PASSWORD_MIN: usize = 8;

/// Syntactic URL check for download submissions: it must parse and be
/// http(s). Reachability is the worker's problem, not the API's.
pub fn validate_download_url(url: &str) -> Result<(), InputValidationError> {
    if url.trim().is_empty() {
        return Err(InputValidationError::MissingUrl);
    }

    let parsed = reqwest::Url::parse(url).map_err(|_| InputValidationError::MalformedUrl)?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(InputValidationError::UnsupportedScheme),
    }
}

/// Registration credential rules.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), InputValidationError> {
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count()) {
        return Err(InputValidationError::BadUsernameLength(
            USERNAME_MIN,
            USERNAME_MAX,
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(InputValidationError::BadUsernameCharset);
    }

    if password.chars().count() < PASSWORD_MIN {
        return Err(InputValidationError::PasswordTooShort(PASSWORD_MIN));
    }

    Ok(())
}
