//! Error types for the o365cal application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.
//! Every message is a single line the user can act on.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set. Export it in your shell or add it to a .env file, e.g. export {0}='<value>'")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Could not start device sign-in: {0}")]
    InitFailed(String),

    #[error("Timed out waiting for authorization. Run `o365cal auth` again.")]
    Timeout,

    #[error("Authorization was rejected: {0}")]
    Rejected(String),

    /// Refresh could not produce a new token. Soft: callers fall back to [`AuthError::Required`].
    #[error("Token refresh unavailable: {0}")]
    RefreshUnavailable(String),

    #[error("Authentication required. Run: o365cal auth")]
    Required,

    #[error("Failed to save token")]
    Storage(#[from] StoreError),
}

/// Token file errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize token")]
    Serialize(#[from] serde_json::Error),
}

/// API-related errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired. Run: o365cal auth")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,
}

/// Date/time values from Graph that could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing date/time value")]
    Empty,

    #[error("Invalid date/time '{0}'")]
    InvalidDateTime(String),

    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),
}

impl AuthError {
    /// Returns true if the user can recover by running `auth` again.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Required | Self::RefreshUnavailable(_)
        )
    }
}
