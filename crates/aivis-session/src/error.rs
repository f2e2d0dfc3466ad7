//! Error types for session capture and validation.

use aivis_browser::BrowserError;
use aivis_core::AivisError;
use thiserror::Error;

/// Errors raised by session capture and token validation.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Platform name not recognized
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// No login session open for this user and platform
    #[error("no active login session")]
    NoSession,

    /// Login finished but nothing credential-like was found
    #[error("{0}")]
    CaptureFailed(String),

    /// Browser automation failure
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Token status persistence failure
    #[error("token status store error: {0}")]
    Store(String),
}

impl From<SessionError> for AivisError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Browser(e) => e.into(),
            SessionError::UnknownPlatform(_) => AivisError::Validation(err.to_string()),
            SessionError::CaptureFailed(_) => AivisError::AuthExpired(err.to_string()),
            other => AivisError::Internal(other.to_string()),
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        let err: AivisError = SessionError::UnknownPlatform("bard".to_string()).into();
        assert!(matches!(err, AivisError::Validation(_)));
        assert!(err.to_string().contains("bard"));

        let err: AivisError = SessionError::NoSession.into();
        assert!(matches!(err, AivisError::Internal(_)));
    }
}
