use aivis_core::AivisError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("invalid cookie: {0}")]
    Cookie(String),

    #[error("browser disconnected")]
    Disconnected,

    #[error("browser pool exhausted: no browser became available within {0:?}")]
    PoolExhausted(Duration),

    #[error("browser acquisition cancelled")]
    Cancelled,
}

impl BrowserError {
    pub(crate) fn chromium(err: impl std::fmt::Display) -> Self {
        Self::ChromiumError(err.to_string())
    }
}

impl From<BrowserError> for AivisError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::PoolExhausted(_) => AivisError::ResourceExhausted(err.to_string()),
            other => AivisError::Browser(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_pool_exhausted_maps_to_resource_exhausted() {
        let err: AivisError = BrowserError::PoolExhausted(Duration::from_secs(300)).into();
        assert!(matches!(err, AivisError::ResourceExhausted(_)));
        assert!(err.to_string().contains("300s"));

        let err: AivisError = BrowserError::Disconnected.into();
        assert!(matches!(err, AivisError::Browser(_)));
    }
}
