use crate::store::StoreError;
use aivis_core::AivisError;
use aivis_engines::{EngineError, EngineErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("scan store error: {0}")]
    Store(#[from] StoreError),
}

impl ScanError {
    /// Whether the job runner should try the scan again after a backoff.
    ///
    /// Expired credentials and bad requests fail the same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidRequest(_) => false,
            Self::Engine(e) => matches!(
                e.kind(),
                EngineErrorKind::TransientNetwork | EngineErrorKind::ResourceExhausted
            ),
            Self::Store(e) => e.is_transient(),
        }
    }
}

impl From<ScanError> for AivisError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidRequest(msg) => AivisError::Validation(msg),
            ScanError::Engine(e) => e.into(),
            ScanError::Store(e) if e.is_transient() => AivisError::TransientNetwork(e.to_string()),
            ScanError::Store(e) => AivisError::Internal(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
