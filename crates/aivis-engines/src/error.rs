//! Error types for engine adapters.

use aivis_browser::BrowserError;
use aivis_core::{AivisError, Engine};
use thiserror::Error;

/// Errors raised while querying an answer surface.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Stored session or API key rejected by the surface
    #[error("authentication expired for {engine}: {message}")]
    AuthExpired {
        /// Engine that rejected the credential
        engine: Engine,
        /// Error message
        message: String,
    },

    /// Upstream asked us to slow down
    #[error("rate limit exceeded for {engine}: {message}")]
    RateLimited {
        /// Engine that throttled the request
        engine: Engine,
        /// Error message
        message: String,
    },

    /// Non-success HTTP status from an upstream API
    #[error("{message}")]
    Api {
        /// Engine whose API failed
        engine: Engine,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Upstream returned content that could not be used
    #[error("unusable response from {engine}: {message}")]
    ScrapeParse {
        /// Engine whose payload was rejected
        engine: Engine,
        /// Error message
        message: String,
    },

    /// Browser automation failure
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Screenshot storage failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Adapter misconfiguration
    #[error("engine configuration error: {0}")]
    Config(String),
}

/// Coarse classification used by retry and reporting logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Worth retrying with backoff
    TransientNetwork,
    /// Needs the user to reconnect or replace a key
    AuthExpired,
    /// Shared automation resources stayed saturated
    ResourceExhausted,
    /// Remote payload was unusable
    ScrapeParse,
    /// Anything else
    Other,
}

impl EngineError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            Self::AuthExpired { .. } => EngineErrorKind::AuthExpired,
            Self::RateLimited { .. } | Self::Network(_) => EngineErrorKind::TransientNetwork,
            Self::Api { status, .. } if *status >= 500 => EngineErrorKind::TransientNetwork,
            Self::ScrapeParse { .. } => EngineErrorKind::ScrapeParse,
            Self::Browser(BrowserError::PoolExhausted(_)) => EngineErrorKind::ResourceExhausted,
            Self::Browser(BrowserError::NavigationError(_) | BrowserError::Timeout(_)) => {
                EngineErrorKind::TransientNetwork
            }
            _ => EngineErrorKind::Other,
        }
    }
}

impl From<EngineError> for AivisError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err.kind() {
            EngineErrorKind::TransientNetwork => AivisError::TransientNetwork(message),
            EngineErrorKind::AuthExpired => AivisError::AuthExpired(message),
            EngineErrorKind::ResourceExhausted => AivisError::ResourceExhausted(message),
            EngineErrorKind::ScrapeParse => AivisError::ScrapeParse(message),
            EngineErrorKind::Other => match err {
                EngineError::Browser(e) => e.into(),
                EngineError::Io(e) => AivisError::Io(e),
                EngineError::Config(msg) => AivisError::Validation(msg),
                other => AivisError::Internal(other.to_string()),
            },
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_classification() {
        let err = EngineError::AuthExpired {
            engine: Engine::GoogleAio,
            message: "Invalid SERP API key".to_string(),
        };
        assert_eq!(err.kind(), EngineErrorKind::AuthExpired);

        let err = EngineError::RateLimited {
            engine: Engine::GoogleAio,
            message: "SERP API rate limit exceeded".to_string(),
        };
        assert_eq!(err.kind(), EngineErrorKind::TransientNetwork);

        let err = EngineError::Api {
            engine: Engine::Perplexity,
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.kind(), EngineErrorKind::Other);

        let err = EngineError::Api {
            engine: Engine::Perplexity,
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.kind(), EngineErrorKind::TransientNetwork);

        let err: EngineError = BrowserError::PoolExhausted(Duration::from_secs(1)).into();
        assert_eq!(err.kind(), EngineErrorKind::ResourceExhausted);
    }

    #[test]
    fn test_conversion_to_core_error() {
        let err: AivisError = EngineError::AuthExpired {
            engine: Engine::ChatGpt,
            message: "session expired".to_string(),
        }
        .into();
        assert!(matches!(err, AivisError::AuthExpired(_)));

        let err: AivisError = EngineError::ScrapeParse {
            engine: Engine::Perplexity,
            message: "Firecrawl failed: Unknown error".to_string(),
        }
        .into();
        assert!(matches!(err, AivisError::ScrapeParse(_)));

        let err: AivisError = EngineError::Browser(BrowserError::Disconnected).into();
        assert!(matches!(err, AivisError::Browser(_)));
    }

    #[test]
    fn test_api_error_displays_message_verbatim() {
        let err = EngineError::Api {
            engine: Engine::GoogleAio,
            status: 500,
            message: "SERP API error: 500".to_string(),
        };
        assert_eq!(err.to_string(), "SERP API error: 500");
    }
}
