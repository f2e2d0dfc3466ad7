//! The uniform adapter contract every answer surface implements.

use crate::error::Result;
use aivis_core::{Credential, Engine};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw answer captured from one surface for one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResponse {
    /// Plain answer text handed to the analysis pipeline
    pub response_text: String,
    /// Screenshot filename inside the screenshot directory
    pub screenshot_ref: Option<String>,
}

impl EngineResponse {
    /// A response with no screenshot.
    #[must_use]
    pub fn text(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            screenshot_ref: None,
        }
    }
}

/// One AI answer surface.
///
/// Implementations must return an error rather than panic when the surface
/// cannot be reached, redirects to a login page, or rejects the request;
/// the orchestrator turns those errors into degraded results.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Which surface this adapter queries.
    fn engine(&self) -> Engine;

    /// Ask `prompt` and capture the answer.
    ///
    /// `credential` is the per-user session token or API key for this
    /// surface; adapters fall back to simulated output or a configured key
    /// when it is absent.
    async fn scan(&self, prompt: &str, credential: Option<&Credential>) -> Result<EngineResponse>;
}
