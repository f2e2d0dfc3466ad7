//! Per-prompt scan results shared by the analysis and scanner crates.

use crate::types::{Engine, MentionType};
use serde::{Deserialize, Serialize};

/// Outcome of one engine for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    /// Engine that produced the response
    pub engine: Engine,
    /// Raw response text, or `Error: <msg>` when the engine failed
    pub response_text: String,
    /// Screenshot file name in the screenshot directory
    pub screenshot_ref: Option<String>,
    /// Client visibility classification
    pub mention_type: MentionType,
    /// Position of the client in a numbered list, if any
    pub ranking_position: Option<u32>,
    /// Sentiment toward the client in `[0, 1]`
    pub sentiment_score: f64,
    /// Known competitors present in the response
    pub competitors_mentioned: Vec<String>,
    /// Plausible competitor names not in the known list
    pub new_competitors_found: Vec<String>,
    /// Failure message when the engine could not be scanned
    pub error: Option<String>,
}

impl EngineResult {
    /// Degraded result recorded when an engine fails.
    #[must_use]
    pub fn failed(engine: Engine, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            engine,
            response_text: format!("Error: {message}"),
            screenshot_ref: None,
            mention_type: MentionType::NotFound,
            ranking_position: None,
            sentiment_score: 0.0,
            competitors_mentioned: Vec::new(),
            new_competitors_found: Vec::new(),
            error: Some(message),
        }
    }

    /// Whether the engine call failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// All engine outcomes for one prompt, in engine enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResult {
    /// Prompt text as scanned
    pub prompt: String,
    /// One entry per engine
    pub engine_results: Vec<EngineResult>,
}
