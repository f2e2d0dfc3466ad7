//! Aivis Analysis - deterministic classification of AI answer text.
//!
//! Pure functions that turn an engine response into structured visibility
//! signals for a tracked brand:
//!
//! - [`mention`] - Featured / mentioned / not found, plus list position
//! - [`competitor`] - Known competitor hits and plausible new competitors
//! - [`sentiment`] - Lexicon sentiment of brand-bearing sentences
//! - [`gap`] - Cross-prompt gap analysis and recommendations
//!
//! # Example
//!
//! ```rust
//! use aivis_analysis::detect_mention;
//! use aivis_core::MentionType;
//!
//! let result = detect_mention("Our **top pick** is Acme Co.", "Acme Co", None);
//! assert_eq!(result.mention_type, MentionType::Featured);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod competitor;
pub mod gap;
pub mod mention;
pub mod sentiment;
mod text;

use aivis_core::ClientProfile;
use serde::{Deserialize, Serialize};

pub use competitor::{track_competitors, CompetitorAnalysis};
pub use gap::{analyze_gaps, GapAnalysis, GapType};
pub use mention::{detect_mention, MentionAnalysis};
pub use sentiment::{analyze_sentiment, SentimentAnalysis, SentimentLabel};

/// All per-response signals for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub mention: MentionAnalysis,
    pub competitors: CompetitorAnalysis,
    pub sentiment: SentimentAnalysis,
}

/// Run mention detection, competitor tracking and sentiment over one response.
///
/// The client's own name is never reported as a new competitor.
#[must_use]
pub fn analyze_response(text: &str, client: &ClientProfile) -> ResponseAnalysis {
    let mut competitors = track_competitors(text, &client.competitors);
    let client_lower = client.name.trim().to_lowercase();
    if !client_lower.is_empty() {
        competitors.new_competitors.retain(|name| {
            let name = name.to_lowercase();
            !name.contains(&client_lower) && !client_lower.contains(&name)
        });
    }

    ResponseAnalysis {
        mention: detect_mention(text, &client.name, client.domain.as_deref()),
        competitors,
        sentiment: analyze_sentiment(text, &client.name),
    }
}
