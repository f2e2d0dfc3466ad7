//! Keyword discovery: find the prompts a brand already shows up for.
//!
//! Discovery generates prompts from an industry and its services, asks a
//! single engine each of them and sorts the answers into featured,
//! mentioned, not-found and failed buckets.

use crate::error::{Result, ScanError};
use crate::orchestrator::{EngineAdapters, ScanPacing};
use crate::progress::{emit, ProgressSink};
use crate::prompts::generate_from_templates;
use aivis_analysis::detect_mention;
use aivis_core::{ClientProfile, Engine, MentionType, ScanCredentials};
use serde::{Deserialize, Serialize};

/// Pause between discovery prompts.
const DISCOVERY_DELAY_MIN_MS: u64 = 2_000;
const DISCOVERY_DELAY_MAX_MS: u64 = 4_000;

/// Progress after prompt generation; scans spread over the next 80 points.
const SCANS_START_PERCENT: usize = 15;
const SCANS_PERCENT: usize = 80;

/// How many prompts a discovery run asks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryDepth {
    Quick,
    #[default]
    Standard,
    Thorough,
}

impl DiscoveryDepth {
    /// Number of prompts generated for this depth.
    #[must_use]
    pub fn prompt_count(self) -> usize {
        match self {
            DiscoveryDepth::Quick => 10,
            DiscoveryDepth::Standard => 25,
            DiscoveryDepth::Thorough => 50,
        }
    }
}

/// Inputs for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    /// Brand being looked for
    pub client: ClientProfile,
    /// Industry or niche, used as the keyword when no services are given
    pub industry: String,
    /// Primary services, one keyword each
    pub services: Vec<String>,
    /// City or region for location-aware prompts
    pub location: Option<String>,
    pub depth: DiscoveryDepth,
    /// The single engine every prompt is asked of
    pub engine: Engine,
    pub credentials: ScanCredentials,
}

/// A prompt whose answer named the brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredPrompt {
    pub prompt: String,
    pub mention_type: MentionType,
    pub position: Option<u32>,
    pub engine: Engine,
}

/// A prompt whose answer did not name the brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedPrompt {
    pub prompt: String,
    pub engine: Engine,
}

/// A prompt the engine failed to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPrompt {
    pub prompt: String,
    pub error: String,
}

/// Counts over a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    pub total_scanned: usize,
    pub successful_scans: usize,
    pub featured_count: usize,
    pub mentioned_count: usize,
    pub not_found_count: usize,
    pub error_count: usize,
    /// Percent of successful scans where the brand was visible
    pub visibility_rate: u32,
}

/// Result of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub summary: DiscoverySummary,
    pub featured: Vec<DiscoveredPrompt>,
    pub mentioned: Vec<DiscoveredPrompt>,
    pub not_found: Vec<MissedPrompt>,
    pub errors: Vec<FailedPrompt>,
    /// Every prompt asked, in order
    pub prompts: Vec<String>,
    pub depth: DiscoveryDepth,
    pub engine: Engine,
}

impl DiscoveryReport {
    fn new(request: &DiscoveryRequest, prompts: Vec<String>) -> Self {
        Self {
            summary: DiscoverySummary::default(),
            featured: Vec::new(),
            mentioned: Vec::new(),
            not_found: Vec::new(),
            errors: Vec::new(),
            prompts,
            depth: request.depth,
            engine: request.engine,
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn summarize(&mut self) {
        let successful = self.featured.len() + self.mentioned.len() + self.not_found.len();
        let visible = self.featured.len() + self.mentioned.len();
        let visibility_rate = if successful == 0 {
            0
        } else {
            (visible as f64 / successful as f64 * 100.0).round() as u32
        };

        self.summary = DiscoverySummary {
            total_scanned: successful + self.errors.len(),
            successful_scans: successful,
            featured_count: self.featured.len(),
            mentioned_count: self.mentioned.len(),
            not_found_count: self.not_found.len(),
            error_count: self.errors.len(),
            visibility_rate,
        };
    }
}

/// Runs discovery prompts against one engine.
pub struct KeywordDiscovery {
    adapters: EngineAdapters,
    pacing: ScanPacing,
}

impl KeywordDiscovery {
    /// Create a discovery runner with a 2-4 second pause between prompts.
    #[must_use]
    pub fn new(adapters: EngineAdapters) -> Self {
        Self {
            adapters,
            pacing: ScanPacing {
                stagger_engines: false,
                prompt_delay_min_ms: DISCOVERY_DELAY_MIN_MS,
                prompt_delay_max_ms: DISCOVERY_DELAY_MAX_MS,
            },
        }
    }

    /// Set the pause between prompts.
    #[must_use]
    pub fn with_pacing(mut self, pacing: ScanPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Generate prompts for the request's depth, ask each of them and
    /// bucket the answers by how the brand was mentioned.
    ///
    /// Engine failures land in the errors bucket; only an invalid request
    /// fails the run.
    pub async fn discover_keywords(
        &self,
        request: &DiscoveryRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DiscoveryReport> {
        let brand = request.client.name.trim();
        if brand.is_empty() {
            return Err(ScanError::InvalidRequest("client name is empty".to_string()));
        }

        tracing::info!(
            client = %brand,
            industry = %request.industry,
            engine = %request.engine,
            "Starting keyword discovery"
        );
        emit(sink, 5, "Generating discovery prompts...");

        let keywords = if request.services.iter().any(|s| !s.trim().is_empty()) {
            request.services.clone()
        } else {
            vec![request.industry.clone()]
        };
        let prompts = generate_from_templates(
            &keywords,
            Some(request.industry.as_str()),
            request.location.as_deref(),
            request.depth.prompt_count(),
        )?;

        let total = prompts.len();
        emit(
            sink,
            15,
            format!("Generated {total} prompts, starting scans..."),
        );

        let adapter = self.adapters.get(request.engine);
        let credential = request.credentials.for_engine(request.engine);
        let mut report = DiscoveryReport::new(request, prompts.clone());

        for (index, prompt) in prompts.into_iter().enumerate() {
            emit(
                sink,
                scan_percent(index, total),
                format!("Scanning prompt {}/{}...", index + 1, total),
            );

            match adapter.scan(&prompt, credential).await {
                Ok(response) => {
                    let mention = detect_mention(
                        &response.response_text,
                        brand,
                        request.client.domain.as_deref(),
                    );
                    let found = DiscoveredPrompt {
                        prompt,
                        mention_type: mention.mention_type,
                        position: mention.position,
                        engine: request.engine,
                    };
                    match mention.mention_type {
                        MentionType::Featured => report.featured.push(found),
                        MentionType::Mentioned => report.mentioned.push(found),
                        MentionType::CompetitorOnly | MentionType::NotFound => {
                            report.not_found.push(MissedPrompt {
                                prompt: found.prompt,
                                engine: request.engine,
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        engine = %request.engine,
                        prompt_index = index + 1,
                        "Discovery scan failed: {}",
                        e
                    );
                    report.errors.push(FailedPrompt {
                        prompt,
                        error: e.to_string(),
                    });
                }
            }

            if index + 1 < total {
                let delay = self.pacing.prompt_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        emit(sink, 95, "Analyzing results...");
        report.summarize();
        emit(sink, 100, "Discovery complete");

        tracing::info!(
            featured = report.summary.featured_count,
            mentioned = report.summary.mentioned_count,
            total = report.summary.total_scanned,
            "Keyword discovery finished"
        );
        Ok(report)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scan_percent(index: usize, total: usize) -> u8 {
    // Rounded share of the scan span, in integer arithmetic
    let done = (index * SCANS_PERCENT * 2 + total) / (total * 2);
    (SCANS_START_PERCENT + done).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_prompt_counts() {
        assert_eq!(DiscoveryDepth::Quick.prompt_count(), 10);
        assert_eq!(DiscoveryDepth::Standard.prompt_count(), 25);
        assert_eq!(DiscoveryDepth::Thorough.prompt_count(), 50);
        assert_eq!(DiscoveryDepth::default(), DiscoveryDepth::Standard);
    }

    #[test]
    fn test_depth_parses_lowercase() {
        let depth: DiscoveryDepth = serde_json::from_str("\"thorough\"").unwrap();
        assert_eq!(depth, DiscoveryDepth::Thorough);
    }

    #[test]
    fn test_scan_percent_spans_15_to_95() {
        assert_eq!(scan_percent(0, 10), 15);
        assert_eq!(scan_percent(5, 10), 55);
        assert_eq!(scan_percent(9, 10), 87);
        assert_eq!(scan_percent(1, 3), 42);
    }
}
