//! Google AI overview via a SERP API.
//!
//! A single HTTP GET per prompt; the overview, answer box or knowledge
//! graph is flattened into one text blob together with the top organic and
//! local results so the analysis pipeline sees what a searcher would.

use crate::adapter::{EngineAdapter, EngineResponse};
use crate::error::{EngineError, Result};
use crate::simulated;
use aivis_core::{Credential, Engine, EngineApiConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt::Write;
use std::time::Duration;

const ORGANIC_LIMIT: usize = 5;
const LOCAL_LIMIT: usize = 3;

/// Adapter for the search engine's AI overview.
pub struct SearchOverviewAdapter {
    client: Client,
    api_url: String,
    fallback_key: Option<Credential>,
}

impl SearchOverviewAdapter {
    /// Create an adapter against an explicit SERP endpoint.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        api_url: impl Into<String>,
        fallback_key: Option<Credential>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            fallback_key,
        })
    }

    /// Create an adapter from the `[engines]` config section.
    pub fn from_config(config: &EngineApiConfig) -> Result<Self> {
        Self::new(
            config.serp_api_url.clone(),
            config.serp_api_key.clone().and_then(Credential::new),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    async fn search(&self, prompt: &str, api_key: &Credential) -> Result<Value> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("api_key", api_key.expose()),
                ("q", prompt),
                ("engine", "google"),
                ("gl", "us"),
                ("hl", "en"),
                ("num", "10"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED => EngineError::AuthExpired {
                    engine: Engine::GoogleAio,
                    message: "Invalid SERP API key".to_string(),
                },
                StatusCode::TOO_MANY_REQUESTS => EngineError::RateLimited {
                    engine: Engine::GoogleAio,
                    message: "SERP API rate limit exceeded".to_string(),
                },
                other => EngineError::Api {
                    engine: Engine::GoogleAio,
                    status: other.as_u16(),
                    message: format!("SERP API error: {}", other.as_u16()),
                },
            });
        }

        response.json().await.map_err(|e| EngineError::ScrapeParse {
            engine: Engine::GoogleAio,
            message: format!("failed to parse SERP response: {e}"),
        })
    }
}

#[async_trait]
impl EngineAdapter for SearchOverviewAdapter {
    fn engine(&self) -> Engine {
        Engine::GoogleAio
    }

    async fn scan(&self, prompt: &str, credential: Option<&Credential>) -> Result<EngineResponse> {
        let Some(api_key) = credential.or(self.fallback_key.as_ref()) else {
            tracing::warn!(engine = %Engine::GoogleAio, "No SERP API key, returning simulated response");
            return Ok(EngineResponse::text(simulated::overview_response(prompt)));
        };

        tracing::debug!(engine = %Engine::GoogleAio, "Querying SERP API");
        let data = self.search(prompt, api_key).await?;
        let text = compose_overview(&data);
        tracing::info!(engine = %Engine::GoogleAio, chars = text.len(), "SERP response received");

        Ok(EngineResponse::text(text))
    }
}

/// Scalar JSON value as display text; `None` for null, empty or structured values.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Overview text by priority: AI overview, answer box, knowledge graph.
fn overview_text(data: &Value) -> Option<String> {
    let ai_overview = match data.get("ai_overview") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(overview @ Value::Object(_)) => scalar_text(overview.get("text")).or_else(|| {
            overview
                .get("text_blocks")
                .and_then(Value::as_array)
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter_map(|block| match block {
                            Value::String(s) => Some(s.clone()),
                            other => scalar_text(other.get("text")),
                        })
                        .collect::<Vec<_>>()
                        .join("\n\n")
                })
        }),
        _ => None,
    }
    .filter(|text| !text.is_empty());

    ai_overview
        .or_else(|| {
            let answer_box = data.get("answer_box")?;
            scalar_text(answer_box.get("answer")).or_else(|| scalar_text(answer_box.get("snippet")))
        })
        .or_else(|| {
            let graph = data.get("knowledge_graph")?;
            let parts: Vec<String> = ["title", "type", "description"]
                .iter()
                .filter_map(|field| scalar_text(graph.get(*field)))
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n\n"))
        })
}

/// Flatten a SERP payload into the text handed to analysis.
#[must_use]
pub fn compose_overview(data: &Value) -> String {
    let mut text = match overview_text(data) {
        Some(overview) => format!("**AI Overview**\n\n{overview}"),
        None => "**No AI Overview available for this query**".to_string(),
    };

    if let Some(organic) = data
        .get("organic_results")
        .and_then(Value::as_array)
        .filter(|results| !results.is_empty())
    {
        text.push_str("\n\n**Top Search Results:**\n");
        for (index, result) in organic.iter().take(ORGANIC_LIMIT).enumerate() {
            let title = scalar_text(result.get("title")).unwrap_or_default();
            let link = scalar_text(result.get("link")).unwrap_or_default();
            let _ = write!(text, "\n{}. **{title}**\n   {link}\n", index + 1);
            if let Some(snippet) = scalar_text(result.get("snippet")) {
                let _ = writeln!(text, "   {snippet}");
            }
        }
    }

    if let Some(places) = data
        .get("local_results")
        .and_then(|local| local.get("places"))
        .and_then(Value::as_array)
    {
        text.push_str("\n\n**Local Results:**\n");
        for place in places.iter().take(LOCAL_LIMIT) {
            let title = scalar_text(place.get("title")).unwrap_or_default();
            let _ = write!(text, "\n📍 **{title}**");
            if let Some(rating) = scalar_text(place.get("rating")) {
                let _ = write!(text, " ⭐ {rating}");
            }
            if let Some(reviews) = scalar_text(place.get("reviews")) {
                let _ = write!(text, " ({reviews} reviews)");
            }
            text.push('\n');
            if let Some(address) = scalar_text(place.get("address")) {
                let _ = writeln!(text, "   {address}");
            }
        }
    }

    text
}
