//! Perplexity via a render-and-scrape service.
//!
//! The answer page sits behind bot protection, so it is rendered remotely
//! and returned as markdown plus a screenshot.

use crate::adapter::{EngineAdapter, EngineResponse};
use crate::cleanup::extract_answer;
use crate::error::{EngineError, Result};
use crate::screenshot::ScreenshotStore;
use aivis_core::{Credential, Engine, EngineApiConfig};
use async_trait::async_trait;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shown instead of an answer when no scrape-service key is configured.
pub const MISSING_KEY_MESSAGE: &str = "Perplexity scanning requires Firecrawl API due to Cloudflare protection. Please add your Firecrawl API key in Settings.";

/// Returned when cleanup leaves nothing.
pub const EMPTY_ANSWER_MESSAGE: &str = "No response content extracted from Perplexity";

const SEARCH_URL: &str = "https://www.perplexity.ai/search";

/// Milliseconds the render service waits for the answer to stream in.
const RENDER_WAIT_MS: u64 = 15_000;
const RENDER_TIMEOUT_MS: u64 = 60_000;

static DATA_URL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/\w+;base64,").expect("Data URL regex is hardcoded and valid")
});

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest {
    url: String,
    formats: [&'static str; 2],
    wait_for: u64,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    screenshot: Option<String>,
}

/// Adapter for Perplexity through the scrape service.
pub struct ScrapingProxyAdapter {
    client: Client,
    api_url: String,
    fallback_key: Option<Credential>,
    screenshots: ScreenshotStore,
}

impl ScrapingProxyAdapter {
    /// Create an adapter against an explicit scrape endpoint.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        api_url: impl Into<String>,
        fallback_key: Option<Credential>,
        screenshots: ScreenshotStore,
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
            screenshots,
        })
    }

    /// Create an adapter from the `[engines]` config section.
    pub fn from_config(config: &EngineApiConfig, screenshots: ScreenshotStore) -> Result<Self> {
        Self::new(
            config.firecrawl_api_url.clone(),
            config.firecrawl_api_key.clone().and_then(Credential::new),
            screenshots,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    async fn scrape(&self, prompt: &str, api_key: &Credential) -> Result<ScrapeData> {
        let request = ScrapeRequest {
            url: format!("{SEARCH_URL}?q={}", urlencoding::encode(prompt)),
            formats: ["markdown", "screenshot"],
            wait_for: RENDER_WAIT_MS,
            timeout: RENDER_TIMEOUT_MS,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Firecrawl API error: {} - {error_text}", status.as_u16());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EngineError::AuthExpired {
                    engine: Engine::Perplexity,
                    message,
                },
                StatusCode::TOO_MANY_REQUESTS => EngineError::RateLimited {
                    engine: Engine::Perplexity,
                    message,
                },
                other => EngineError::Api {
                    engine: Engine::Perplexity,
                    status: other.as_u16(),
                    message,
                },
            });
        }

        let body: ScrapeResponse = response.json().await.map_err(|e| EngineError::ScrapeParse {
            engine: Engine::Perplexity,
            message: format!("failed to parse Firecrawl response: {e}"),
        })?;

        if !body.success {
            return Err(EngineError::ScrapeParse {
                engine: Engine::Perplexity,
                message: format!(
                    "Firecrawl failed: {}",
                    body.error.as_deref().unwrap_or("Unknown error")
                ),
            });
        }

        Ok(body.data.unwrap_or(ScrapeData {
            markdown: None,
            screenshot: None,
        }))
    }

    /// Persist the rendered screenshot; failures are logged, never raised.
    async fn store_screenshot(&self, screenshot: &str) -> Option<String> {
        match self.fetch_screenshot(screenshot).await {
            Ok(Some(bytes)) => {
                let stem = ScreenshotStore::success_stem(Engine::Perplexity);
                match self.screenshots.save_png(&bytes, &stem).await {
                    Ok(name) => Some(name),
                    Err(e) => {
                        tracing::error!(engine = %Engine::Perplexity, "Failed to save screenshot: {}", e);
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(engine = %Engine::Perplexity, "Failed to fetch screenshot: {}", e);
                None
            }
        }
    }

    /// Decode an inline data URL or download an http(s) URL.
    async fn fetch_screenshot(&self, screenshot: &str) -> Result<Option<Vec<u8>>> {
        if screenshot.starts_with("data:image") {
            let encoded = DATA_URL_PREFIX.replace(screenshot, "");
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| EngineError::ScrapeParse {
                    engine: Engine::Perplexity,
                    message: format!("invalid screenshot data URL: {e}"),
                })?;
            return Ok(Some(bytes));
        }

        if screenshot.starts_with("http") {
            let response = self.client.get(screenshot).send().await?;
            if !response.status().is_success() {
                tracing::warn!(
                    engine = %Engine::Perplexity,
                    status = response.status().as_u16(),
                    "Screenshot download failed"
                );
                return Ok(None);
            }
            return Ok(Some(response.bytes().await?.to_vec()));
        }

        Ok(None)
    }
}

#[async_trait]
impl EngineAdapter for ScrapingProxyAdapter {
    fn engine(&self) -> Engine {
        Engine::Perplexity
    }

    async fn scan(&self, prompt: &str, credential: Option<&Credential>) -> Result<EngineResponse> {
        let Some(api_key) = credential.or(self.fallback_key.as_ref()) else {
            tracing::warn!(engine = %Engine::Perplexity, "No Firecrawl API key configured");
            return Ok(EngineResponse::text(MISSING_KEY_MESSAGE));
        };

        tracing::debug!(engine = %Engine::Perplexity, "Requesting rendered answer page");
        let data = self.scrape(prompt, api_key).await?;

        let markdown = data.markdown.unwrap_or_default();
        tracing::info!(engine = %Engine::Perplexity, chars = markdown.len(), "Got markdown content");

        let answer = extract_answer(&markdown);
        let screenshot_ref = match data.screenshot.as_deref() {
            Some(screenshot) if !screenshot.is_empty() => self.store_screenshot(screenshot).await,
            _ => None,
        };

        Ok(EngineResponse {
            response_text: if answer.is_empty() {
                EMPTY_ANSWER_MESSAGE.to_string()
            } else {
                answer
            },
            screenshot_ref,
        })
    }
}
