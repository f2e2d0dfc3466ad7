//! ChatGPT through a pooled, fingerprinted browser.
//!
//! The session cookie is injected before navigation; the prompt is typed
//! into the chat input and the last assistant message is polled until it
//! stops changing or the page stops generating.

use crate::adapter::{EngineAdapter, EngineResponse};
use crate::error::{EngineError, Result};
use crate::screenshot::ScreenshotStore;
use crate::simulated;
use aivis_browser::{
    BrowserActions, BrowserInstance, BrowserLauncher, BrowserPool, FingerprintConfig,
    SessionCookie,
};
use aivis_core::{Credential, Engine, ScanningConfig};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Chat home page.
pub const CHAT_URL: &str = "https://chatgpt.com";

/// Cookie carrying the logged-in session.
pub const SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

/// Both domains the chat app reads the session cookie from.
const COOKIE_DOMAINS: [&str; 2] = [".chatgpt.com", ".chat.openai.com"];

const CHAT_INPUT: &str = "#prompt-textarea, textarea[data-id=\"root\"], textarea[placeholder*=\"Message\"], div[contenteditable=\"true\"]";
const SEND_BUTTON: &str = "button[data-testid=\"send-button\"], button[aria-label=\"Send prompt\"], button[data-testid=\"fruitjuice-send-button\"]";
const RESPONSE_CONTAINER: &str =
    "[data-message-author-role=\"assistant\"], div.markdown, div[class*=\"markdown\"]";

const GENERATING_SCRIPT: &str = r#"(() => {
    const streaming = document.querySelector('[class*="result-streaming"]');
    const cursor = document.querySelector('[class*="cursor"]');
    const stop = document.querySelector('button[aria-label*="Stop"]');
    return !!(streaming || cursor || stop);
})()"#;

/// Returned when nothing was captured before the wait budget ran out.
pub const NO_RESPONSE_MESSAGE: &str = "No response received";

const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;

/// Pacing of the chat interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTiming {
    /// Pause after navigation and after sending, for the app to settle
    pub settle_delay: Duration,
    /// Wait budget for the chat input to appear
    pub input_timeout: Duration,
    /// Interval between response polls
    pub poll_interval: Duration,
    /// Total wait budget for the response
    pub response_timeout: Duration,
    /// Unchanged polls that count as complete
    pub stable_polls: u32,
    /// Responses at or under this many chars never count as complete
    pub min_response_chars: usize,
}

impl ConversationTiming {
    /// Timing from the `[scanning]` config section.
    #[must_use]
    pub fn from_config(config: &ScanningConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            response_timeout: config.prompt_timeout(),
            ..Self::default()
        }
    }
}

impl Default for ConversationTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(3),
            input_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            response_timeout: Duration::from_secs(60),
            stable_polls: 3,
            min_response_chars: 50,
        }
    }
}

/// Adapter for the conversational chat surface.
pub struct ConversationalAdapter<L: BrowserLauncher> {
    pool: BrowserPool<L>,
    screenshots: ScreenshotStore,
    timing: ConversationTiming,
}

impl<L: BrowserLauncher> ConversationalAdapter<L> {
    /// Create an adapter that borrows browsers from `pool`.
    #[must_use]
    pub fn new(pool: BrowserPool<L>, screenshots: ScreenshotStore, timing: ConversationTiming) -> Self {
        Self {
            pool,
            screenshots,
            timing,
        }
    }

    /// Drive one prompt on an open page.
    async fn converse<P: BrowserActions + ?Sized>(
        &self,
        page: &P,
        prompt: &str,
        session: &Credential,
    ) -> Result<String> {
        page.apply_fingerprint(&FingerprintConfig::with_viewport(VIEWPORT_WIDTH, VIEWPORT_HEIGHT))
            .await?;

        let cookies: Vec<SessionCookie> = COOKIE_DOMAINS
            .iter()
            .map(|domain| SessionCookie::secure(SESSION_COOKIE, session.expose(), *domain))
            .collect();
        page.set_cookies(&cookies).await?;

        tracing::debug!(engine = %Engine::ChatGpt, "Navigating to chat");
        page.navigate(CHAT_URL).await?;
        tokio::time::sleep(self.timing.settle_delay).await;

        self.ensure_logged_in(page).await?;

        page.wait_for_selector(CHAT_INPUT, self.timing.input_timeout).await?;
        page.fill_field(CHAT_INPUT, prompt).await?;

        if page.exists(SEND_BUTTON).await? {
            page.click(SEND_BUTTON).await?;
        } else {
            page.press_enter(CHAT_INPUT).await?;
        }
        tracing::debug!(engine = %Engine::ChatGpt, "Prompt sent, waiting for response");

        tokio::time::sleep(self.timing.settle_delay).await;
        self.await_response(page).await
    }

    async fn ensure_logged_in<P: BrowserActions + ?Sized>(&self, page: &P) -> Result<()> {
        let url = page.current_url().await?;
        if url.contains("/auth/login") {
            return Err(expired("redirected to login page"));
        }

        let body = page.body_text().await?;
        if body.contains("Log in") && body.contains("Sign up") && !page.exists("#prompt-textarea").await? {
            return Err(expired("login page shown instead of chat"));
        }
        Ok(())
    }

    /// Poll the last assistant message until it settles or time runs out.
    async fn await_response<P: BrowserActions + ?Sized>(&self, page: &P) -> Result<String> {
        let started = Instant::now();
        let mut response = String::new();
        let mut unchanged = 0;

        while started.elapsed() < self.timing.response_timeout {
            tokio::time::sleep(self.timing.poll_interval).await;

            if let Some(current) = page.extract_last_text(RESPONSE_CONTAINER).await? {
                let long_enough = current.chars().count() > self.timing.min_response_chars;
                if current == response && long_enough {
                    unchanged += 1;
                    if unchanged >= self.timing.stable_polls {
                        tracing::debug!(engine = %Engine::ChatGpt, "Response stable");
                        break;
                    }
                } else {
                    unchanged = 0;
                    response = current;
                }
            }

            let long_enough = response.chars().count() > self.timing.min_response_chars;
            if long_enough && !page.evaluate_bool(GENERATING_SCRIPT).await? {
                tokio::time::sleep(self.timing.poll_interval).await;
                if let Some(last) = page.extract_last_text(RESPONSE_CONTAINER).await? {
                    response = last;
                }
                tracing::debug!(engine = %Engine::ChatGpt, "Generation finished");
                break;
            }
        }

        if started.elapsed() >= self.timing.response_timeout {
            tracing::warn!(
                engine = %Engine::ChatGpt,
                timeout_ms = self.timing.response_timeout.as_millis(),
                "Response wait budget elapsed"
            );
        }

        let response = response.trim();
        Ok(if response.is_empty() {
            NO_RESPONSE_MESSAGE.to_string()
        } else {
            response.to_string()
        })
    }

    /// Screenshot the page; failures are logged and yield `None`.
    async fn capture<P: BrowserActions + ?Sized>(&self, page: &P, stem: &str) -> Option<String> {
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(engine = %Engine::ChatGpt, "Screenshot failed: {}", e);
                return None;
            }
        };
        match self.screenshots.save_png(&bytes, stem).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(engine = %Engine::ChatGpt, "Saving screenshot failed: {}", e);
                None
            }
        }
    }
}

fn expired(reason: &str) -> EngineError {
    EngineError::AuthExpired {
        engine: Engine::ChatGpt,
        message: format!("session token may be expired ({reason})"),
    }
}

#[async_trait]
impl<L: BrowserLauncher> EngineAdapter for ConversationalAdapter<L> {
    fn engine(&self) -> Engine {
        Engine::ChatGpt
    }

    async fn scan(&self, prompt: &str, credential: Option<&Credential>) -> Result<EngineResponse> {
        let Some(session) = credential else {
            tracing::warn!(engine = %Engine::ChatGpt, "No session token, returning simulated response");
            return Ok(EngineResponse::text(simulated::chat_response(prompt)));
        };

        let lease = self.pool.acquire().await?;
        let page = match lease.new_page().await {
            Ok(page) => page,
            Err(e) => {
                lease.release().await;
                return Err(e.into());
            }
        };

        let outcome = match self.converse(&page, prompt, session).await {
            Ok(response_text) => {
                let stem = ScreenshotStore::success_stem(Engine::ChatGpt);
                let screenshot_ref = self.capture(&page, &stem).await;
                tracing::info!(engine = %Engine::ChatGpt, chars = response_text.len(), "Response captured");
                Ok(EngineResponse {
                    response_text,
                    screenshot_ref,
                })
            }
            Err(e) => {
                tracing::error!(engine = %Engine::ChatGpt, "Scan failed: {}", e);
                let stem = ScreenshotStore::error_stem(Engine::ChatGpt);
                self.capture(&page, &stem).await;
                Err(e)
            }
        };

        if let Err(e) = page.close().await {
            tracing::debug!(engine = %Engine::ChatGpt, "Closing page failed: {}", e);
        }
        lease.release().await;

        outcome
    }
}
