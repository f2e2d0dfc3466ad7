//! Credential liveness checks.
//!
//! A probe loads the surface in a pooled browser with the stored cookie and
//! looks for signed-in markers. Results are recorded in a
//! [`TokenStatusStore`] so the last outcome can be read without a probe.

use crate::error::Result;
use aivis_browser::{
    BrowserActions, BrowserInstance, BrowserLauncher, BrowserPool, FingerprintConfig,
    SessionCookie,
};
use aivis_core::{Credential, Engine, ScanCredentials, Timestamp};
use aivis_engines::conversational::{CHAT_URL, SESSION_COOKIE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const PERPLEXITY_URL: &str = "https://www.perplexity.ai";
const PERPLEXITY_COOKIE: &str = "pplx.session";

const CHAT_INPUT: &str = "#prompt-textarea, textarea[data-id=\"root\"]";
const ASK_INPUT: &str = "textarea[placeholder*=\"Ask\"]";
const SIGN_IN_BUTTON: &str = "button[data-testid=\"sign-in-button\"]";

const PROBE_WIDTH: u32 = 1280;
const PROBE_HEIGHT: u32 = 720;

/// Browser-probed surfaces.
#[derive(Debug, Clone, Copy)]
enum Surface {
    Chat,
    Ask,
}

/// Outcome of one credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub engine: Engine,
    pub valid: bool,
    pub message: String,
    pub checked_at: Timestamp,
}

impl TokenValidation {
    fn new(engine: Engine, valid: bool, message: impl Into<String>) -> Self {
        Self {
            engine,
            valid,
            message: message.into(),
            checked_at: Timestamp::now(),
        }
    }
}

/// Last recorded status of one engine's credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineTokenStatus {
    pub engine: Engine,
    /// `None` when never validated
    pub valid: Option<bool>,
    pub message: Option<String>,
    pub last_validation: Option<Timestamp>,
}

/// Cached token status for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatusReport {
    pub user_id: String,
    /// One entry per engine, in enumeration order
    pub engines: Vec<EngineTokenStatus>,
    pub last_validation: Option<Timestamp>,
}

/// Persistence for validation outcomes.
#[async_trait]
pub trait TokenStatusStore: Send + Sync {
    /// Record the latest outcomes for a user, replacing earlier ones per engine.
    async fn record(&self, user_id: &str, results: &[TokenValidation]) -> Result<()>;

    /// Latest outcome per engine for a user.
    async fn latest(&self, user_id: &str) -> Result<Vec<TokenValidation>>;
}

/// Process-local [`TokenStatusStore`].
#[derive(Debug, Default)]
pub struct InMemoryTokenStatusStore {
    entries: Mutex<HashMap<String, BTreeMap<Engine, TokenValidation>>>,
}

impl InMemoryTokenStatusStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStatusStore for InMemoryTokenStatusStore {
    async fn record(&self, user_id: &str, results: &[TokenValidation]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let user = entries.entry(user_id.to_string()).or_default();
        for result in results {
            user.insert(result.engine, result.clone());
        }
        Ok(())
    }

    async fn latest(&self, user_id: &str) -> Result<Vec<TokenValidation>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(user_id)
            .map(|user| user.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Probes stored credentials with pooled browsers.
pub struct TokenValidator<L: BrowserLauncher> {
    pool: BrowserPool<L>,
    store: Arc<dyn TokenStatusStore>,
    settle_delay: Duration,
}

impl<L: BrowserLauncher> TokenValidator<L> {
    /// Validator sharing `pool` with the scanners.
    #[must_use]
    pub fn new(pool: BrowserPool<L>, store: Arc<dyn TokenStatusStore>) -> Self {
        Self {
            pool,
            store,
            settle_delay: Duration::from_secs(2),
        }
    }

    /// Override the pause after navigation.
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Check one credential. Probe failures become `valid == false`.
    pub async fn validate(&self, engine: Engine, credential: Option<&Credential>) -> TokenValidation {
        let Some(credential) = credential else {
            return TokenValidation::new(engine, false, "No session token provided");
        };

        let surface = match engine {
            Engine::ChatGpt => Surface::Chat,
            Engine::Perplexity => Surface::Ask,
            Engine::GoogleAio => return TokenValidation::new(engine, true, "API key configured"),
        };

        match self.probe(surface, credential).await {
            Ok(validation) => validation,
            Err(e) => {
                tracing::error!(%engine, "Token validation error: {}", e);
                TokenValidation::new(engine, false, format!("Validation error: {e}"))
            }
        }
    }

    /// Check every credential a user has and record the outcomes.
    ///
    /// Engines without a credential are recorded as not configured.
    pub async fn validate_all(
        &self,
        user_id: &str,
        credentials: &ScanCredentials,
    ) -> Result<Vec<TokenValidation>> {
        let mut results = Vec::with_capacity(Engine::ALL.len());
        for engine in Engine::ALL {
            let credential = match engine {
                Engine::ChatGpt => credentials.chatgpt_session.as_ref(),
                Engine::Perplexity => credentials.perplexity_session.as_ref(),
                Engine::GoogleAio => credentials.serp_api_key.as_ref(),
            };
            let result = match credential {
                Some(credential) => self.validate(engine, Some(credential)).await,
                None => TokenValidation::new(engine, false, "Not configured"),
            };
            tracing::info!(user_id, %engine, valid = result.valid, "Token checked");
            results.push(result);
        }

        self.store.record(user_id, &results).await?;
        Ok(results)
    }

    /// Last recorded status without probing.
    pub async fn cached_status(&self, user_id: &str) -> Result<TokenStatusReport> {
        let latest = self.store.latest(user_id).await?;

        let engines: Vec<EngineTokenStatus> = Engine::ALL
            .iter()
            .map(|engine| {
                let entry = latest.iter().find(|v| v.engine == *engine);
                EngineTokenStatus {
                    engine: *engine,
                    valid: entry.map(|v| v.valid),
                    message: entry.map(|v| v.message.clone()),
                    last_validation: entry.map(|v| v.checked_at),
                }
            })
            .collect();

        Ok(TokenStatusReport {
            user_id: user_id.to_string(),
            last_validation: engines.iter().filter_map(|e| e.last_validation).max(),
            engines,
        })
    }

    async fn probe(&self, surface: Surface, credential: &Credential) -> Result<TokenValidation> {
        let lease = self.pool.acquire().await?;
        let page = match lease.new_page().await {
            Ok(page) => page,
            Err(e) => {
                lease.release().await;
                return Err(e.into());
            }
        };

        let outcome = self.inspect(&page, surface, credential).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Closing probe page failed: {}", e);
        }
        lease.release().await;
        outcome
    }

    async fn inspect<P: BrowserActions + ?Sized>(
        &self,
        page: &P,
        surface: Surface,
        credential: &Credential,
    ) -> Result<TokenValidation> {
        page.apply_fingerprint(&FingerprintConfig::with_viewport(PROBE_WIDTH, PROBE_HEIGHT))
            .await?;

        match surface {
            Surface::Chat => {
                let engine = Engine::ChatGpt;
                page.set_cookies(&[SessionCookie::secure(
                    SESSION_COOKIE,
                    credential.expose(),
                    ".chatgpt.com",
                )])
                .await?;
                page.navigate(CHAT_URL).await?;
                tokio::time::sleep(self.settle_delay).await;

                let url = page.current_url().await?;
                let body = page.body_text().await?;
                let has_input = page.exists(CHAT_INPUT).await?;
                let login_page = url.contains("/auth/login")
                    || (body.contains("Log in") && body.contains("Sign up") && !has_input);

                Ok(if login_page || !has_input {
                    TokenValidation::new(
                        engine,
                        false,
                        "Session token expired or invalid. Please get a new token from ChatGPT.",
                    )
                } else {
                    TokenValidation::new(engine, true, "ChatGPT session token is valid")
                })
            }
            Surface::Ask => {
                let engine = Engine::Perplexity;
                page.set_cookies(&[SessionCookie::secure(
                    PERPLEXITY_COOKIE,
                    credential.expose(),
                    ".perplexity.ai",
                )])
                .await?;
                page.navigate(PERPLEXITY_URL).await?;
                tokio::time::sleep(self.settle_delay).await;

                let logged_in = page.exists(ASK_INPUT).await? && !page.exists(SIGN_IN_BUTTON).await?;
                Ok(if logged_in {
                    TokenValidation::new(engine, true, "Perplexity session token is valid")
                } else {
                    TokenValidation::new(
                        engine,
                        false,
                        "Perplexity session token expired. Please get a new token.",
                    )
                })
            }
        }
    }
}
