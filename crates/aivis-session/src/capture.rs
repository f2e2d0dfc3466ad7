//! Interactive login capture.
//!
//! Opens a visible browser at a platform's login page, lets the user sign
//! in, then reads the session cookie out of the browser. At most one login
//! session is open per (user, platform).

use crate::error::{Result, SessionError};
use aivis_browser::{
    BrowserActions, BrowserInstance, BrowserLauncher, FingerprintConfig, SessionCookie,
};
use aivis_core::{Credential, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const WINDOW_WIDTH: u32 = 1200;
const WINDOW_HEIGHT: u32 = 800;

/// How long a status check waits for the logged-in marker.
const MARKER_TIMEOUT: Duration = Duration::from_secs(2);

/// Platforms whose login can be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    ChatGpt,
    Perplexity,
}

impl Platform {
    /// Human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Perplexity => "Perplexity",
        }
    }

    /// Page the login browser opens at.
    #[must_use]
    pub fn login_url(self) -> &'static str {
        match self {
            Self::ChatGpt => "https://chat.openai.com/auth/login",
            Self::Perplexity => "https://www.perplexity.ai/login",
        }
    }

    /// Host reached once signed in.
    #[must_use]
    pub fn success_host(self) -> &'static str {
        match self {
            Self::ChatGpt => "chat.openai.com",
            Self::Perplexity => "www.perplexity.ai",
        }
    }

    /// Element that only exists for a signed-in user.
    #[must_use]
    pub fn logged_in_marker(self) -> &'static str {
        match self {
            Self::ChatGpt => "textarea[id=\"prompt-textarea\"], #prompt-textarea",
            Self::Perplexity => "textarea[placeholder*=\"Ask\"]",
        }
    }

    /// Cookie that carries the session, where there is a single one.
    #[must_use]
    pub fn session_cookie(self) -> Option<&'static str> {
        match self {
            Self::ChatGpt => Some(aivis_engines::conversational::SESSION_COOKIE),
            Self::Perplexity => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ChatGpt => "chatgpt",
            Self::Perplexity => "perplexity",
        })
    }
}

impl FromStr for Platform {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chatgpt" => Ok(Self::ChatGpt),
            "perplexity" => Ok(Self::Perplexity),
            other => Err(SessionError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Lifecycle of one login session.
///
/// `LoginOpened -> LoggedIn -> Captured`, with `Cancelled` or `Closed`
/// reachable from either open state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    NoSession,
    LoginOpened,
    LoggedIn,
    Captured,
    Cancelled,
    Closed,
}

impl SessionState {
    /// Whether moving to `next` is a legal step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NoSession, Self::LoginOpened)
                | (Self::LoginOpened, Self::LoggedIn | Self::Cancelled | Self::Closed)
                | (Self::LoggedIn, Self::LoggedIn | Self::Captured | Self::Cancelled | Self::Closed)
        )
    }

    /// Whether the session is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Captured | Self::Cancelled | Self::Closed)
    }
}

/// Result of polling a login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum LoginStatus {
    NoSession,
    Closed,
    Pending(String),
    LoggedIn,
    Error(String),
}

impl LoginStatus {
    /// Message suitable for showing the user.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NoSession => "No active login session",
            Self::Closed => "Browser was closed",
            Self::Pending(msg) | Self::Error(msg) => msg,
            Self::LoggedIn => "Login detected! Ready to capture session.",
        }
    }
}

/// Returned when a login browser opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginStarted {
    pub session_key: String,
    pub platform: Platform,
    pub message: String,
}

/// An open login session as listed for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub platform: Platform,
    pub state: SessionState,
    pub started_at: Timestamp,
}

/// A captured credential.
#[derive(Debug, Clone)]
pub struct CapturedSession {
    pub platform: Platform,
    /// Session cookie value, or a JSON bundle of auth cookies
    pub token: Credential,
    pub message: String,
}

struct ActiveSession<I: BrowserInstance> {
    browser: I,
    page: Arc<I::Page>,
    state: SessionState,
    started_at: Timestamp,
}

impl<I: BrowserInstance> ActiveSession<I> {
    fn advance(&mut self, next: SessionState) {
        if self.state.can_transition_to(next) {
            self.state = next;
        } else {
            tracing::warn!(from = ?self.state, to = ?next, "Ignoring invalid session transition");
        }
    }

    async fn shut_down(self, outcome: SessionState) {
        if let Err(e) = self.page.close().await {
            tracing::debug!("Closing login page failed: {}", e);
        }
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Closing login browser failed: {}", e);
        }
        tracing::debug!(state = ?outcome, "Login session ended");
    }
}

type SessionKey = (String, Platform);

/// Owns every open login browser.
pub struct SessionCapture<L: BrowserLauncher> {
    launcher: L,
    sessions: Mutex<HashMap<SessionKey, ActiveSession<L::Instance>>>,
}

impl<L: BrowserLauncher> SessionCapture<L> {
    /// `launcher` should produce visible (headful) browsers.
    #[must_use]
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a login browser, replacing any session already open for the key.
    pub async fn start_login_session(&self, user_id: &str, platform: Platform) -> Result<LoginStarted> {
        self.close_login_session(user_id, platform).await;

        tracing::info!(user_id, %platform, "Starting login session");
        let browser = self.launcher.launch().await?;
        let page = match open_login_page(&browser, platform).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::debug!("Closing login browser failed: {}", close_err);
                }
                return Err(e);
            }
        };

        let session = ActiveSession {
            browser,
            page: Arc::new(page),
            state: SessionState::LoginOpened,
            started_at: Timestamp::now(),
        };

        let replaced = self
            .sessions
            .lock()
            .await
            .insert((user_id.to_string(), platform), session);
        if let Some(previous) = replaced {
            previous.shut_down(SessionState::Cancelled).await;
        }

        Ok(LoginStarted {
            session_key: format!("{user_id}-{platform}"),
            platform,
            message: format!(
                "Browser opened. Please log in to {}. Complete the login when done.",
                platform.display_name()
            ),
        })
    }

    /// Poll whether the user has finished signing in.
    ///
    /// The session map is not locked while the page is checked.
    pub async fn check_login_status(&self, user_id: &str, platform: Platform) -> LoginStatus {
        let key = (user_id.to_string(), platform);

        let page = {
            let mut sessions = self.sessions.lock().await;
            let Some(session) = sessions.get(&key) else {
                return LoginStatus::NoSession;
            };

            if !session.browser.is_connected() {
                if let Some(session) = sessions.remove(&key) {
                    drop(sessions);
                    session.shut_down(SessionState::Closed).await;
                }
                return LoginStatus::Closed;
            }
            Arc::clone(&session.page)
        };

        let url = match page.current_url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(user_id, %platform, "Error checking login status: {}", e);
                return LoginStatus::Error(e.to_string());
            }
        };

        if !url.contains(platform.success_host()) {
            return LoginStatus::Pending("Waiting for login...".to_string());
        }

        if page
            .wait_for_selector(platform.logged_in_marker(), MARKER_TIMEOUT)
            .await
            .is_err()
        {
            return LoginStatus::Pending("Still on login page...".to_string());
        }

        // The session may have been closed or replaced while probing
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&key) {
            Some(session) if Arc::ptr_eq(&session.page, &page) => {
                session.advance(SessionState::LoggedIn);
                LoginStatus::LoggedIn
            }
            _ => LoginStatus::NoSession,
        }
    }

    /// Read the session credential and close the login browser.
    ///
    /// The browser is closed and the session forgotten on every path.
    pub async fn complete_login(&self, user_id: &str, platform: Platform) -> Result<CapturedSession> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(&(user_id.to_string(), platform))
            .ok_or(SessionError::NoSession)?;

        let cookies = match session.page.cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::error!(user_id, %platform, "Error completing login: {}", e);
                session.shut_down(SessionState::Closed).await;
                return Err(e.into());
            }
        };
        tracing::info!(user_id, %platform, count = cookies.len(), "Captured cookies");

        let token = extract_session_token(platform, &cookies).and_then(Credential::new);
        let outcome = if token.is_some() {
            SessionState::Captured
        } else {
            SessionState::Closed
        };
        session.shut_down(outcome).await;

        let token = token.ok_or_else(|| {
            SessionError::CaptureFailed(
                "Could not capture session token. Please try logging in again.".to_string(),
            )
        })?;

        tracing::info!(user_id, %platform, "Session captured");
        Ok(CapturedSession {
            platform,
            token,
            message: format!("{} account connected successfully!", platform.display_name()),
        })
    }

    /// Cancel a login session. Closing a missing session is a no-op.
    pub async fn close_login_session(&self, user_id: &str, platform: Platform) {
        let removed = self
            .sessions
            .lock()
            .await
            .remove(&(user_id.to_string(), platform));
        if let Some(session) = removed {
            tracing::info!(user_id, %platform, "Closing login session");
            session.shut_down(SessionState::Cancelled).await;
        }
    }

    /// Open sessions for a user, oldest first.
    pub async fn active_sessions(&self, user_id: &str) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut open: Vec<SessionInfo> = sessions
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, platform), session)| SessionInfo {
                platform: *platform,
                state: session.state,
                started_at: session.started_at,
            })
            .collect();
        open.sort_by_key(|info| (info.started_at, info.platform));
        open
    }
}

async fn open_login_page<I: BrowserInstance>(browser: &I, platform: Platform) -> Result<I::Page> {
    let page = browser.new_page().await?;
    page.apply_fingerprint(&FingerprintConfig::with_viewport(WINDOW_WIDTH, WINDOW_HEIGHT))
        .await?;
    page.navigate(platform.login_url()).await?;
    Ok(page)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundledCookie<'a> {
    name: &'a str,
    value: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_only: Option<bool>,
}

impl<'a> BundledCookie<'a> {
    fn short(cookie: &'a SessionCookie) -> Self {
        Self {
            name: &cookie.name,
            value: &cookie.value,
            domain: &cookie.domain,
            path: None,
            secure: None,
            http_only: None,
        }
    }

    fn full(cookie: &'a SessionCookie) -> Self {
        Self {
            path: Some(&cookie.path),
            secure: Some(cookie.secure),
            http_only: Some(cookie.http_only),
            ..Self::short(cookie)
        }
    }
}

fn bundle(cookies: &[BundledCookie<'_>]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    serde_json::to_string(cookies).ok()
}

/// Pick the credential out of a signed-in browser's cookies.
///
/// ChatGPT: the named session cookie's value, else a JSON bundle of
/// cookies whose names look auth-related. Perplexity: a JSON bundle of all
/// cookies on a perplexity domain. `None` when nothing qualifies.
#[must_use]
pub fn extract_session_token(platform: Platform, cookies: &[SessionCookie]) -> Option<String> {
    match platform {
        Platform::ChatGpt => {
            let name = platform.session_cookie()?;
            if let Some(cookie) = cookies.iter().find(|c| c.name == name) {
                return Some(cookie.value.clone());
            }
            let auth: Vec<BundledCookie<'_>> = cookies
                .iter()
                .filter(|c| ["session", "auth", "token"].iter().any(|k| c.name.contains(k)))
                .map(BundledCookie::short)
                .collect();
            bundle(&auth)
        }
        Platform::Perplexity => {
            let relevant: Vec<BundledCookie<'_>> = cookies
                .iter()
                .filter(|c| c.domain.contains("perplexity"))
                .map(BundledCookie::full)
                .collect();
            bundle(&relevant)
        }
    }
}
