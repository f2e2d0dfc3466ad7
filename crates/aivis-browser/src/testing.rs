//! Scripted browsers for tests that drive pages without Chrome.
//!
//! A [`PageScript`] fixes what every page opened by a [`ScriptedLauncher`]
//! reports; a shared [`PageLog`] records what was done to those pages.

use crate::actions::{BrowserActions, SessionCookie};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::launcher::{BrowserInstance, BrowserLauncher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned page behaviour.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// URL reported after navigation; the navigated URL when `None`
    pub redirect_to: Option<String>,
    /// `document.body.innerText`
    pub body_text: String,
    /// Selectors that exist; a compound selector matches if any part does
    pub present_selectors: Vec<String>,
    /// Successive `extract_last_text` results; the last one repeats
    pub responses: Vec<String>,
    /// Successive `evaluate_bool` results; the last one repeats, `false` when empty
    pub script_results: Vec<bool>,
    /// Cookies reported by the page
    pub cookies: Vec<SessionCookie>,
    /// Make `navigate` fail
    pub fail_navigation: bool,
    /// Screenshot bytes
    pub screenshot: Vec<u8>,
    /// How long `wait_for_selector` waits before giving up on a missing selector
    pub selector_wait: Duration,
}

impl PageScript {
    /// Mark selectors as present.
    #[must_use]
    pub fn with_selectors(mut self, selectors: &[&str]) -> Self {
        self.present_selectors
            .extend(selectors.iter().map(ToString::to_string));
        self
    }

    /// Queue response texts.
    #[must_use]
    pub fn with_responses(mut self, responses: &[&str]) -> Self {
        self.responses.extend(responses.iter().map(ToString::to_string));
        self
    }
}

/// Everything done to scripted pages, in order.
#[derive(Debug, Clone, Default)]
pub struct PageLog {
    events: Arc<Mutex<Vec<String>>>,
    cookies: Arc<Mutex<Vec<SessionCookie>>>,
}

impl PageLog {
    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Recorded events such as `navigate:https://…`, `fill:…`, `close`.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Whether an event starting with `prefix` was recorded.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.events().iter().any(|e| e.starts_with(prefix))
    }

    /// Cookies installed through `set_cookies`.
    #[must_use]
    pub fn installed_cookies(&self) -> Vec<SessionCookie> {
        self.cookies.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// A page that follows a [`PageScript`].
#[derive(Debug)]
pub struct ScriptedPage {
    script: PageScript,
    log: PageLog,
    url: Mutex<String>,
    response_cursor: AtomicUsize,
    script_cursor: AtomicUsize,
}

impl ScriptedPage {
    /// A standalone page.
    #[must_use]
    pub fn new(script: PageScript, log: PageLog) -> Self {
        Self {
            script,
            log,
            url: Mutex::new("about:blank".to_string()),
            response_cursor: AtomicUsize::new(0),
            script_cursor: AtomicUsize::new(0),
        }
    }

    fn has(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .any(|part| self.script.present_selectors.iter().any(|s| s == part))
    }

    fn next<T: Clone>(items: &[T], cursor: &AtomicUsize) -> Option<T> {
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        items.get(index).or_else(|| items.last()).cloned()
    }
}

#[async_trait::async_trait]
impl BrowserActions for ScriptedPage {
    async fn apply_fingerprint(&self, fingerprint: &FingerprintConfig) -> Result<()> {
        self.log.push(format!(
            "fingerprint:{}x{}",
            fingerprint.viewport_width, fingerprint.viewport_height
        ));
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.log.push(format!("navigate:{url}"));
        if self.script.fail_navigation {
            return Err(BrowserError::NavigationError(format!("{url}: net::ERR_FAILED")));
        }
        let landed = self.script.redirect_to.clone().unwrap_or_else(|| url.to_string());
        if let Ok(mut current) = self.url.lock() {
            *current = landed;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().map(|u| u.clone()).unwrap_or_default())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.has(selector))
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        if !self.has(selector) {
            return Err(BrowserError::SelectorNotFound(selector.to_string()));
        }
        self.log.push(format!("fill:{value}"));
        Ok(())
    }

    async fn press_enter(&self, _selector: &str) -> Result<()> {
        self.log.push("enter".to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if !self.has(selector) {
            return Err(BrowserError::SelectorNotFound(selector.to_string()));
        }
        self.log.push("click".to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.has(selector) {
            Ok(())
        } else {
            tokio::time::sleep(self.script.selector_wait.min(timeout)).await;
            Err(BrowserError::Timeout(format!(
                "selector '{selector}' not found within {timeout:?}"
            )))
        }
    }

    async fn extract_last_text(&self, _selector: &str) -> Result<Option<String>> {
        Ok(Self::next(&self.script.responses, &self.response_cursor))
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.script.body_text.clone())
    }

    async fn evaluate_bool(&self, _script: &str) -> Result<bool> {
        Ok(Self::next(&self.script.script_results, &self.script_cursor).unwrap_or(false))
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        self.log.push(format!("set_cookies:{}", cookies.len()));
        if let Ok(mut installed) = self.log.cookies.lock() {
            installed.extend_from_slice(cookies);
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(self.script.cookies.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.log.push("screenshot".to_string());
        Ok(self.script.screenshot.clone())
    }

    async fn close(&self) -> Result<()> {
        self.log.push("close".to_string());
        Ok(())
    }
}

/// A browser whose pages follow one script.
#[derive(Debug)]
pub struct ScriptedBrowser {
    script: PageScript,
    log: PageLog,
    connected: AtomicBool,
}

impl ScriptedBrowser {
    /// Simulate the process going away.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BrowserInstance for ScriptedBrowser {
    type Page = ScriptedPage;

    async fn new_page(&self) -> Result<ScriptedPage> {
        if !self.is_connected() {
            return Err(BrowserError::Disconnected);
        }
        self.log.push("new_page".to_string());
        Ok(ScriptedPage::new(self.script.clone(), self.log.clone()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.log.push("browser_close".to_string());
        Ok(())
    }
}

/// Launches [`ScriptedBrowser`]s.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    script: PageScript,
    log: PageLog,
    launches: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    /// Launcher whose pages follow `script`.
    #[must_use]
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Shared log of page activity.
    #[must_use]
    pub fn log(&self) -> PageLog {
        self.log.clone()
    }

    /// Number of browsers launched so far.
    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ScriptedLauncher {
    type Instance = ScriptedBrowser;

    async fn launch(&self) -> Result<ScriptedBrowser> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedBrowser {
            script: self.script.clone(),
            log: self.log.clone(),
            connected: AtomicBool::new(true),
        })
    }
}
