//! Page-level automation actions.
//!
//! [`BrowserActions`] is the seam between engine logic and a live page.
//! [`ChromePage`] implements it over a chromiumoxide tab; tests implement it
//! with scripted fakes.

use crate::error::{BrowserError, Result};
use crate::fingerprint::{FingerprintConfig, STEALTH_SCRIPT};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Interval between DOM probes while waiting for a selector.
const SELECTOR_POLL_MS: u64 = 250;

/// A browser cookie as read from or written to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl SessionCookie {
    /// A `secure`, `httpOnly` cookie on `/` for the given domain.
    #[must_use]
    pub fn secure(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
        }
    }
}

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Set user agent, viewport and anti-detection overrides
    async fn apply_fingerprint(&self, fingerprint: &FingerprintConfig) -> Result<()>;

    /// Navigate to a URL and wait for the load to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL currently displayed
    async fn current_url(&self) -> Result<String>;

    /// Whether at least one element matches the selector
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Focus an element and type text into it
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Press Enter inside an element
    async fn press_enter(&self, selector: &str) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Inner text of the last element matching the selector
    async fn extract_last_text(&self, selector: &str) -> Result<Option<String>>;

    /// Visible text of the whole document body
    async fn body_text(&self) -> Result<String>;

    /// Evaluate a script that returns a boolean
    async fn evaluate_bool(&self, script: &str) -> Result<bool>;

    /// Install cookies (same-site Lax)
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()>;

    /// All cookies visible to the page
    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    /// Take a full-page PNG screenshot
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Close the tab
    async fn close(&self) -> Result<()>;
}

/// A chromiumoxide tab.
#[derive(Debug, Clone)]
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    pub(crate) fn new(page: Page) -> Self {
        Self { page }
    }

    /// Underlying chromiumoxide page.
    #[must_use]
    pub fn inner(&self) -> &Page {
        &self.page
    }
}

#[async_trait::async_trait]
impl BrowserActions for ChromePage {
    async fn apply_fingerprint(&self, fingerprint: &FingerprintConfig) -> Result<()> {
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await
            .map_err(BrowserError::chromium)?;

        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(fingerprint.viewport_width),
                i64::from(fingerprint.viewport_height),
                1.0,
                false,
            ))
            .await
            .map_err(BrowserError::chromium)?;

        self.page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(BrowserError::chromium)?;

        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(BrowserError::chromium)
            .map(Option::unwrap_or_default)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        element
            .click()
            .await
            .map_err(BrowserError::chromium)?
            .type_str(value)
            .await
            .map_err(BrowserError::chromium)?;
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        element
            .press_key("Enter")
            .await
            .map_err(BrowserError::chromium)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        element.click().await.map_err(BrowserError::chromium)?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.exists(selector).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::Timeout(format!(
                    "selector '{selector}' not found within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(SELECTOR_POLL_MS)).await;
        }
    }

    async fn extract_last_text(&self, selector: &str) -> Result<Option<String>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .unwrap_or_default();

        match elements.last() {
            Some(element) => element.inner_text().await.map_err(BrowserError::chromium),
            None => Ok(None),
        }
    }

    async fn body_text(&self) -> Result<String> {
        self.page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn evaluate_bool(&self, script: &str) -> Result<bool> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(|cookie| {
                CookieParam::builder()
                    .name(cookie.name.clone())
                    .value(cookie.value.clone())
                    .domain(cookie.domain.clone())
                    .path(cookie.path.clone())
                    .secure(cookie.secure)
                    .http_only(cookie.http_only)
                    .same_site(CookieSameSite::Lax)
                    .build()
                    .map_err(BrowserError::Cookie)
            })
            .collect::<Result<Vec<_>>>()?;

        self.page
            .set_cookies(params)
            .await
            .map_err(BrowserError::chromium)?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(BrowserError::chromium)?;

        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(BrowserError::chromium)
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(BrowserError::chromium)
    }
}

/// Helper to extract the host from a URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}
