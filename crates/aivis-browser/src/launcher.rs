//! Browser process launching.
//!
//! The pool is generic over [`BrowserLauncher`] so it never depends on a real
//! Chrome binary; [`ChromeLauncher`] is the production implementation.

use crate::actions::{BrowserActions, ChromePage};
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use futures_util::stream::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Chrome flags that reduce automation fingerprints.
const STEALTH_ARGS: [&str; 7] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--disable-blink-features=AutomationControlled",
];

/// A running browser process.
#[async_trait::async_trait]
pub trait BrowserInstance: Send + Sync + 'static {
    /// Tab type produced by this browser.
    type Page: BrowserActions + 'static;

    /// Open a blank tab.
    async fn new_page(&self) -> Result<Self::Page>;

    /// False once the underlying process has gone away.
    fn is_connected(&self) -> bool;

    /// Terminate the process.
    async fn close(&self) -> Result<()>;
}

/// Starts browser processes.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    /// Browser type produced by this launcher.
    type Instance: BrowserInstance;

    /// Launch a new browser process.
    async fn launch(&self) -> Result<Self::Instance>;
}

/// Launches Chrome through chromiumoxide with stealth arguments.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    window_width: u32,
    window_height: u32,
    chrome_executable: Option<PathBuf>,
}

impl ChromeLauncher {
    /// Launcher configured from the `[browser]` config section.
    #[must_use]
    pub fn from_config(config: &aivis_core::BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            window_width: config.window_width,
            window_height: config.window_height,
            chrome_executable: config.chrome_executable.clone(),
        }
    }

    /// Visible-window launcher for interactive logins.
    #[must_use]
    pub fn headful(window_width: u32, window_height: u32) -> Self {
        Self {
            headless: false,
            window_width,
            window_height,
            chrome_executable: None,
        }
    }

    /// Use a specific Chrome binary instead of auto-detection.
    #[must_use]
    pub fn with_executable(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_executable = path;
        self
    }

    fn chromium_config(&self) -> Result<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(self.window_width, self.window_height)
            .args(STEALTH_ARGS);

        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::ChromiumError)
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Instance = ChromeBrowser;

    async fn launch(&self) -> Result<ChromeBrowser> {
        tracing::info!(headless = self.headless, "Launching new browser instance");

        let (browser, mut handler) = Browser::launch(self.chromium_config()?)
            .await
            .map_err(BrowserError::chromium)?;

        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);

        // The handler stream ends when the CDP connection drops
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
            flag.store(false, Ordering::SeqCst);
            tracing::warn!("Browser disconnected");
        });

        Ok(ChromeBrowser {
            browser: Mutex::new(browser),
            connected,
        })
    }
}

/// A Chrome process driven over CDP.
pub struct ChromeBrowser {
    browser: Mutex<Browser>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for ChromeBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeBrowser")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl BrowserInstance for ChromeBrowser {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage> {
        if !self.is_connected() {
            return Err(BrowserError::Disconnected);
        }
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(BrowserError::chromium)?;
        Ok(ChromePage::new(page))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if self.is_connected() {
            browser.close().await.map_err(BrowserError::chromium)?;
        }
        // Reap the child process
        let _ = browser.wait().await;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stealth_args_hide_automation() {
        assert!(STEALTH_ARGS.contains(&"--disable-blink-features=AutomationControlled"));
    }

    #[test]
    fn test_launcher_from_config() {
        let config = aivis_core::BrowserConfig {
            headless: false,
            window_width: 1280,
            window_height: 720,
            ..aivis_core::BrowserConfig::default()
        };
        let launcher = ChromeLauncher::from_config(&config);
        assert!(!launcher.headless);
        assert_eq!((launcher.window_width, launcher.window_height), (1280, 720));
    }
}
