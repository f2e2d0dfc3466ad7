//! Browser automation for bot-resistant AI answer surfaces.
//!
//! Provides a bounded, recycling pool of Chrome processes with stealth launch
//! arguments and per-page fingerprint randomization, plus the page-level
//! action trait engine adapters are written against.

pub mod actions;
pub mod error;
pub mod fingerprint;
pub mod launcher;
pub mod pool;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use actions::{extract_domain, BrowserActions, ChromePage, SessionCookie};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use launcher::{BrowserInstance, BrowserLauncher, ChromeBrowser, ChromeLauncher};
pub use pool::{BrowserPool, PoolSettings, PoolStats, PooledBrowser};

/// The production pool type.
pub type ChromePool = BrowserPool<ChromeLauncher>;
