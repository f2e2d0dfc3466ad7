//! Subcommand implementations.

pub mod config;
pub mod connect;
pub mod discover;
pub mod prompts;
pub mod scan;
pub mod validate;

use aivis_browser::{ChromeLauncher, ChromePool, PoolSettings};
use aivis_core::{AivisError, AppConfig, Credential};
use aivis_engines::{
    ConversationTiming, ConversationalAdapter, ScrapingProxyAdapter, ScreenshotStore,
    SearchOverviewAdapter,
};
use aivis_scanner::{EngineAdapters, ProgressSink, ScanProgress};
use std::sync::Arc;
use tracing::info;

/// Headless Chrome pool sized from the `[browser]` section.
pub(crate) fn chrome_pool(config: &AppConfig) -> ChromePool {
    ChromePool::new(
        ChromeLauncher::from_config(&config.browser),
        PoolSettings::from_config(&config.browser),
    )
}

/// Wrap an optional secret from the command line or environment.
pub(crate) fn credential(value: Option<&String>) -> Option<Credential> {
    value.and_then(|v| Credential::new(v.as_str()))
}

/// The three production adapters, sharing `pool` and the screenshot directory.
pub(crate) fn engine_adapters(
    config: &AppConfig,
    pool: &ChromePool,
) -> Result<EngineAdapters, AivisError> {
    let screenshots = ScreenshotStore::from_config(&config.storage);
    Ok(EngineAdapters {
        chat_gpt: Arc::new(ConversationalAdapter::new(
            pool.clone(),
            screenshots.clone(),
            ConversationTiming::from_config(&config.scanning),
        )),
        perplexity: Arc::new(ScrapingProxyAdapter::from_config(&config.engines, screenshots)?),
        google_aio: Arc::new(SearchOverviewAdapter::from_config(&config.engines)?),
    })
}

/// Progress sink that logs each update.
pub(crate) fn progress_log() -> impl ProgressSink {
    aivis_scanner::FnProgressSink::new(|p: ScanProgress| {
        info!("[{:>3}%] {}", p.percent, p.step);
        Ok(())
    })
}
