//! Configuration management for Aivis.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/aivis/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser pool and automation settings
    pub browser: BrowserConfig,
    /// Scan pacing and timeout settings
    pub scanning: ScanningConfig,
    /// Screenshot storage settings
    pub storage: StorageConfig,
    /// Third-party API endpoints and fallback keys
    pub engines: EngineApiConfig,
    /// Job runner retry settings
    pub jobs: JobConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, using defaults if the file is absent.
    pub fn load_from(config_path: &std::path::Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `AIVIS_HEADLESS`: browser headless mode (true/false)
    /// - `AIVIS_BROWSER_POOL_SIZE`: maximum concurrent pooled browsers
    /// - `AIVIS_SCAN_DELAY_MIN_MS` / `AIVIS_SCAN_DELAY_MAX_MS`: inter-prompt pacing range
    /// - `AIVIS_PROMPT_TIMEOUT_MS`: conversational response wait budget
    /// - `AIVIS_SCREENSHOT_DIR`: screenshot output directory
    /// - `AIVIS_SERP_API_KEY` / `AIVIS_FIRECRAWL_API_KEY`: fallback API keys
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    ///
    /// Values that fail to parse are ignored and the configured value is kept.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(headless) = lookup("AIVIS_HEADLESS").and_then(|v| v.parse().ok()) {
            self.browser.headless = headless;
            tracing::debug!("Override browser.headless from env: {}", headless);
        }

        if let Some(size) = lookup("AIVIS_BROWSER_POOL_SIZE").and_then(|v| v.parse().ok()) {
            self.browser.pool_size = size;
            tracing::debug!("Override browser.pool_size from env: {}", size);
        }

        if let Some(ms) = lookup("AIVIS_SCAN_DELAY_MIN_MS").and_then(|v| v.parse().ok()) {
            self.scanning.scan_delay_min_ms = ms;
            tracing::debug!("Override scanning.scan_delay_min_ms from env: {}", ms);
        }

        if let Some(ms) = lookup("AIVIS_SCAN_DELAY_MAX_MS").and_then(|v| v.parse().ok()) {
            self.scanning.scan_delay_max_ms = ms;
            tracing::debug!("Override scanning.scan_delay_max_ms from env: {}", ms);
        }

        if let Some(ms) = lookup("AIVIS_PROMPT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.scanning.prompt_timeout_ms = ms;
            tracing::debug!("Override scanning.prompt_timeout_ms from env: {}", ms);
        }

        if let Some(dir) = lookup("AIVIS_SCREENSHOT_DIR").filter(|v| !v.is_empty()) {
            tracing::debug!("Override storage.screenshot_dir from env: {}", dir);
            self.storage.screenshot_dir = PathBuf::from(dir);
        }

        if let Some(key) = lookup("AIVIS_SERP_API_KEY").filter(|v| !v.is_empty()) {
            self.engines.serp_api_key = Some(key);
        }

        if let Some(key) = lookup("AIVIS_FIRECRAWL_API_KEY").filter(|v| !v.is_empty()) {
            self.engines.firecrawl_api_key = Some(key);
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.browser.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.pool_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.browser.max_uses_per_browser == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.max_uses_per_browser".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.scanning.scan_delay_min_ms > self.scanning.scan_delay_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "scanning.scan_delay_min_ms".to_string(),
                reason: format!(
                    "min delay {} exceeds max delay {}",
                    self.scanning.scan_delay_min_ms, self.scanning.scan_delay_max_ms
                ),
            });
        }

        if self.jobs.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jobs.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/aivis/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "aivis", "aivis").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/aivis`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "aivis", "aivis").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Browser pool and automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Maximum number of concurrently open pooled browsers
    pub pool_size: usize,
    /// Uses after which a pooled browser is closed and replaced
    pub max_uses_per_browser: u32,
    /// Run pooled browsers in headless mode
    pub headless: bool,
    /// How long `acquire` may wait for a free browser before giving up
    pub acquire_timeout_secs: u64,
    /// Fixed retry interval while the pool is saturated
    pub acquire_poll_ms: u64,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Explicit Chrome/Chromium binary (auto-detected when unset)
    pub chrome_executable: Option<PathBuf>,
}

impl BrowserConfig {
    /// Acquisition wait budget as a `Duration`.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Saturated-pool retry interval as a `Duration`.
    #[must_use]
    pub fn acquire_poll_interval(&self) -> Duration {
        Duration::from_millis(self.acquire_poll_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            max_uses_per_browser: 50,
            headless: true,
            acquire_timeout_secs: 300,
            acquire_poll_ms: 1000,
            window_width: 1920,
            window_height: 1080,
            chrome_executable: None,
        }
    }
}

/// Scan pacing and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Lower bound of the randomized pause between prompts
    pub scan_delay_min_ms: u64,
    /// Upper bound of the randomized pause between prompts
    pub scan_delay_max_ms: u64,
    /// Maximum time to wait for a conversational response to settle
    pub prompt_timeout_ms: u64,
    /// Interval between completion polls of a streaming response
    pub poll_interval_ms: u64,
}

impl ScanningConfig {
    /// Conversational wait budget as a `Duration`.
    #[must_use]
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_millis(self.prompt_timeout_ms)
    }

    /// Completion poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            scan_delay_min_ms: 3000,
            scan_delay_max_ms: 8000,
            prompt_timeout_ms: 60_000,
            poll_interval_ms: 2000,
        }
    }
}

/// Screenshot storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where PNG screenshots are written
    pub screenshot_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("./screenshots"),
        }
    }
}

/// Third-party API endpoints used by the API-backed engines.
///
/// Keys here are process-wide fallbacks; per-user keys supplied with a scan
/// take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineApiConfig {
    /// SERP API search endpoint (Google AI overview)
    pub serp_api_url: String,
    /// Firecrawl scrape endpoint (Perplexity rendering)
    pub firecrawl_api_url: String,
    /// Fallback SERP API key
    pub serp_api_key: Option<String>,
    /// Fallback Firecrawl API key
    pub firecrawl_api_key: Option<String>,
    /// HTTP request timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for EngineApiConfig {
    fn default() -> Self {
        Self {
            serp_api_url: "https://serpapi.com/search.json".to_string(),
            firecrawl_api_url: "https://api.firecrawl.dev/v1/scrape".to_string(),
            serp_api_key: None,
            firecrawl_api_key: None,
            http_timeout_secs: 90,
        }
    }
}

/// Job runner retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Total attempts for a scan that fails with a transient error
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts
    pub backoff_base_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 5000,
        }
    }
}
