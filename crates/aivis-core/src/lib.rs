//! Aivis Core - Foundation crate for the AI visibility scanner.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other Aivis crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`Engine`, `MentionType`, `Credential`, `Timestamp`)
//! - [`results`] - Per-prompt, per-engine scan results
//!
//! # Example
//!
//! ```rust
//! use aivis_core::{AppConfig, Engine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! for engine in Engine::ALL {
//!     println!("{} -> {}", engine, engine.slug());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod results;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, EngineApiConfig, JobConfig, ScanningConfig, StorageConfig,
};
pub use error::{AivisError, ConfigError, ConfigResult, Result};
pub use results::{EngineResult, PromptResult};
pub use types::{
    ClientId, ClientProfile, Credential, Engine, MentionType, ScanCredentials, ScanId, ScanStatus,
    Timestamp,
};
