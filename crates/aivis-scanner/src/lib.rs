//! Aivis Scanner - visibility scan orchestration.
//!
//! This crate drives a scan end to end: every prompt is asked of every AI
//! answer surface, the answers are classified for the tracked brand, and the
//! results are aggregated into a scored [`Report`].
//!
//! # Features
//!
//! - Prompts run sequentially with randomized pauses; engines per prompt run concurrently
//! - Engine failures degrade to error results instead of aborting the scan
//! - Progress events delivered to a non-blocking [`ProgressSink`]
//! - Job runner with scan status tracking and retry of transient failures
//! - CSV prompt import and template prompt generation
//! - Single-engine keyword discovery bucketed by mention type
//!
//! # Example
//!
//! ```rust,ignore
//! use aivis_scanner::{EngineAdapters, ScanOrchestrator, ScanRequest, NoopProgressSink};
//!
//! let orchestrator = ScanOrchestrator::new(EngineAdapters {
//!     chat_gpt,
//!     perplexity,
//!     google_aio,
//! });
//!
//! let report = orchestrator.run_scan(&request, &NoopProgressSink).await?;
//! println!("Visibility score: {}", report.overall_score);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod discovery;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use discovery::{
    DiscoveredPrompt, DiscoveryDepth, DiscoveryReport, DiscoveryRequest, DiscoverySummary,
    FailedPrompt, KeywordDiscovery, MissedPrompt,
};
pub use error::{Result, ScanError};
pub use job::ScanJobRunner;
pub use orchestrator::{EngineAdapters, ScanExecutor, ScanOrchestrator, ScanPacing, ScanRequest};
pub use progress::{
    emit, ChannelProgressSink, FnProgressSink, NoopProgressSink, ProgressSink, ScanProgress,
    SinkError,
};
pub use prompts::{
    generate_from_templates, merge_prompts, parse_prompt_csv, validate_prompts, CsvPrompt,
    ParsedPrompts, PromptMerge, CSV_TEMPLATE,
};
pub use report::{overall_score, Report};
pub use store::{InMemoryScanStore, ScanRecord, ScanStore, StoreError, StoreResult};
