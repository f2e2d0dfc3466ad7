//! Aivis Engines - one adapter per AI answer surface.
//!
//! Every surface is queried through the same [`EngineAdapter`] contract:
//!
//! - [`conversational`] - ChatGPT through a pooled, cookie-authenticated browser
//! - [`search_overview`] - Google AI overview through a SERP API
//! - [`scraping_proxy`] - Perplexity through a render-and-scrape service
//!
//! Adapters without a credential fall back to canned answers (or, for the
//! scraping proxy, an explanatory message) so scans still complete.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod cleanup;
pub mod conversational;
pub mod error;
pub mod screenshot;
pub mod scraping_proxy;
pub mod search_overview;
pub mod simulated;

pub use adapter::{EngineAdapter, EngineResponse};
pub use cleanup::extract_answer;
pub use conversational::{ConversationTiming, ConversationalAdapter};
pub use error::{EngineError, EngineErrorKind, Result};
pub use screenshot::ScreenshotStore;
pub use scraping_proxy::ScrapingProxyAdapter;
pub use search_overview::SearchOverviewAdapter;
