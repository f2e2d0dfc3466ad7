//! Scan orchestrator for driving one visibility scan.
//!
//! This module provides the `ScanOrchestrator`, which walks the prompts of a
//! scan one at a time, asks every engine each prompt concurrently, analyzes
//! the answers and aggregates them into a [`Report`].

use crate::error::{Result, ScanError};
use crate::progress::{emit, ProgressSink};
use crate::report::Report;
use aivis_analysis::analyze_response;
use aivis_core::{
    ClientProfile, Engine, EngineResult, PromptResult, ScanCredentials, ScanId,
    ScanningConfig,
};
use aivis_engines::{EngineAdapter, EngineResponse};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Share of the progress bar spent before the first prompt.
const INIT_PERCENT: f64 = 5.0;

/// Share of the progress bar spread over the prompts.
const PROMPTS_PERCENT: f64 = 90.0;

/// Progress reported while the report is built.
const AGGREGATION_PERCENT: u8 = 95;

/// Chars of a prompt shown in logs.
const PROMPT_LOG_CHARS: usize = 50;

/// Everything needed to run one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Scan identifier assigned by the caller
    pub scan_id: ScanId,
    /// Brand being tracked
    pub client: ClientProfile,
    /// Prompts in scan order
    pub prompts: Vec<String>,
    /// Decrypted per-user credentials
    pub credentials: ScanCredentials,
}

/// Anything that can turn a [`ScanRequest`] into a [`Report`].
///
/// [`ScanOrchestrator`] is the production implementation; the job runner
/// depends only on this trait.
#[async_trait]
pub trait ScanExecutor: Send + Sync {
    async fn execute(&self, request: &ScanRequest, sink: &dyn ProgressSink) -> Result<Report>;
}

/// Delays that keep the scan from looking like a burst of automation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPacing {
    /// Stagger engine starts within a prompt
    pub stagger_engines: bool,
    /// Lower bound of the pause between prompts
    pub prompt_delay_min_ms: u64,
    /// Upper bound of the pause between prompts
    pub prompt_delay_max_ms: u64,
}

impl ScanPacing {
    /// Inter-prompt pause from config, with staggered engine starts.
    #[must_use]
    pub fn from_config(config: &ScanningConfig) -> Self {
        Self {
            stagger_engines: true,
            prompt_delay_min_ms: config.scan_delay_min_ms,
            prompt_delay_max_ms: config.scan_delay_max_ms.max(config.scan_delay_min_ms),
        }
    }

    /// No delays at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            stagger_engines: false,
            prompt_delay_min_ms: 0,
            prompt_delay_max_ms: 0,
        }
    }

    /// Randomized start offset for an engine within a prompt.
    fn stagger_delay(&self, engine: Engine) -> Duration {
        if !self.stagger_engines {
            return Duration::ZERO;
        }
        let (min, max) = match engine {
            Engine::ChatGpt => (0, 0),
            Engine::GoogleAio => (500, 1500),
            Engine::Perplexity => (1000, 2000),
        };
        random_duration(min, max)
    }

    pub(crate) fn prompt_delay(&self) -> Duration {
        random_duration(self.prompt_delay_min_ms, self.prompt_delay_max_ms)
    }
}

impl Default for ScanPacing {
    fn default() -> Self {
        Self::from_config(&ScanningConfig::default())
    }
}

fn random_duration(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Intra-prompt progress marks (percent of one prompt) at engine start and finish.
fn engine_marks(engine: Engine) -> (f64, f64) {
    match engine {
        Engine::ChatGpt => (10.0, 33.0),
        Engine::GoogleAio => (15.0, 100.0),
        Engine::Perplexity => (20.0, 66.0),
    }
}

/// The three engine adapters a scan fans out to.
#[derive(Clone)]
pub struct EngineAdapters {
    pub chat_gpt: Arc<dyn EngineAdapter>,
    pub perplexity: Arc<dyn EngineAdapter>,
    pub google_aio: Arc<dyn EngineAdapter>,
}

impl EngineAdapters {
    /// The adapter for one engine.
    #[must_use]
    pub fn get(&self, engine: Engine) -> Arc<dyn EngineAdapter> {
        match engine {
            Engine::ChatGpt => Arc::clone(&self.chat_gpt),
            Engine::Perplexity => Arc::clone(&self.perplexity),
            Engine::GoogleAio => Arc::clone(&self.google_aio),
        }
    }
}

/// Position within the scan, used for progress and logging.
struct PromptContext<'a> {
    scan_id: &'a ScanId,
    index: usize,
    total: usize,
    prompt: &'a str,
}

impl PromptContext<'_> {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn percent(&self, engine_percent: f64) -> u8 {
        let per_prompt = PROMPTS_PERCENT / self.total as f64;
        let value = INIT_PERCENT
            + self.index as f64 * per_prompt
            + engine_percent * per_prompt / 100.0;
        value.round().clamp(0.0, 100.0) as u8
    }

    fn label(&self) -> String {
        format!("prompt {}/{}", self.index + 1, self.total)
    }
}

/// Drives a full scan across all engines.
pub struct ScanOrchestrator {
    adapters: EngineAdapters,
    pacing: ScanPacing,
}

impl ScanOrchestrator {
    /// Create a new scan orchestrator with default pacing.
    #[must_use]
    pub fn new(adapters: EngineAdapters) -> Self {
        Self {
            adapters,
            pacing: ScanPacing::default(),
        }
    }

    /// Set the pacing between prompts and engine starts.
    #[must_use]
    pub fn with_pacing(mut self, pacing: ScanPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run every prompt against every engine and build the report.
    ///
    /// Engine failures become degraded results; only an invalid request
    /// aborts the scan.
    pub async fn run_scan(
        &self,
        request: &ScanRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Report> {
        if request.client.name.trim().is_empty() {
            return Err(ScanError::InvalidRequest("client name is empty".to_string()));
        }
        if request.prompts.is_empty() {
            return Err(ScanError::InvalidRequest("scan has no prompts".to_string()));
        }

        let scan_id = &request.scan_id;
        let total = request.prompts.len();
        tracing::info!(
            scan_id = %scan_id,
            client = %request.client.name,
            prompts = total,
            "Starting scan"
        );
        emit(sink, 5, "Starting scan...");

        let mut prompt_results = Vec::with_capacity(total);
        for (index, prompt) in request.prompts.iter().enumerate() {
            let ctx = PromptContext {
                scan_id,
                index,
                total,
                prompt,
            };
            tracing::info!(
                scan_id = %scan_id,
                prompt_index = index + 1,
                "Processing prompt {}: \"{}\"",
                ctx.label(),
                prompt.chars().take(PROMPT_LOG_CHARS).collect::<String>()
            );
            emit(sink, ctx.percent(0.0), format!("Processing {}", ctx.label()));

            prompt_results.push(self.scan_prompt(&ctx, request, sink).await);

            if index + 1 < total {
                let delay = self.pacing.prompt_delay();
                if !delay.is_zero() {
                    tracing::debug!(scan_id = %scan_id, "Pausing {:?} before next prompt", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        emit(sink, AGGREGATION_PERCENT, "Analyzing results and generating report...");
        let report = Report::aggregate(scan_id.clone(), &request.client, prompt_results);
        emit(sink, 100, "Scan completed");

        tracing::info!(
            scan_id = %scan_id,
            score = report.overall_score,
            featured = report.featured_count,
            mentioned = report.mentioned_count,
            "Scan finished"
        );
        Ok(report)
    }

    /// Ask all three engines one prompt concurrently and wait for all of them.
    async fn scan_prompt(
        &self,
        ctx: &PromptContext<'_>,
        request: &ScanRequest,
        sink: &dyn ProgressSink,
    ) -> PromptResult {
        let (chat_gpt, perplexity, google_aio) = futures::join!(
            self.scan_engine(ctx, self.adapters.chat_gpt.as_ref(), request, sink),
            self.scan_engine(ctx, self.adapters.perplexity.as_ref(), request, sink),
            self.scan_engine(ctx, self.adapters.google_aio.as_ref(), request, sink),
        );

        PromptResult {
            prompt: ctx.prompt.to_string(),
            engine_results: vec![chat_gpt, perplexity, google_aio],
        }
    }

    async fn scan_engine(
        &self,
        ctx: &PromptContext<'_>,
        adapter: &dyn EngineAdapter,
        request: &ScanRequest,
        sink: &dyn ProgressSink,
    ) -> EngineResult {
        let engine = adapter.engine();
        let (start_mark, done_mark) = engine_marks(engine);

        let delay = self.pacing.stagger_delay(engine);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        emit(
            sink,
            ctx.percent(start_mark),
            format!("Scanning {engine}: {}", ctx.label()),
        );

        match adapter
            .scan(ctx.prompt, request.credentials.for_engine(engine))
            .await
        {
            Ok(response) => {
                emit(
                    sink,
                    ctx.percent(done_mark),
                    format!("{engine} done: {}", ctx.label()),
                );
                analyze(engine, response, &request.client)
            }
            Err(e) => {
                tracing::error!(
                    scan_id = %ctx.scan_id,
                    engine = %engine,
                    prompt_index = ctx.index + 1,
                    "Engine scan failed: {}",
                    e
                );
                EngineResult::failed(engine, e.to_string())
            }
        }
    }
}

#[async_trait]
impl ScanExecutor for ScanOrchestrator {
    async fn execute(&self, request: &ScanRequest, sink: &dyn ProgressSink) -> Result<Report> {
        self.run_scan(request, sink).await
    }
}

/// Classify one successful response for the client.
fn analyze(engine: Engine, response: EngineResponse, client: &ClientProfile) -> EngineResult {
    let analysis = analyze_response(&response.response_text, client);

    EngineResult {
        engine,
        response_text: response.response_text,
        screenshot_ref: response.screenshot_ref,
        mention_type: analysis.mention.mention_type,
        ranking_position: analysis.mention.position,
        sentiment_score: analysis.sentiment.score,
        competitors_mentioned: analysis.competitors.mentioned,
        new_competitors_found: analysis.competitors.new_competitors,
        error: None,
    }
}
