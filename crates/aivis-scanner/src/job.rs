//! Queue-side wrapper around a scan.
//!
//! The runner owns the scan record's lifecycle: it marks the scan running,
//! forwards progress into the store from a background task, and records the
//! final outcome. Transient failures are retried with exponential backoff.

use crate::error::Result;
use crate::orchestrator::{ScanExecutor, ScanRequest};
use crate::progress::{ChannelProgressSink, ProgressSink, ScanProgress};
use crate::report::Report;
use crate::store::ScanStore;
use aivis_core::{JobConfig, Timestamp};
use std::sync::Arc;
use std::time::Duration;

/// Buffered progress updates between the scan and the store writer.
const PROGRESS_BUFFER: usize = 256;

/// Cap on the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Runs queued scans to completion.
pub struct ScanJobRunner {
    executor: Arc<dyn ScanExecutor>,
    max_attempts: u32,
    backoff_base: Duration,
    observer: Option<Arc<dyn ProgressSink>>,
}

impl ScanJobRunner {
    #[must_use]
    pub fn new(executor: Arc<dyn ScanExecutor>, config: &JobConfig) -> Self {
        Self {
            executor,
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            observer: None,
        }
    }

    /// Also send every progress update to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Delay before attempt `attempt + 1`, doubling from the base.
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.backoff_base.saturating_mul(1 << shift)
    }

    /// Run `job`, recording its lifecycle in `store`.
    ///
    /// The scan ends COMPLETED with the report, or FAILED with the last
    /// error once retries are used up or the error is not retryable.
    pub async fn run(&self, job: ScanRequest, store: Arc<dyn ScanStore>) -> Result<Report> {
        let scan_id = job.scan_id.clone();
        tracing::info!(scan_id = %scan_id, "Processing scan job");

        let mut attempt = 1;
        let outcome = loop {
            match self.attempt(&job, &store).await {
                Ok(report) => break Ok(report),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        scan_id = %scan_id,
                        "Scan attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(report) => {
                store
                    .mark_completed(&scan_id, &report, Timestamp::now())
                    .await?;
                tracing::info!(
                    scan_id = %scan_id,
                    score = report.overall_score,
                    "Scan completed successfully"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(scan_id = %scan_id, attempts = attempt, "Scan failed: {}", e);
                if let Err(store_err) = store
                    .mark_failed(&scan_id, &e.to_string(), Timestamp::now())
                    .await
                {
                    tracing::error!(scan_id = %scan_id, "Could not record scan failure: {}", store_err);
                }
                Err(e)
            }
        }
    }

    async fn attempt(&self, job: &ScanRequest, store: &Arc<dyn ScanStore>) -> Result<Report> {
        store
            .mark_running(&job.scan_id, Timestamp::now(), "Initializing scan...")
            .await?;

        let (sink, mut rx) = ChannelProgressSink::channel(PROGRESS_BUFFER);
        let writer_store = Arc::clone(store);
        let observer = self.observer.clone();
        let scan_id = job.scan_id.clone();

        let writer = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                if let Some(observer) = &observer {
                    forward(observer.as_ref(), &progress);
                }
                if let Err(e) = writer_store.update_progress(&scan_id, &progress).await {
                    tracing::warn!(scan_id = %scan_id, "Failed to store progress: {}", e);
                }
            }
        });

        let outcome = self.executor.execute(job, &sink).await;

        // Closing the channel lets the writer drain and exit
        drop(sink);
        if let Err(e) = writer.await {
            tracing::warn!(scan_id = %job.scan_id, "Progress writer stopped: {}", e);
        }

        outcome
    }
}

fn forward(observer: &dyn ProgressSink, progress: &ScanProgress) {
    if let Err(e) = observer.send(progress.clone()) {
        tracing::warn!("Progress observer rejected update: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::progress::NoopProgressSink;
    use async_trait::async_trait;

    struct NeverRuns;

    #[async_trait]
    impl ScanExecutor for NeverRuns {
        async fn execute(&self, _request: &ScanRequest, _sink: &dyn ProgressSink) -> Result<Report> {
            Err(ScanError::InvalidRequest("unused".to_string()))
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let runner = ScanJobRunner::new(Arc::new(NeverRuns), &JobConfig::default())
            .with_observer(Arc::new(NoopProgressSink));
        assert_eq!(runner.backoff(1), Duration::from_secs(5));
        assert_eq!(runner.backoff(2), Duration::from_secs(10));
        assert_eq!(runner.backoff(3), Duration::from_secs(20));
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let config = JobConfig {
            max_attempts: 0,
            backoff_base_ms: 10,
        };
        let runner = ScanJobRunner::new(Arc::new(NeverRuns), &config);
        assert_eq!(runner.max_attempts, 1);
    }
}
