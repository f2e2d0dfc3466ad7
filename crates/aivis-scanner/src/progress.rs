//! Scan progress events and the sinks that receive them.
//!
//! Sinks are called inline on the orchestrator's path, so they must return
//! immediately. A failing sink never fails the scan: [`emit`] logs the error
//! and moves on.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Completion in `[0, 100]`
    pub percent: u8,
    /// Human-readable current step
    pub step: String,
}

impl ScanProgress {
    #[must_use]
    pub fn new(percent: u8, step: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            step: step.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("progress receiver dropped")]
    Closed,

    #[error("progress buffer full")]
    Full,

    #[error("progress rejected: {0}")]
    Rejected(String),
}

/// Receiver of scan progress.
pub trait ProgressSink: Send + Sync {
    /// Deliver one update without blocking.
    fn send(&self, progress: ScanProgress) -> Result<(), SinkError>;
}

/// Forwards progress into a bounded `tokio` channel.
///
/// Uses `try_send`, so a full buffer drops the update instead of waiting.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ScanProgress>,
}

impl ChannelProgressSink {
    #[must_use]
    pub fn new(tx: mpsc::Sender<ScanProgress>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving half of its channel.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ScanProgress>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn send(&self, progress: ScanProgress) -> Result<(), SinkError> {
        self.tx.try_send(progress).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Calls a closure for every update.
pub struct FnProgressSink<F> {
    f: F,
}

impl<F> FnProgressSink<F>
where
    F: Fn(ScanProgress) -> Result<(), SinkError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ProgressSink for FnProgressSink<F>
where
    F: Fn(ScanProgress) -> Result<(), SinkError> + Send + Sync,
{
    fn send(&self, progress: ScanProgress) -> Result<(), SinkError> {
        (self.f)(progress)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn send(&self, _progress: ScanProgress) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Send `progress` to `sink`, logging and swallowing any failure.
pub fn emit(sink: &dyn ProgressSink, percent: u8, step: impl Into<String>) {
    let progress = ScanProgress::new(percent, step);
    tracing::debug!(percent = progress.percent, step = %progress.step, "Scan progress");
    if let Err(e) = sink.send(progress) {
        tracing::warn!("Dropped progress update: {}", e);
    }
}
