//! Persistence seam for scan records.
//!
//! The job runner only needs status transitions and progress writes. Real
//! deployments back this with their own database; [`InMemoryScanStore`] is
//! used by the CLI and tests.

use crate::report::Report;
use crate::progress::ScanProgress;
use aivis_core::{ClientId, ScanId, ScanStatus, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scan not found: {0}")]
    NotFound(ScanId),

    #[error("scan {id} is already {status}")]
    Terminal { id: ScanId, status: ScanStatus },

    #[error("scan store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the failure may clear up on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Stored state of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub client_id: ClientId,
    pub status: ScanStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl ScanRecord {
    /// A freshly requested scan waiting for a worker.
    #[must_use]
    pub fn queued(id: ScanId, client_id: ClientId) -> Self {
        Self {
            id,
            client_id,
            status: ScanStatus::Queued,
            progress: 0,
            current_step: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Scan persistence used by [`crate::ScanJobRunner`].
///
/// Records in a terminal status must reject further writes.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn mark_running(&self, id: &ScanId, started_at: Timestamp, step: &str) -> StoreResult<()>;

    async fn update_progress(&self, id: &ScanId, progress: &ScanProgress) -> StoreResult<()>;

    async fn mark_completed(
        &self,
        id: &ScanId,
        report: &Report,
        completed_at: Timestamp,
    ) -> StoreResult<()>;

    async fn mark_failed(&self, id: &ScanId, error: &str, completed_at: Timestamp)
        -> StoreResult<()>;
}

#[derive(Default)]
struct Inner {
    records: HashMap<ScanId, ScanRecord>,
    reports: HashMap<ScanId, Report>,
}

/// Process-local [`ScanStore`].
#[derive(Default)]
pub struct InMemoryScanStore {
    inner: Mutex<Inner>,
}

impl InMemoryScanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued scan. Replaces any record with the same id.
    pub async fn create(&self, id: ScanId, client_id: ClientId) -> ScanRecord {
        let record = ScanRecord::queued(id.clone(), client_id);
        let mut inner = self.inner.lock().await;
        inner.reports.remove(&id);
        inner.records.insert(id, record.clone());
        record
    }

    pub async fn get(&self, id: &ScanId) -> Option<ScanRecord> {
        self.inner.lock().await.records.get(id).cloned()
    }

    /// Report stored when the scan completed.
    pub async fn report(&self, id: &ScanId) -> Option<Report> {
        self.inner.lock().await.reports.get(id).cloned()
    }

    async fn update<F>(&self, id: &ScanId, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut ScanRecord) + Send,
    {
        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if record.status.is_terminal() {
            return Err(StoreError::Terminal {
                id: id.clone(),
                status: record.status,
            });
        }
        f(record);
        Ok(())
    }
}

#[async_trait]
impl ScanStore for InMemoryScanStore {
    async fn mark_running(&self, id: &ScanId, started_at: Timestamp, step: &str) -> StoreResult<()> {
        self.update(id, |record| {
            record.status = ScanStatus::Running;
            record.started_at = Some(started_at);
            record.current_step = Some(step.to_string());
        })
        .await
    }

    async fn update_progress(&self, id: &ScanId, progress: &ScanProgress) -> StoreResult<()> {
        self.update(id, |record| {
            record.progress = progress.percent;
            record.current_step = Some(progress.step.clone());
        })
        .await
    }

    async fn mark_completed(
        &self,
        id: &ScanId,
        report: &Report,
        completed_at: Timestamp,
    ) -> StoreResult<()> {
        self.update(id, |record| {
            record.status = ScanStatus::Completed;
            record.progress = 100;
            record.current_step = Some("Scan completed successfully".to_string());
            record.completed_at = Some(completed_at);
        })
        .await?;
        self.inner
            .lock()
            .await
            .reports
            .insert(id.clone(), report.clone());
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &ScanId,
        error: &str,
        completed_at: Timestamp,
    ) -> StoreResult<()> {
        self.update(id, |record| {
            record.status = ScanStatus::Failed;
            record.error = Some(error.to_string());
            record.current_step = Some(format!("Failed: {error}"));
            record.completed_at = Some(completed_at);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ScanId, ClientId) {
        (ScanId::new("scan-1").unwrap(), ClientId::new("client-1").unwrap())
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let store = InMemoryScanStore::new();
        let (scan, client) = ids();
        store.create(scan.clone(), client).await;

        store
            .mark_running(&scan, Timestamp::now(), "Initializing scan...")
            .await
            .unwrap();
        store
            .update_progress(&scan, &ScanProgress::new(40, "Processing prompt 2/3"))
            .await
            .unwrap();

        let record = store.get(&scan).await.unwrap();
        assert_eq!(record.status, ScanStatus::Running);
        assert_eq!(record.progress, 40);
        assert!(record.started_at.is_some());

        store
            .mark_failed(&scan, "no prompts", Timestamp::now())
            .await
            .unwrap();
        let record = store.get(&scan).await.unwrap();
        assert_eq!(record.status, ScanStatus::Failed);
        assert_eq!(record.current_step.as_deref(), Some("Failed: no prompts"));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_records_reject_writes() {
        let store = InMemoryScanStore::new();
        let (scan, client) = ids();
        store.create(scan.clone(), client).await;
        store
            .mark_failed(&scan, "boom", Timestamp::now())
            .await
            .unwrap();

        let err = store
            .update_progress(&scan, &ScanProgress::new(50, "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Terminal { status: ScanStatus::Failed, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unknown_scan() {
        let store = InMemoryScanStore::new();
        let (scan, _) = ids();
        let err = store
            .mark_running(&scan, Timestamp::now(), "Initializing scan...")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
