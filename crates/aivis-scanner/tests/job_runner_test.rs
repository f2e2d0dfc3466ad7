use aivis_core::{
    ClientId, ClientProfile, Credential, Engine, JobConfig, ScanCredentials, ScanId, ScanStatus,
};
use aivis_engines::{EngineAdapter, EngineError, EngineResponse};
use aivis_scanner::{
    EngineAdapters, FnProgressSink, InMemoryScanStore, ProgressSink, Report, ScanError,
    ScanExecutor, ScanJobRunner, ScanOrchestrator, ScanPacing, ScanProgress, ScanRequest,
    ScanStore,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

struct FixedAdapter(Engine);

#[async_trait]
impl EngineAdapter for FixedAdapter {
    fn engine(&self) -> Engine {
        self.0
    }

    async fn scan(
        &self,
        _prompt: &str,
        _credential: Option<&Credential>,
    ) -> aivis_engines::Result<EngineResponse> {
        Ok(EngineResponse::text("Acme Co is a reliable choice for most homeowners."))
    }
}

fn orchestrator() -> ScanOrchestrator {
    ScanOrchestrator::new(EngineAdapters {
        chat_gpt: Arc::new(FixedAdapter(Engine::ChatGpt)),
        perplexity: Arc::new(FixedAdapter(Engine::Perplexity)),
        google_aio: Arc::new(FixedAdapter(Engine::GoogleAio)),
    })
    .with_pacing(ScanPacing::none())
}

/// Fails with queued errors before delegating to a real orchestrator.
struct FlakyExecutor {
    failures: Mutex<VecDeque<ScanError>>,
    calls: AtomicU32,
    inner: ScanOrchestrator,
}

impl FlakyExecutor {
    fn new(failures: Vec<ScanError>) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures.into()),
            calls: AtomicU32::new(0),
            inner: orchestrator(),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanExecutor for FlakyExecutor {
    async fn execute(
        &self,
        request: &ScanRequest,
        sink: &dyn ProgressSink,
    ) -> aivis_scanner::Result<Report> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.run_scan(request, sink).await
    }
}

fn rate_limited() -> ScanError {
    ScanError::Engine(EngineError::RateLimited {
        engine: Engine::GoogleAio,
        message: "SERP API rate limit exceeded".to_string(),
    })
}

fn job_config() -> JobConfig {
    JobConfig {
        max_attempts: 3,
        backoff_base_ms: 1,
    }
}

fn job() -> ScanRequest {
    ScanRequest {
        scan_id: ScanId::new("scan-42").unwrap(),
        client: ClientProfile {
            id: ClientId::new("client-1").unwrap(),
            name: "Acme Co".to_string(),
            domain: Some("acme.com".to_string()),
            competitors: vec![],
        },
        prompts: vec!["best plumbers".to_string(), "top plumbers".to_string()],
        credentials: ScanCredentials::default(),
    }
}

async fn queued_store() -> Arc<InMemoryScanStore> {
    let store = Arc::new(InMemoryScanStore::new());
    store
        .create(ScanId::new("scan-42").unwrap(), ClientId::new("client-1").unwrap())
        .await;
    store
}

#[tokio::test]
async fn test_successful_job_completes() {
    let store = queued_store().await;
    let runner = ScanJobRunner::new(Arc::new(orchestrator()), &job_config());

    let report = runner
        .run(job(), Arc::clone(&store) as Arc<dyn ScanStore>)
        .await
        .unwrap();
    assert_eq!(report.prompt_count, 2);
    assert_eq!(report.mentioned_count, 6);

    let record = store.get(&report.scan_id).await.unwrap();
    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.progress, 100);
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());
    assert!(record.error.is_none());
    assert_eq!(store.report(&report.scan_id).await, Some(report));
}

#[tokio::test]
async fn test_observer_sees_progress() {
    let store = queued_store().await;
    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let observer = FnProgressSink::new(move |p: ScanProgress| {
        recorded.lock().unwrap().push(p.percent);
        Ok(())
    });

    let runner = ScanJobRunner::new(Arc::new(orchestrator()), &job_config())
        .with_observer(Arc::new(observer));
    runner.run(job(), store).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&5));
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let store = queued_store().await;
    let executor = FlakyExecutor::new(vec![rate_limited(), rate_limited()]);
    let runner = ScanJobRunner::new(Arc::clone(&executor) as Arc<dyn ScanExecutor>, &job_config());

    let report = runner.run(job(), Arc::clone(&store) as Arc<dyn ScanStore>).await;

    assert!(report.is_ok());
    assert_eq!(executor.calls(), 3);
    let record = store.get(&ScanId::new("scan-42").unwrap()).await.unwrap();
    assert_eq!(record.status, ScanStatus::Completed);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let store = queued_store().await;
    let executor = FlakyExecutor::new(vec![rate_limited(), rate_limited(), rate_limited()]);
    let runner = ScanJobRunner::new(Arc::clone(&executor) as Arc<dyn ScanExecutor>, &job_config());

    let err = runner
        .run(job(), Arc::clone(&store) as Arc<dyn ScanStore>)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(executor.calls(), 3);
    let record = store.get(&ScanId::new("scan-42").unwrap()).await.unwrap();
    assert_eq!(record.status, ScanStatus::Failed);
    assert!(record
        .current_step
        .as_deref()
        .is_some_and(|step| step.starts_with("Failed: ")));
}

#[tokio::test]
async fn test_auth_expired_is_not_retried() {
    let store = queued_store().await;
    let executor = FlakyExecutor::new(vec![ScanError::Engine(EngineError::AuthExpired {
        engine: Engine::ChatGpt,
        message: "redirected to login".to_string(),
    })]);
    let runner = ScanJobRunner::new(Arc::clone(&executor) as Arc<dyn ScanExecutor>, &job_config());

    let err = runner
        .run(job(), Arc::clone(&store) as Arc<dyn ScanStore>)
        .await
        .unwrap_err();

    assert_eq!(executor.calls(), 1);
    let record = store.get(&ScanId::new("scan-42").unwrap()).await.unwrap();
    assert_eq!(record.status, ScanStatus::Failed);
    assert_eq!(record.error, Some(err.to_string()));
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn test_invalid_request_fails_job() {
    let store = queued_store().await;
    let runner = ScanJobRunner::new(Arc::new(orchestrator()), &job_config());
    let mut request = job();
    request.prompts.clear();

    let err = runner
        .run(request, Arc::clone(&store) as Arc<dyn ScanStore>)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::InvalidRequest(_)));
    let record = store.get(&ScanId::new("scan-42").unwrap()).await.unwrap();
    assert_eq!(record.status, ScanStatus::Failed);
}

#[tokio::test]
async fn test_unknown_scan_fails_without_running() {
    let store = Arc::new(InMemoryScanStore::new());
    let executor = FlakyExecutor::new(vec![]);
    let runner = ScanJobRunner::new(Arc::clone(&executor) as Arc<dyn ScanExecutor>, &job_config());

    let err = runner.run(job(), store).await.unwrap_err();

    assert!(matches!(err, ScanError::Store(_)));
    assert_eq!(executor.calls(), 0);
}
