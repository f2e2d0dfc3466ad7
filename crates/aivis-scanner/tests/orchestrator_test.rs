use aivis_core::{
    ClientId, ClientProfile, Credential, Engine, MentionType, ScanCredentials, ScanId,
};
use aivis_engines::{EngineAdapter, EngineError, EngineResponse};
use aivis_scanner::{
    EngineAdapters, FnProgressSink, NoopProgressSink, ScanError, ScanOrchestrator, ScanPacing,
    ScanProgress, ScanRequest,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Answer = Box<dyn Fn(&str) -> aivis_engines::Result<EngineResponse> + Send + Sync>;

/// Adapter that answers from a closure and records what it was asked.
struct FakeAdapter {
    engine: Engine,
    answer: Answer,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeAdapter {
    fn new(
        engine: Engine,
        answer: impl Fn(&str) -> aivis_engines::Result<EngineResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            answer: Box::new(answer),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineAdapter for FakeAdapter {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn scan(
        &self,
        prompt: &str,
        credential: Option<&Credential>,
    ) -> aivis_engines::Result<EngineResponse> {
        self.calls.lock().unwrap().push((
            prompt.to_string(),
            credential.map(|c| c.expose().to_string()),
        ));
        (self.answer)(prompt)
    }
}

const FEATURED_ANSWER: &str = "Our **top pick** is Acme Co.";
const NOT_FOUND_ANSWER: &str = "No relevant info.";

fn featured_unless_third(prompt: &str) -> aivis_engines::Result<EngineResponse> {
    if prompt.contains("third") {
        Ok(EngineResponse::text(NOT_FOUND_ANSWER))
    } else {
        Ok(EngineResponse::text(FEATURED_ANSWER))
    }
}

fn adapters(
    chat_gpt: Arc<FakeAdapter>,
    perplexity: Arc<FakeAdapter>,
    google_aio: Arc<FakeAdapter>,
) -> EngineAdapters {
    EngineAdapters {
        chat_gpt,
        perplexity,
        google_aio,
    }
}

fn uniform(answer: fn(&str) -> aivis_engines::Result<EngineResponse>) -> EngineAdapters {
    adapters(
        FakeAdapter::new(Engine::ChatGpt, answer),
        FakeAdapter::new(Engine::Perplexity, answer),
        FakeAdapter::new(Engine::GoogleAio, answer),
    )
}

fn request(prompts: &[&str]) -> ScanRequest {
    ScanRequest {
        scan_id: ScanId::new("scan-1").unwrap(),
        client: ClientProfile {
            id: ClientId::new("client-1").unwrap(),
            name: "Acme Co".to_string(),
            domain: None,
            competitors: vec!["Bolt Plumbing".to_string()],
        },
        prompts: prompts.iter().map(ToString::to_string).collect(),
        credentials: ScanCredentials::default(),
    }
}

fn orchestrator(adapters: EngineAdapters) -> ScanOrchestrator {
    ScanOrchestrator::new(adapters).with_pacing(ScanPacing::none())
}

#[tokio::test]
async fn test_end_to_end_scoring() {
    let orchestrator = orchestrator(uniform(featured_unless_third));
    let req = request(&["first prompt", "second prompt", "third prompt"]);

    let report = orchestrator.run_scan(&req, &NoopProgressSink).await.unwrap();

    assert_eq!(report.prompt_count, 3);
    assert_eq!(report.featured_count, 6);
    assert_eq!(report.mentioned_count, 0);
    assert_eq!(report.not_found_count, 3);
    assert_eq!(report.overall_score, 67);
    assert_eq!(report.best_engine, Engine::ChatGpt);
    assert_eq!(report.worst_engine, Engine::ChatGpt);

    for (result, prompt) in report.prompt_results.iter().zip(&req.prompts) {
        assert_eq!(&result.prompt, prompt);
        let engines: Vec<Engine> = result.engine_results.iter().map(|r| r.engine).collect();
        assert_eq!(engines, Engine::ALL.to_vec());
    }
    assert_eq!(
        report.prompt_results[2].engine_results[0].mention_type,
        MentionType::NotFound
    );
}

#[tokio::test]
async fn test_prompts_run_in_order() {
    let chat_gpt = FakeAdapter::new(Engine::ChatGpt, featured_unless_third);
    let orchestrator = orchestrator(adapters(
        Arc::clone(&chat_gpt),
        FakeAdapter::new(Engine::Perplexity, featured_unless_third),
        FakeAdapter::new(Engine::GoogleAio, featured_unless_third),
    ));

    orchestrator
        .run_scan(&request(&["first prompt", "second prompt"]), &NoopProgressSink)
        .await
        .unwrap();

    let asked: Vec<String> = chat_gpt.calls().into_iter().map(|(p, _)| p).collect();
    assert_eq!(asked, vec!["first prompt", "second prompt"]);
}

#[tokio::test]
async fn test_engine_failure_is_isolated() {
    let perplexity = FakeAdapter::new(Engine::Perplexity, |_| {
        Err(EngineError::AuthExpired {
            engine: Engine::Perplexity,
            message: "Firecrawl API error: 401 - Unauthorized".to_string(),
        })
    });
    let orchestrator = orchestrator(adapters(
        FakeAdapter::new(Engine::ChatGpt, featured_unless_third),
        perplexity,
        FakeAdapter::new(Engine::GoogleAio, featured_unless_third),
    ));

    let report = orchestrator
        .run_scan(&request(&["first prompt"]), &NoopProgressSink)
        .await
        .unwrap();

    let results = &report.prompt_results[0].engine_results;
    assert_eq!(results.len(), 3);

    let failed = &results[1];
    assert_eq!(failed.engine, Engine::Perplexity);
    assert!(failed.is_error());
    assert!(failed.response_text.starts_with("Error: "));
    assert_eq!(failed.mention_type, MentionType::NotFound);
    assert!(failed.sentiment_score.abs() < f64::EPSILON);
    assert!(failed.competitors_mentioned.is_empty());

    assert_eq!(results[0].mention_type, MentionType::Featured);
    assert_eq!(results[2].mention_type, MentionType::Featured);
    assert_eq!(report.featured_count, 2);
    assert_eq!(report.not_found_count, 1);
    assert_eq!(report.worst_engine, Engine::Perplexity);
}

#[tokio::test]
async fn test_credentials_routed_per_engine() {
    let chat_gpt = FakeAdapter::new(Engine::ChatGpt, featured_unless_third);
    let perplexity = FakeAdapter::new(Engine::Perplexity, featured_unless_third);
    let google_aio = FakeAdapter::new(Engine::GoogleAio, featured_unless_third);
    let orchestrator = orchestrator(adapters(
        Arc::clone(&chat_gpt),
        Arc::clone(&perplexity),
        Arc::clone(&google_aio),
    ));

    let mut req = request(&["first prompt"]);
    req.credentials = ScanCredentials {
        chatgpt_session: Credential::new("chat-session"),
        perplexity_session: Credential::new("pplx-session"),
        serp_api_key: Credential::new("serp-key"),
        firecrawl_api_key: Credential::new("firecrawl-key"),
    };
    orchestrator.run_scan(&req, &NoopProgressSink).await.unwrap();

    assert_eq!(chat_gpt.calls()[0].1.as_deref(), Some("chat-session"));
    assert_eq!(perplexity.calls()[0].1.as_deref(), Some("firecrawl-key"));
    assert_eq!(google_aio.calls()[0].1.as_deref(), Some("serp-key"));
}

#[tokio::test]
async fn test_competitor_answer_stays_not_found() {
    let orchestrator = orchestrator(uniform(|_| {
        Ok(EngineResponse::text(
            "For plumbing, Bolt Plumbing is a popular choice in town.",
        ))
    }));

    let report = orchestrator
        .run_scan(&request(&["best plumbers"]), &NoopProgressSink)
        .await
        .unwrap();

    assert_eq!(report.not_found_count, 3);
    assert_eq!(report.competitor_only_count, 0);
    assert_eq!(report.overall_score, 0);
    for result in &report.prompt_results[0].engine_results {
        assert_eq!(result.mention_type, MentionType::NotFound);
        assert_eq!(result.competitors_mentioned, vec!["Bolt Plumbing".to_string()]);
    }
    assert!(report.gap_analysis.summary.red_alerts >= 3);
}

#[tokio::test]
async fn test_new_competitors_detected() {
    let orchestrator = orchestrator(uniform(|_| {
        Ok(EngineResponse::text(
            "1. **Bolt Plumbing** - fast service\n2. **Riverside Pipe Services** - good value",
        ))
    }));

    let report = orchestrator
        .run_scan(&request(&["best plumbers"]), &NoopProgressSink)
        .await
        .unwrap();

    assert_eq!(report.not_found_count, 3);
    assert_eq!(
        report.new_competitors_detected,
        vec!["Riverside Pipe Services".to_string()]
    );
}

/// Adapter that takes a fixed time to answer and records when it ran.
struct SlowAdapter {
    engine: Engine,
    delay: Duration,
    spans: Arc<Mutex<Vec<(Instant, Instant)>>>,
}

#[async_trait]
impl EngineAdapter for SlowAdapter {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn scan(
        &self,
        _prompt: &str,
        _credential: Option<&Credential>,
    ) -> aivis_engines::Result<EngineResponse> {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.spans.lock().unwrap().push((start, Instant::now()));
        Ok(EngineResponse::text(FEATURED_ANSWER))
    }
}

#[tokio::test]
async fn test_engines_run_concurrently_within_prompt() {
    let spans: Arc<Mutex<Vec<(Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let slow = |engine| -> Arc<dyn EngineAdapter> {
        Arc::new(SlowAdapter {
            engine,
            delay: Duration::from_millis(100),
            spans: Arc::clone(&spans),
        })
    };
    let orchestrator = ScanOrchestrator::new(EngineAdapters {
        chat_gpt: slow(Engine::ChatGpt),
        perplexity: slow(Engine::Perplexity),
        google_aio: slow(Engine::GoogleAio),
    })
    .with_pacing(ScanPacing::none());

    let started = Instant::now();
    let report = orchestrator
        .run_scan(&request(&["first prompt"]), &NoopProgressSink)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.featured_count, 3);
    assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");

    let spans = spans.lock().unwrap();
    assert_eq!(spans.len(), 3);
    let last_start = spans.iter().map(|(start, _)| *start).max().unwrap();
    let first_end = spans.iter().map(|(_, end)| *end).min().unwrap();
    assert!(last_start < first_end);
}

#[tokio::test]
async fn test_progress_events() {
    let events: Arc<Mutex<Vec<ScanProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let sink = FnProgressSink::new(move |p: ScanProgress| {
        recorded.lock().unwrap().push(p);
        Ok(())
    });

    orchestrator(uniform(featured_unless_third))
        .run_scan(&request(&["first prompt", "second prompt"]), &sink)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    // start + (prompt start + 3 engine starts + 3 engine finishes) per prompt + 95 + 100
    assert_eq!(events.len(), 1 + 2 * 7 + 2);
    assert_eq!(events.first().map(|p| p.percent), Some(5));
    assert_eq!(events.last().map(|p| p.percent), Some(100));
    assert_eq!(events[events.len() - 2].percent, 95);
    assert!(events.iter().all(|p| p.percent <= 100));
    assert!(events
        .iter()
        .any(|p| p.step == "Scanning ChatGPT: prompt 2/2"));
    assert!(events
        .iter()
        .any(|p| p.step == "Google AI Overview done: prompt 1/2"));
}

#[tokio::test]
async fn test_failed_engine_reports_no_finish_event() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let sink = FnProgressSink::new(move |p: ScanProgress| {
        recorded.lock().unwrap().push(p.step);
        Ok(())
    });

    let orchestrator = orchestrator(adapters(
        FakeAdapter::new(Engine::ChatGpt, |_| {
            Err(EngineError::Config("no browser".to_string()))
        }),
        FakeAdapter::new(Engine::Perplexity, featured_unless_third),
        FakeAdapter::new(Engine::GoogleAio, featured_unless_third),
    ));
    orchestrator
        .run_scan(&request(&["first prompt"]), &sink)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert!(events.contains(&"Scanning ChatGPT: prompt 1/1".to_string()));
    assert!(!events.contains(&"ChatGPT done: prompt 1/1".to_string()));
}

#[tokio::test]
async fn test_invalid_requests_abort() {
    let orchestrator = orchestrator(uniform(featured_unless_third));

    let err = orchestrator
        .run_scan(&request(&[]), &NoopProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidRequest(_)));

    let mut req = request(&["first prompt"]);
    req.client.name = "   ".to_string();
    let err = orchestrator.run_scan(&req, &NoopProgressSink).await.unwrap_err();
    assert!(matches!(err, ScanError::InvalidRequest(_)));
    assert!(!err.is_retryable());
}
