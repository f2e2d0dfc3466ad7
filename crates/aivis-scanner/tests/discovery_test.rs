use aivis_core::{ClientId, ClientProfile, Credential, Engine, MentionType, ScanCredentials};
use aivis_engines::{EngineAdapter, EngineError, EngineResponse};
use aivis_scanner::{
    DiscoveryDepth, DiscoveryRequest, EngineAdapters, FnProgressSink, KeywordDiscovery,
    NoopProgressSink, ScanError, ScanPacing, ScanProgress,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Answer = Box<dyn Fn(&str) -> aivis_engines::Result<EngineResponse> + Send + Sync>;

/// Adapter that answers from a closure and records the prompts it was asked.
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

    fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    fn credentials(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
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

fn not_found(_: &str) -> aivis_engines::Result<EngineResponse> {
    Ok(EngineResponse::text("No relevant info."))
}

/// Featured for "Best ..." prompts, mentioned for "Top ...", failed for
/// "How ...", absent otherwise.
fn by_prefix(prompt: &str) -> aivis_engines::Result<EngineResponse> {
    if prompt.starts_with("Best ") {
        Ok(EngineResponse::text("Our **top pick** is Acme Co."))
    } else if prompt.starts_with("Top ") {
        Ok(EngineResponse::text("Acme Co is decent."))
    } else if prompt.starts_with("How ") {
        Err(EngineError::Config("render failed".to_string()))
    } else {
        Ok(EngineResponse::text("Bolt Plumbing is a popular choice."))
    }
}

struct Fixture {
    chat_gpt: Arc<FakeAdapter>,
    perplexity: Arc<FakeAdapter>,
    google_aio: Arc<FakeAdapter>,
}

impl Fixture {
    fn new(answer: fn(&str) -> aivis_engines::Result<EngineResponse>) -> Self {
        Self {
            chat_gpt: FakeAdapter::new(Engine::ChatGpt, answer),
            perplexity: FakeAdapter::new(Engine::Perplexity, answer),
            google_aio: FakeAdapter::new(Engine::GoogleAio, answer),
        }
    }

    fn discovery(&self) -> KeywordDiscovery {
        KeywordDiscovery::new(EngineAdapters {
            chat_gpt: self.chat_gpt.clone(),
            perplexity: self.perplexity.clone(),
            google_aio: self.google_aio.clone(),
        })
        .with_pacing(ScanPacing::none())
    }
}

fn request(services: &[&str], depth: DiscoveryDepth) -> DiscoveryRequest {
    DiscoveryRequest {
        client: ClientProfile {
            id: ClientId::new("client-1").unwrap(),
            name: "Acme Co".to_string(),
            domain: None,
            competitors: vec!["Bolt Plumbing".to_string()],
        },
        industry: "plumbing".to_string(),
        services: services.iter().map(ToString::to_string).collect(),
        location: None,
        depth,
        engine: Engine::ChatGpt,
        credentials: ScanCredentials::default(),
    }
}

#[tokio::test]
async fn test_depth_sets_prompt_count() {
    let fixture = Fixture::new(not_found);
    let discovery = fixture.discovery();

    let quick = discovery
        .discover_keywords(&request(&[], DiscoveryDepth::Quick), &NoopProgressSink)
        .await
        .unwrap();
    assert_eq!(quick.prompts.len(), 10);
    assert_eq!(quick.summary.total_scanned, 10);

    let standard = discovery
        .discover_keywords(
            &request(&["drain cleaning", "water heaters"], DiscoveryDepth::Standard),
            &NoopProgressSink,
        )
        .await
        .unwrap();
    assert_eq!(standard.prompts.len(), 25);

    let thorough = discovery
        .discover_keywords(
            &request(
                &["drain cleaning", "water heaters", "pipe repair"],
                DiscoveryDepth::Thorough,
            ),
            &NoopProgressSink,
        )
        .await
        .unwrap();
    assert_eq!(thorough.prompts.len(), 50);

    assert_eq!(fixture.chat_gpt.prompts().len(), 85);
}

#[tokio::test]
async fn test_results_bucketed_by_mention() {
    let fixture = Fixture::new(by_prefix);

    let report = fixture
        .discovery()
        .discover_keywords(&request(&["plumbing"], DiscoveryDepth::Quick), &NoopProgressSink)
        .await
        .unwrap();

    // First ten templates for one keyword: three "Best", one "Top", two "How"
    assert_eq!(report.summary.total_scanned, 10);
    assert_eq!(report.summary.featured_count, 3);
    assert_eq!(report.summary.mentioned_count, 1);
    assert_eq!(report.summary.error_count, 2);
    assert_eq!(report.summary.not_found_count, 4);
    assert_eq!(report.summary.successful_scans, 8);
    assert_eq!(report.summary.visibility_rate, 50);

    assert!(report
        .featured
        .iter()
        .all(|p| p.prompt.starts_with("Best ") && p.mention_type == MentionType::Featured));
    assert!(report.featured.iter().all(|p| p.position == Some(1)));
    assert!(report
        .mentioned
        .iter()
        .all(|p| p.prompt.starts_with("Top ") && p.mention_type == MentionType::Mentioned));
    assert!(report.errors.iter().all(|e| e.prompt.starts_with("How ")));
    assert!(report.errors.iter().all(|e| e.error.contains("render failed")));
    // A competitor-only answer is still a miss for the brand
    assert!(report.not_found.iter().all(|p| p.engine == Engine::ChatGpt));
}

#[tokio::test]
async fn test_single_engine_with_its_credential() {
    let fixture = Fixture::new(not_found);
    let mut req = request(&[], DiscoveryDepth::Quick);
    req.engine = Engine::Perplexity;
    req.credentials.firecrawl_api_key = Credential::new("fc-key");
    req.credentials.chatgpt_session = Credential::new("chat-session");

    let report = fixture
        .discovery()
        .discover_keywords(&req, &NoopProgressSink)
        .await
        .unwrap();

    assert_eq!(report.engine, Engine::Perplexity);
    assert_eq!(fixture.perplexity.prompts(), report.prompts);
    assert!(fixture
        .perplexity
        .credentials()
        .iter()
        .all(|c| c.as_deref() == Some("fc-key")));
    assert!(fixture.chat_gpt.prompts().is_empty());
    assert!(fixture.google_aio.prompts().is_empty());
}

#[tokio::test]
async fn test_progress_runs_from_5_to_100() {
    let fixture = Fixture::new(not_found);
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink_recorded = recorded.clone();
    let sink = FnProgressSink::new(move |p: ScanProgress| {
        sink_recorded.lock().unwrap().push(p.percent);
        Ok(())
    });

    fixture
        .discovery()
        .discover_keywords(&request(&[], DiscoveryDepth::Quick), &sink)
        .await
        .unwrap();

    let percents = recorded.lock().unwrap().clone();
    assert_eq!(percents.first(), Some(&5));
    assert_eq!(percents[1], 15);
    assert_eq!(&percents[percents.len() - 2..], &[95, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    // generation, start of scans, one per prompt, analysis, done
    assert_eq!(percents.len(), 14);
}

#[tokio::test]
async fn test_empty_client_name_rejected() {
    let fixture = Fixture::new(not_found);
    let mut req = request(&[], DiscoveryDepth::Quick);
    req.client.name = "  ".to_string();

    let err = fixture
        .discovery()
        .discover_keywords(&req, &NoopProgressSink)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::InvalidRequest(_)));
    assert!(fixture.chat_gpt.prompts().is_empty());
}
