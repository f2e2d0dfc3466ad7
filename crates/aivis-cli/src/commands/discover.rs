use super::{chrome_pool, credential, engine_adapters, progress_log};
use aivis_core::{AivisError, AppConfig, ClientId, ClientProfile, Engine, ScanCredentials};
use aivis_scanner::{DiscoveryDepth, DiscoveryRequest, KeywordDiscovery};
use clap::{Args, ValueEnum};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DepthArg {
    /// 10 prompts
    Quick,
    /// 25 prompts
    Standard,
    /// 50 prompts
    Thorough,
}

impl From<DepthArg> for DiscoveryDepth {
    fn from(arg: DepthArg) -> Self {
        match arg {
            DepthArg::Quick => DiscoveryDepth::Quick,
            DepthArg::Standard => DiscoveryDepth::Standard,
            DepthArg::Thorough => DiscoveryDepth::Thorough,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    Chatgpt,
    Perplexity,
    Google,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Chatgpt => Engine::ChatGpt,
            EngineArg::Perplexity => Engine::Perplexity,
            EngineArg::Google => Engine::GoogleAio,
        }
    }
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Brand name to look for in answers
    #[arg(long)]
    client_name: String,

    /// Brand web domain, e.g. acme.com
    #[arg(long)]
    domain: Option<String>,

    /// Industry or niche
    #[arg(long)]
    industry: String,

    /// Primary service (repeatable)
    #[arg(long = "service")]
    services: Vec<String>,

    /// City or region
    #[arg(long)]
    location: Option<String>,

    #[arg(long, value_enum, default_value = "standard")]
    depth: DepthArg,

    /// Engine every prompt is asked of
    #[arg(long, value_enum, default_value = "chatgpt")]
    engine: EngineArg,

    /// ChatGPT session cookie
    #[arg(long, env = "AIVIS_CHATGPT_SESSION", hide_env_values = true)]
    chatgpt_session: Option<String>,

    /// Firecrawl API key (overrides the configured key)
    #[arg(long, env = "AIVIS_USER_FIRECRAWL_API_KEY", hide_env_values = true)]
    firecrawl_api_key: Option<String>,

    /// SERP API key (overrides the configured key)
    #[arg(long, env = "AIVIS_USER_SERP_API_KEY", hide_env_values = true)]
    serp_api_key: Option<String>,
}

impl DiscoverArgs {
    fn request(&self) -> Result<DiscoveryRequest, AivisError> {
        Ok(DiscoveryRequest {
            client: ClientProfile {
                id: ClientId::new("cli-client")?,
                name: self.client_name.clone(),
                domain: self.domain.clone(),
                competitors: Vec::new(),
            },
            industry: self.industry.clone(),
            services: self.services.clone(),
            location: self.location.clone(),
            depth: self.depth.into(),
            engine: self.engine.into(),
            credentials: ScanCredentials {
                chatgpt_session: credential(self.chatgpt_session.as_ref()),
                perplexity_session: None,
                serp_api_key: credential(self.serp_api_key.as_ref()),
                firecrawl_api_key: credential(self.firecrawl_api_key.as_ref()),
            },
        })
    }
}

pub async fn run(args: DiscoverArgs, config: &AppConfig) -> anyhow::Result<()> {
    let request = args.request()?;

    let pool = chrome_pool(config);
    let discovery = KeywordDiscovery::new(engine_adapters(config, &pool)?);
    let outcome = discovery.discover_keywords(&request, &progress_log()).await;
    pool.close_all().await;
    let report = outcome.map_err(AivisError::from)?;

    info!(
        featured = report.summary.featured_count,
        mentioned = report.summary.mentioned_count,
        visibility_rate = report.summary.visibility_rate,
        "Discovery finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
