use super::{chrome_pool, credential, engine_adapters, progress_log};
use aivis_core::{AivisError, AppConfig, ClientId, ClientProfile, ScanCredentials, ScanId};
use aivis_scanner::{
    merge_prompts, parse_prompt_csv, InMemoryScanStore, ScanJobRunner, ScanOrchestrator,
    ScanPacing, ScanRequest,
};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Brand name to look for in answers
    #[arg(long)]
    client_name: String,

    /// Client identifier recorded in the report
    #[arg(long, default_value = "cli-client")]
    client_id: String,

    /// Brand web domain, e.g. acme.com
    #[arg(long)]
    domain: Option<String>,

    /// Known competitor (repeatable)
    #[arg(long = "competitor")]
    competitors: Vec<String>,

    /// Prompt to scan (repeatable)
    #[arg(long = "prompt")]
    prompts: Vec<String>,

    /// CSV file of prompts, first column
    #[arg(long)]
    prompts_csv: Option<PathBuf>,

    /// ChatGPT session cookie
    #[arg(long, env = "AIVIS_CHATGPT_SESSION", hide_env_values = true)]
    chatgpt_session: Option<String>,

    /// Firecrawl API key for this scan (overrides the configured key)
    #[arg(long, env = "AIVIS_USER_FIRECRAWL_API_KEY", hide_env_values = true)]
    firecrawl_api_key: Option<String>,

    /// SERP API key for this scan (overrides the configured key)
    #[arg(long, env = "AIVIS_USER_SERP_API_KEY", hide_env_values = true)]
    serp_api_key: Option<String>,

    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

impl ScanArgs {
    fn collect_prompts(&self) -> anyhow::Result<Vec<String>> {
        let mut prompts = merge_prompts(&[], self.prompts.iter().cloned()).merged;

        if let Some(path) = &self.prompts_csv {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let parsed = parse_prompt_csv(&content);
            for error in &parsed.errors {
                warn!("{}: {}", path.display(), error);
            }
            let merge = merge_prompts(&prompts, parsed.prompts.into_iter().map(|p| p.text));
            if !merge.duplicates.is_empty() {
                info!("Skipped {} duplicate prompts", merge.duplicates.len());
            }
            prompts = merge.merged;
        }

        anyhow::ensure!(!prompts.is_empty(), "no prompts given; use --prompt or --prompts-csv");
        Ok(prompts)
    }

    fn request(&self, prompts: Vec<String>) -> anyhow::Result<ScanRequest> {
        Ok(ScanRequest {
            scan_id: ScanId::generate(),
            client: ClientProfile {
                id: ClientId::new(self.client_id.as_str())?,
                name: self.client_name.clone(),
                domain: self.domain.clone(),
                competitors: self.competitors.clone(),
            },
            prompts,
            credentials: ScanCredentials {
                chatgpt_session: credential(self.chatgpt_session.as_ref()),
                perplexity_session: None,
                serp_api_key: credential(self.serp_api_key.as_ref()),
                firecrawl_api_key: credential(self.firecrawl_api_key.as_ref()),
            },
        })
    }
}

pub async fn run(args: ScanArgs, config: &AppConfig) -> anyhow::Result<()> {
    let prompts = args.collect_prompts()?;
    let request = args.request(prompts)?;
    let scan_id = request.scan_id.clone();

    let pool = chrome_pool(config);
    let adapters = engine_adapters(config, &pool)?;

    let orchestrator =
        ScanOrchestrator::new(adapters).with_pacing(ScanPacing::from_config(&config.scanning));
    let runner = ScanJobRunner::new(Arc::new(orchestrator), &config.jobs)
        .with_observer(Arc::new(progress_log()));

    let store = Arc::new(InMemoryScanStore::new());
    store.create(scan_id.clone(), request.client.id.clone()).await;

    let outcome = runner.run(request, store.clone()).await;
    pool.close_all().await;
    let report = outcome.map_err(AivisError::from)?;

    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Some(record) = store.get(&scan_id).await {
        info!(
            scan_id = %scan_id,
            status = %record.status,
            score = report.overall_score,
            "Scan finished"
        );
    }
    Ok(())
}
