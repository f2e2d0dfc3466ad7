use super::{chrome_pool, credential};
use aivis_core::{AivisError, AppConfig, ScanCredentials};
use aivis_session::{InMemoryTokenStatusStore, TokenValidator};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// User the credentials belong to
    #[arg(long, default_value = "local")]
    user: String,

    /// ChatGPT session cookie
    #[arg(long, env = "AIVIS_CHATGPT_SESSION", hide_env_values = true)]
    chatgpt_session: Option<String>,

    /// Perplexity session cookie
    #[arg(long, env = "AIVIS_PERPLEXITY_SESSION", hide_env_values = true)]
    perplexity_session: Option<String>,
}

pub async fn run(args: ValidateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let credentials = ScanCredentials {
        chatgpt_session: credential(args.chatgpt_session.as_ref()),
        perplexity_session: credential(args.perplexity_session.as_ref()),
        serp_api_key: credential(config.engines.serp_api_key.as_ref()),
        firecrawl_api_key: None,
    };

    let pool = chrome_pool(config);
    let validator = TokenValidator::new(pool.clone(), Arc::new(InMemoryTokenStatusStore::new()));

    let outcome = validator.validate_all(&args.user, &credentials).await;
    pool.close_all().await;
    let results = outcome.map_err(AivisError::from)?;

    let valid = results.iter().filter(|r| r.valid).count();
    info!(user = %args.user, valid, total = results.len(), "Validation finished");

    let status = validator
        .cached_status(&args.user)
        .await
        .map_err(AivisError::from)?;
    let output = json!({
        "results": results,
        "status": status,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
