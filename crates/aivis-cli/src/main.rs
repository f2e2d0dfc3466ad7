//! Aivis command line interface.
//!
//! Thin shell over the workspace crates: it loads configuration, wires the
//! browser pool, engine adapters and job runner together, and prints results.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;

use aivis_core::{AivisError, AppConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "aivis")]
#[command(about = "Measure brand visibility across AI answer engines", version)]
struct Cli {
    /// Config file (defaults to the per-user config path)
    #[arg(long, global = true, env = "AIVIS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a visibility scan and write the report as JSON
    Scan(commands::scan::ScanArgs),
    /// Log in to an engine in a visible browser and print the captured session
    Connect(commands::connect::ConnectArgs),
    /// Check that stored sessions and keys are still accepted
    Validate(commands::validate::ValidateArgs),
    /// Find the prompts a brand already appears for on one engine
    Discover(commands::discover::DiscoverArgs),
    /// Generate or import prompt lists
    Prompts(commands::prompts::PromptsArgs),
    /// Print the effective configuration, optionally saving it
    Config(commands::config::ConfigArgs),
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,aivis=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load config from `path`, or from the default location, with env overrides.
fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, AivisError> {
    let Some(path) = path else {
        return Ok(AppConfig::load_with_env()?);
    };
    let mut config = AppConfig::load_from(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Process exit status for a failed command.
///
/// 2: bad configuration or input, 3: a session or key was rejected,
/// 4: the failure is worth retrying later, 1: anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AivisError>() {
        Some(AivisError::Config(_) | AivisError::Validation(_)) => 2,
        Some(AivisError::AuthExpired(_)) => 3,
        Some(AivisError::TransientNetwork(_) | AivisError::ResourceExhausted(_)) => 4,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting Aivis v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(i32::from(exit_code(&e)));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Scan(args) => commands::scan::run(args, &config).await,
        Commands::Connect(args) => commands::connect::run(args, &config).await,
        Commands::Validate(args) => commands::validate::run(args, &config).await,
        Commands::Discover(args) => commands::discover::run(args, &config).await,
        Commands::Prompts(args) => commands::prompts::run(args),
        Commands::Config(args) => commands::config::run(&args, &config, cli.config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_command() {
        let cli = Cli::try_parse_from([
            "aivis",
            "scan",
            "--client-name",
            "Acme Co",
            "--competitor",
            "Bolt Plumbing",
            "--prompt",
            "best plumbers in Austin",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Scan(_)));
    }

    #[test]
    fn test_parse_prompts_generate() {
        let cli = Cli::try_parse_from([
            "aivis", "prompts", "generate", "--keyword", "plumbing", "--count", "5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Prompts(_)));
    }

    #[test]
    fn test_parse_discover_command() {
        let cli = Cli::try_parse_from([
            "aivis",
            "discover",
            "--client-name",
            "Acme Co",
            "--industry",
            "plumbing",
            "--depth",
            "quick",
            "--engine",
            "google",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Discover(_)));
    }

    #[test]
    fn test_exit_code_follows_error_kind() {
        let err = anyhow::Error::new(AivisError::AuthExpired("chatgpt session".to_string()));
        assert_eq!(exit_code(&err), 3);

        let err = anyhow::Error::new(AivisError::Validation("scan has no prompts".to_string()))
            .context("running scan");
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(AivisError::ResourceExhausted("pool".to_string()));
        assert_eq!(exit_code(&err), 4);

        assert_eq!(exit_code(&anyhow::anyhow!("report write failed")), 1);
    }
}
