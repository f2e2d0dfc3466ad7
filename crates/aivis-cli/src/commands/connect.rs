use aivis_browser::ChromeLauncher;
use aivis_core::{AivisError, AppConfig};
use aivis_session::{LoginStatus, Platform, SessionCapture};
use clap::{Args, ValueEnum};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Login window size.
const LOGIN_WIDTH: u32 = 1200;
const LOGIN_HEIGHT: u32 = 800;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    Chatgpt,
    Perplexity,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Chatgpt => Platform::ChatGpt,
            PlatformArg::Perplexity => Platform::Perplexity,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Engine to log in to
    #[arg(value_enum)]
    platform: PlatformArg,

    /// User the session belongs to
    #[arg(long, default_value = "local")]
    user: String,

    /// Seconds between login checks
    #[arg(long, default_value_t = 3)]
    poll_secs: u64,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,
}

pub async fn run(args: ConnectArgs, config: &AppConfig) -> anyhow::Result<()> {
    let platform = Platform::from(args.platform);
    let launcher = ChromeLauncher::headful(LOGIN_WIDTH, LOGIN_HEIGHT)
        .with_executable(config.browser.chrome_executable.clone());
    let capture = SessionCapture::new(launcher);

    let started = capture
        .start_login_session(&args.user, platform)
        .await
        .map_err(AivisError::from)?;
    info!("{}", started.message);

    let outcome = tokio::select! {
        outcome = wait_for_login(&capture, &args, platform) => outcome,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("login cancelled")),
    };

    if let Err(e) = outcome {
        capture.close_login_session(&args.user, platform).await;
        return Err(e);
    }

    let captured = capture
        .complete_login(&args.user, platform)
        .await
        .map_err(AivisError::from)?;
    info!("{}", captured.message);
    println!("{}", captured.token.expose());
    Ok(())
}

async fn wait_for_login(
    capture: &SessionCapture<ChromeLauncher>,
    args: &ConnectArgs,
    platform: Platform,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    let poll = Duration::from_secs(args.poll_secs.max(1));

    loop {
        match capture.check_login_status(&args.user, platform).await {
            LoginStatus::LoggedIn => return Ok(()),
            LoginStatus::Pending(msg) => info!("{}", msg),
            LoginStatus::Error(msg) => warn!("Login check failed: {}", msg),
            status @ (LoginStatus::Closed | LoginStatus::NoSession) => {
                anyhow::bail!("{}", status.message());
            }
        }

        anyhow::ensure!(
            Instant::now() + poll < deadline,
            "no login detected within {} seconds",
            args.timeout_secs
        );
        tokio::time::sleep(poll).await;
    }
}
