mod config;
mod detect;
mod notify;
mod probe;
mod publish;
mod runner;
mod state;

use clap::Parser;
use config::{FetchErrorPolicy, Secrets, WatchConfig};
use notify::OneSignalNotifier;
use probe::PageProbe;
use publish::GitPublisher;
use state::StateStore;
use std::path::PathBuf;
use std::process::ExitCode;

/// A Rust CLI tool that watches a web page for changes: fetch the page,
/// compare its length against the stored baseline, push a notification
/// when it changed, and persist the new baseline.
#[derive(Parser, Debug)]
#[command(name = "pagewatch", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "pagewatch.toml")]
    config: PathBuf,

    /// Target URL (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// State file path (overrides config)
    #[arg(short, long)]
    state_file: Option<PathBuf>,

    /// Fetch and compare only; don't notify, persist, or publish
    #[arg(long)]
    dry_run: bool,

    /// Suppress info logging, only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "pagewatch=warn"
    } else {
        "pagewatch=info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.parse().unwrap()),
        )
        .init();

    let mut config = match WatchConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = cli.url {
        config.page.url = url;
    }
    if let Some(state_file) = cli.state_file {
        config.state.file = state_file;
    }

    let url = match config.require_url() {
        Ok(u) => u.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let probe = match PageProbe::new(&url, &config.page) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "could not build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let secrets = Secrets::from_env();
    let notifier = OneSignalNotifier::new(
        &config.notify,
        secrets.onesignal_app_id,
        secrets.onesignal_api_key,
    );
    let publisher = GitPublisher::from_config(
        &config.publish,
        secrets.github_token,
        secrets.github_repository,
    );

    let store = StateStore::new(&config.state.file);

    tracing::info!(%url, "pagewatch starting");
    match runner::run_once(&probe, &store, &notifier, publisher.as_ref(), cli.dry_run).await {
        Ok(report) => {
            tracing::debug!(?report, "run complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "page fetch failed, baseline unchanged");
            match config.errors.on_fetch_error {
                FetchErrorPolicy::Fail => ExitCode::FAILURE,
                FetchErrorPolicy::Continue => ExitCode::SUCCESS,
            }
        }
    }
}
