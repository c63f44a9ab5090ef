use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::env_vars;
use crate::error::DeployError;
use crate::logging;
use crate::pipeline::{DeployRequest, Pipeline};
use crate::platform::heroku::Heroku;
use crate::registry::docker::Docker;
use crate::release;
use crate::settings::Settings;
use crate::source_control::github::GitHub;
use crate::target::TriggerEvent;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Deploy the app + gateway pair to Heroku from CI")]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect stale review apps, then deploy every target of the
    /// triggering event
    Deploy(DeployArgs),

    /// Only destroy review apps of closed pull requests
    Collect(Credentials),
}

#[derive(Args)]
struct Credentials {
    #[arg(long, env = "INPUT_GITHUB_API_KEY", hide_env_values = true)]
    github_api_key: String,

    /// REST API root, set by the runner on GitHub Enterprise
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    github_api_url: String,

    #[arg(long, env = "INPUT_HEROKU_EMAIL")]
    heroku_email: String,

    #[arg(long, env = "INPUT_HEROKU_API_KEY", hide_env_values = true)]
    heroku_api_key: String,
}

#[derive(Args)]
struct DeployArgs {
    #[command(flatten)]
    credentials: Credentials,

    /// Comma-separated local images named `<app>_<process>`
    #[arg(long, env = "INPUT_IMAGES")]
    images: String,

    /// Newline-delimited KEY=VALUE baseline config for new apps
    #[arg(long, env = "INPUT_ENV_VARS", default_value = "", hide_env_values = true)]
    env_vars: String,

    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: String,

    #[arg(long = "ref", env = "GITHUB_REF")]
    git_ref: String,

    #[arg(long, env = "GITHUB_SHA")]
    sha: String,

    /// JSON payload of the triggering event
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,
}

/// Parse CLI arguments and dispatch the command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Command::Deploy(args) => deploy(&args).await,
        Command::Collect(credentials) => {
            let pipeline = connect(&credentials, Settings::default()).await?;
            let report = pipeline.collect().await?;
            info!(kept = ?report.kept, destroyed = ?report.destroyed, "collection done");
            Ok(())
        }
    }
}

async fn deploy(args: &DeployArgs) -> anyhow::Result<()> {
    // Validate every input before touching anything remote.
    let env_vars = env_vars::parse(&args.env_vars)?;
    let images = release::parse_image_list(&args.images)?;
    let payload = match &args.event_path {
        Some(path) => Some(read_event(path).await?),
        None => None,
    };
    let event = TriggerEvent::from_github(
        &args.event_name,
        &args.git_ref,
        &args.sha,
        payload.as_ref(),
    )?;

    let pipeline = connect(&args.credentials, Settings::default()).await?;
    let report = pipeline
        .deploy(&DeployRequest {
            event,
            env_vars,
            images,
        })
        .await?;

    let failed: Vec<String> = report
        .failures()
        .map(|outcome| {
            let reason = outcome
                .result
                .as_ref()
                .err()
                .map_or_else(String::new, ToString::to_string);
            format!("{}: {reason}", outcome.target.primary_app)
        })
        .collect();

    for outcome in &report.targets {
        if let Ok(target_report) = &outcome.result {
            info!(
                target = %outcome.target.primary_app,
                freshness = ?target_report.freshness,
                database_changed = target_report.release.database_changed,
                "target deployed"
            );
        }
    }

    if !failed.is_empty() {
        for line in &failed {
            error!("{line}");
        }
        bail!("deployment failed for {}", failed.join("; "));
    }
    Ok(())
}

async fn connect(credentials: &Credentials, settings: Settings) -> anyhow::Result<Pipeline> {
    Heroku::check_prerequisites().await?;
    let heroku = Heroku::new(&settings.registry_host);
    heroku
        .login(&credentials.heroku_email, &credentials.heroku_api_key)
        .await?;

    let github = GitHub::new(
        &credentials.github_api_key,
        &settings.repo_owner,
        &settings.repo_name,
    )?
    .api_base(&credentials.github_api_url);

    Ok(
        Pipeline::new(Arc::new(heroku), Arc::new(Docker::new()), Arc::new(github))
            .settings(settings),
    )
}

async fn read_event(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|_| DeployError::FileNotFound(path.display().to_string()))?;
    serde_json::from_str(&content).context("event payload is not valid JSON")
}
