/*
review-intake - single-binary main.rs
Starts the Rocket HTTP server, or runs one direct invocation from an event file.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use common::init_db_pool;
use review_intake::intake::ReviewIntake;
use review_intake::notify::relay::HttpRelayNotifier;
use review_intake::notify::{Notifier, Recipients};
use review_intake::sentiment::lexicon::LexiconScorer;
use review_intake::sentiment::remote::RemoteScorer;
use review_intake::sentiment::SentimentScorer;
use review_intake::server::{launch_rocket, AppState};
use review_intake::storage::SqliteRecordStore;

#[derive(Parser, Debug)]
#[command(name = "review-intake", about = "Review intake: sentiment scoring, storage and notification")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Process a single invocation event and print the response envelope
    Invoke {
        /// Event JSON file, or "-" for stdin
        #[arg(long, value_name = "FILE")]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so `invoke` output on stdout stays machine-readable
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    let db_pool = match init_db_pool(&config.database.path).await {
        Ok(p) => p,
        Err(e) => {
            error!(%e, db_path = %config.database.path, "failed to initialize database pool");
            return Err(e);
        }
    };

    if config
        .admin
        .as_ref()
        .and_then(|a| a.auto_migrate)
        .unwrap_or(false)
    {
        info!("Auto-migrate enabled: running DB migrations");
        common::run_migrations(&db_pool).await?;
        info!("DB migrations completed");
    }

    let store = SqliteRecordStore::new(db_pool, config.table_name())?;
    store.ensure_schema().await?;

    let scorer = create_scorer(&config).await?;
    let scorer_name = scorer.name();
    info!(scorer = scorer_name, table = %store.table(), "review intake wiring ready");

    let mut intake = ReviewIntake::new(scorer, Arc::new(store.clone()));
    let recipients = config.notifier.as_ref().and_then(Recipients::from_config);
    match create_notifier(&config)? {
        Some(notifier) => {
            if recipients.is_none() {
                warn!("notifier endpoint configured but sender/recipient missing; notifications disabled");
            }
            intake = intake.with_notifier(notifier, recipients);
        }
        None => info!("notifications disabled"),
    }
    let intake = Arc::new(intake);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut state = AppState::new(intake, store.table(), scorer_name);
            if let Some(limit) = config.server.as_ref().and_then(|s| s.body_limit_bytes) {
                state = state.with_body_limit(limit);
            }
            launch_rocket(state, config.server.as_ref()).await?;
            info!("Shutdown complete");
        }
        Command::Invoke { event } => {
            let raw = read_event(&event).await?;
            let response = intake.handle_raw_event(&raw).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Merge `config.default.toml` with `--config` (or `./config.toml`), then apply env overrides.
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let mut config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

async fn read_event(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("failed to read event from stdin")?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read event file: {}", path.display()))
    }
}

/// Create the sentiment scorer selected by `scorer.adapter` (default: embedded lexicon).
async fn create_scorer(config: &Config) -> Result<Arc<dyn SentimentScorer>> {
    let scorer_cfg = config.scorer.clone().unwrap_or_default();
    let adapter = scorer_cfg.adapter.as_deref().unwrap_or("lexicon");
    match adapter {
        "lexicon" => {
            let scorer = match scorer_cfg.lexicon_path.as_deref() {
                Some(path) => LexiconScorer::from_file(path).await?,
                None => LexiconScorer::new(),
            };
            Ok(Arc::new(scorer))
        }
        "remote" => {
            let remote = scorer_cfg
                .remote
                .context("Remote scorer selected but [scorer.remote] is missing")?;
            let api_url = remote
                .api_url
                .context("Missing api_url in scorer.remote config")?;
            let mut scorer = RemoteScorer::new(api_url).with_timeout(remote.timeout_seconds.unwrap_or(10));
            if let Some(api_key_env) = remote.api_key_env.as_deref() {
                let api_key = std::env::var(api_key_env)
                    .with_context(|| format!("Scorer API key env var '{}' not set", api_key_env))?;
                scorer = scorer.with_api_key(api_key);
            }
            Ok(Arc::new(scorer))
        }
        _ => anyhow::bail!("Unknown scorer adapter type: {}", adapter),
    }
}

/// Create the email relay notifier when an endpoint is configured.
fn create_notifier(config: &Config) -> Result<Option<Arc<dyn Notifier>>> {
    let Some(notifier_cfg) = config.notifier.as_ref() else {
        return Ok(None);
    };
    let Some(api_url) = notifier_cfg.api_url.as_deref() else {
        return Ok(None);
    };

    let mut notifier =
        HttpRelayNotifier::new(api_url).with_timeout(notifier_cfg.timeout_seconds.unwrap_or(10));
    if let Some(api_key_env) = notifier_cfg.api_key_env.as_deref() {
        let api_key = std::env::var(api_key_env)
            .with_context(|| format!("Email relay API key env var '{}' not set", api_key_env))?;
        notifier = notifier.with_api_key(api_key);
    }
    info!(api_url, "email relay notifier initialized");
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);
    Ok(Some(notifier))
}
