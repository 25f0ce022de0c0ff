use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use now_playing_sync::config::{AppConfig, CliConfig, FileConfig, StoreBackend, StoreSettings};
use now_playing_sync::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use now_playing_sync::{
    HttpPlayerGateway, HttpRequestStore, PlayerGateway, RequestStore, SqliteRequestStore,
    SyncEngine,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the venue backend serving the player and request APIs.
    #[clap(long)]
    pub api_base_url: Option<String>,

    /// Milliseconds between two polls of the player.
    #[clap(long, default_value_t = 4000)]
    pub poll_interval_ms: u64,

    /// Timeout in seconds for requests to the venue backend.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,

    /// The port the admin API listens on.
    #[clap(short, long, default_value_t = 3010)]
    pub port: u16,

    /// Where song requests live.
    #[clap(long, value_enum, default_value = "http")]
    pub store: StoreBackend,

    /// Path to the SQLite request database, for the sqlite store.
    #[clap(long, value_parser = parse_path)]
    pub sqlite_db: Option<PathBuf>,

    /// Maximum number of requests fetched per poll from the venue backend.
    #[clap(long, default_value_t = 100)]
    pub list_limit: usize,

    /// Maximum number of status updates sent concurrently within one cycle.
    #[clap(long, default_value_t = 4)]
    pub max_concurrent_updates: usize,

    /// The level of logging to perform on each admin request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            api_base_url: args.api_base_url.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            request_timeout_sec: args.request_timeout_sec,
            store: args.store,
            sqlite_db: args.sqlite_db.clone(),
            list_limit: args.list_limit,
            poll_interval_ms: args.poll_interval_ms,
            max_concurrent_updates: args.max_concurrent_updates,
        }
    }
}

fn make_request_store(config: &AppConfig) -> Result<Arc<dyn RequestStore>> {
    Ok(match &config.store {
        StoreSettings::Http { list_limit } => {
            info!("Using venue backend request store at {}", config.api_base_url);
            Arc::new(HttpRequestStore::new(
                config.api_base_url.clone(),
                config.request_timeout_sec,
                *list_limit,
            )?)
        }
        StoreSettings::Sqlite { db_path } => {
            info!("Opening SQLite request database at {:?}...", db_path);
            Arc::new(SqliteRequestStore::new(db_path)?)
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let gateway: Arc<dyn PlayerGateway> = Arc::new(HttpPlayerGateway::new(
        config.api_base_url.clone(),
        config.request_timeout_sec,
    )?);
    let store = make_request_store(&config)?;

    let engine = Arc::new(SyncEngine::new(gateway, store, config.sync));
    if config.start_hidden {
        engine.set_host_visible(false).await;
    }
    engine.start().await;

    let shutdown_token = CancellationToken::new();
    let ctrl_c_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                ctrl_c_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
    };
    let server_result = run_server(engine.clone(), server_config, shutdown_token.clone()).await;
    if let Err(e) = &server_result {
        error!("Admin server failed: {}", e);
    }

    engine.stop().await;
    info!("Shutdown complete");
    server_result
}
