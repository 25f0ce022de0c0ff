mod file_config;

pub use file_config::{FileConfig, SyncConfig};

use crate::server::RequestsLoggingLevel;
use crate::sync::SyncSettings;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// Where song requests are read from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreBackend {
    /// The venue backend's request API.
    #[default]
    Http,
    /// A local SQLite database.
    Sqlite,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_base_url: Option<String>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub request_timeout_sec: u64,
    pub store: StoreBackend,
    pub sqlite_db: Option<PathBuf>,
    pub list_limit: usize,
    pub poll_interval_ms: u64,
    pub max_concurrent_updates: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            port: 3010,
            logging_level: RequestsLoggingLevel::default(),
            request_timeout_sec: 10,
            store: StoreBackend::Http,
            sqlite_db: None,
            list_limit: 100,
            poll_interval_ms: 4000,
            max_concurrent_updates: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub request_timeout_sec: u64,
    pub store: StoreSettings,
    pub sync: SyncSettings,
    pub start_hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Http { list_limit: usize },
    Sqlite { db_path: PathBuf },
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let api_base_url = file
            .api_base_url
            .or_else(|| cli.api_base_url.clone())
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "api_base_url must be specified via --api-base-url or in config file"
                )
            })?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            bail!("api_base_url must be an http(s) URL: {}", api_base_url);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be positive");
        }

        let backend = match file.store {
            Some(s) => match StoreBackend::from_str(&s, true) {
                Ok(backend) => backend,
                Err(_) => bail!("Unknown store backend in config file: {}", s),
            },
            None => cli.store,
        };

        let store = match backend {
            StoreBackend::Http => {
                let list_limit = file.list_limit.unwrap_or(cli.list_limit);
                if list_limit == 0 {
                    bail!("list_limit must be positive");
                }
                StoreSettings::Http { list_limit }
            }
            StoreBackend::Sqlite => {
                let db_path = file
                    .sqlite_db
                    .map(PathBuf::from)
                    .or_else(|| cli.sqlite_db.clone())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "sqlite_db must be specified via --sqlite-db or in config file when using the sqlite store"
                        )
                    })?;
                if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !parent.is_dir() {
                        bail!("Directory of sqlite_db does not exist: {:?}", parent);
                    }
                }
                StoreSettings::Sqlite { db_path }
            }
        };

        // Sync settings - merge [sync] section with CLI values
        let sync_file = file.sync.unwrap_or_default();
        let poll_interval_ms = sync_file.poll_interval_ms.unwrap_or(cli.poll_interval_ms);
        if poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }
        let max_concurrent_updates = sync_file
            .max_concurrent_updates
            .unwrap_or(cli.max_concurrent_updates);
        if max_concurrent_updates == 0 {
            bail!("max_concurrent_updates must be positive");
        }
        let sync = SyncSettings {
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_concurrent_updates,
        };

        Ok(Self {
            api_base_url,
            port,
            logging_level,
            request_timeout_sec,
            store,
            sync,
            start_hidden: sync_file.start_hidden.unwrap_or(false),
        })
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
