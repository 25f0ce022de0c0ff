use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub api_base_url: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub request_timeout_sec: Option<u64>,

    // Request store
    pub store: Option<String>,
    pub sqlite_db: Option<String>,
    pub list_limit: Option<usize>,

    // Feature configs
    pub sync: Option<SyncConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_ms: Option<u64>,
    pub max_concurrent_updates: Option<usize>,
    /// Start with the host hidden; no polling until it reports visible.
    pub start_hidden: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
