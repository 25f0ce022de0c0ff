//! HTTP client for the venue backend's playback endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::models::{PlaybackStatusResponse, QueueResponse};
use super::{PlaybackStatus, PlayerGateway, UpcomingQueue};

/// Player gateway backed by the venue backend's REST API.
pub struct HttpPlayerGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlayerGateway {
    /// Create a new gateway.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the venue backend (e.g., "http://localhost:4000")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PlayerGateway for HttpPlayerGateway {
    async fn playback_status(&self) -> Result<PlaybackStatus> {
        let url = format!("{}/api/music/playback/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch playback status")?;

        if !response.status().is_success() {
            anyhow::bail!("Playback status request failed: status {}", response.status());
        }

        let body: PlaybackStatusResponse = response
            .json()
            .await
            .context("Failed to parse playback status response")?;
        Ok(body.into_status())
    }

    async fn upcoming_queue(&self) -> Result<UpcomingQueue> {
        let url = format!("{}/api/music/playback/queue", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch playback queue")?;

        if !response.status().is_success() {
            anyhow::bail!("Playback queue request failed: status {}", response.status());
        }

        let body: QueueResponse = response
            .json()
            .await
            .context("Failed to parse playback queue response")?;
        Ok(body.into_queue())
    }
}
