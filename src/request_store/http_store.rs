//! HTTP client for the venue backend's song request endpoints.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::models::{RequestsResponse, StatusUpdateBody, WireSongRequest};
use super::{RequestStatus, RequestStore, SongRequest, StoreError};

/// Request store backed by the venue backend's REST API.
pub struct HttpRequestStore {
    client: reqwest::Client,
    base_url: String,
    list_limit: usize,
}

impl HttpRequestStore {
    /// Create a new store client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the venue backend
    /// * `timeout_sec` - Request timeout in seconds
    /// * `list_limit` - Maximum number of requests fetched per listing
    pub fn new(base_url: String, timeout_sec: u64, list_limit: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            list_limit,
        })
    }

    /// URL of a single request. The id is encoded as one path segment.
    fn request_url(&self, id: &str) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid backend URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Backend URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["api", "music", "requests", id]);
        Ok(url)
    }

    fn status_param(statuses: &[RequestStatus]) -> String {
        statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl RequestStore for HttpRequestStore {
    async fn list_requests(&self, statuses: &[RequestStatus]) -> Result<Vec<SongRequest>, StoreError> {
        let url = format!("{}/api/music/requests", self.base_url);
        let limit = self.list_limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("status", Self::status_param(statuses).as_str()),
                ("limit", limit.as_str()),
                ("sort", "createdAt:asc"),
            ])
            .send()
            .await
            .context("Failed to fetch song requests")?;

        if !response.status().is_success() {
            return Err(anyhow!("Song request listing failed: status {}", response.status()).into());
        }

        let body: RequestsResponse = response
            .json()
            .await
            .context("Failed to parse song request listing")?;

        Ok(body
            .items
            .into_iter()
            .filter_map(WireSongRequest::into_request)
            .filter(|r| statuses.contains(&r.status))
            .collect())
    }

    async fn update_request_status(
        &self,
        id: &str,
        new_status: RequestStatus,
    ) -> Result<(), StoreError> {
        let url = self.request_url(id)?;
        let response = self
            .client
            .put(url)
            .json(&StatusUpdateBody {
                status: new_status,
                reason: None,
            })
            .send()
            .await
            .with_context(|| format!("Failed to update song request {}", id))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            StatusCode::CONFLICT => Err(StoreError::Conflict {
                id: id.to_string(),
                reason: response.text().await.unwrap_or_default(),
            }),
            status => Err(anyhow!("Song request update {} failed: status {}", id, status).into()),
        }
    }
}
