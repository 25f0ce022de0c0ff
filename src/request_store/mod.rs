//! Song request storage.
//!
//! The engine only lists requests by status and performs single-field status
//! updates; the store stays authoritative for conflicts.

mod http_store;
mod models;
mod schema;
mod sqlite_store;

pub use http_store::HttpRequestStore;
pub use models::{RequestStatus, RequestsResponse, SongRequest, StatusUpdateBody, WireSongRequest};
pub use schema::REQUEST_STORE_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteRequestStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a request store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request not found: {0}")]
    NotFound(String),

    #[error("Update of request {id} rejected: {reason}")]
    Conflict { id: String, reason: String },

    #[error("Request store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl StoreError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Conflict { .. } => "conflict",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

/// Store holding song requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// List requests whose status is in `statuses`, oldest first.
    async fn list_requests(&self, statuses: &[RequestStatus]) -> Result<Vec<SongRequest>, StoreError>;

    /// Update the status of a single request.
    async fn update_request_status(
        &self,
        id: &str,
        new_status: RequestStatus,
    ) -> Result<(), StoreError>;
}
