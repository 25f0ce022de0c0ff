use thiserror::Error;

/// Collaborator a failed fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    Player,
    RequestStore,
}

impl std::fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOrigin::Player => write!(f, "player gateway"),
            FetchOrigin::RequestStore => write!(f, "request store"),
        }
    }
}

/// Errors surfaced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transient fetch error from {origin}: {source}")]
    TransientFetch {
        origin: FetchOrigin,
        #[source]
        source: anyhow::Error,
    },

    #[error("A reconciliation cycle is already in flight")]
    CycleInProgress,

    #[error("Sync engine is not running")]
    NotRunning,
}

impl SyncError {
    pub fn player(source: impl Into<anyhow::Error>) -> Self {
        SyncError::TransientFetch {
            origin: FetchOrigin::Player,
            source: source.into(),
        }
    }

    pub fn request_store(source: impl Into<anyhow::Error>) -> Self {
        SyncError::TransientFetch {
            origin: FetchOrigin::RequestStore,
            source: source.into(),
        }
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SyncError::TransientFetch {
                origin: FetchOrigin::Player,
                ..
            } => "player_unavailable",
            SyncError::TransientFetch {
                origin: FetchOrigin::RequestStore,
                ..
            } => "store_unavailable",
            SyncError::CycleInProgress => "in_progress",
            SyncError::NotRunning => "not_running",
        }
    }
}
