use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::sync::SyncEngine;

use super::ServerConfig;

pub type GuardedSyncEngine = Arc<SyncEngine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedSyncEngine,
}

impl FromRef<ServerState> for GuardedSyncEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}
