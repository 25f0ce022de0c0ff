use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, metrics::metrics_handler, state::*, ServerConfig};
use crate::sync::{SyncEngine, SyncError};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub sync_running: bool,
    pub cycle_running: bool,
    pub host_visible: bool,
    pub last_completed_at: Option<String>,
    pub last_error: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct VisibilityBody {
    pub visible: bool,
}

#[derive(Serialize)]
struct LifecycleResponse {
    pub running: bool,
    pub changed: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match self {
            SyncError::CycleInProgress => StatusCode::CONFLICT,
            SyncError::NotRunning | SyncError::TransientFetch { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        let body = ErrorBody {
            error: self.label(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let sync_state = state.engine.state().await;
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        sync_running: state.engine.is_running().await,
        cycle_running: sync_state.cycle_running,
        host_visible: sync_state.host_visible,
        last_completed_at: sync_state.last_completed_at.map(|t| t.to_rfc3339()),
        last_error: sync_state.last_error,
    };
    Json(stats)
}

async fn get_now_playing(State(engine): State<GuardedSyncEngine>) -> Response {
    let view = engine.subscribe().borrow().clone();
    match view {
        Some(view) => Json(view).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn refresh(State(engine): State<GuardedSyncEngine>) -> Response {
    match engine.run_cycle_now().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_transitions(State(engine): State<GuardedSyncEngine>) -> impl IntoResponse {
    Json(engine.last_applied_transitions().await)
}

async fn get_sync_state(State(engine): State<GuardedSyncEngine>) -> impl IntoResponse {
    Json(engine.state().await)
}

async fn put_visibility(
    State(engine): State<GuardedSyncEngine>,
    Json(body): Json<VisibilityBody>,
) -> StatusCode {
    engine.set_host_visible(body.visible).await;
    StatusCode::NO_CONTENT
}

async fn post_connectivity(State(engine): State<GuardedSyncEngine>) -> StatusCode {
    engine.connectivity_restored().await;
    StatusCode::ACCEPTED
}

async fn post_start(State(engine): State<GuardedSyncEngine>) -> impl IntoResponse {
    let changed = engine.start().await;
    Json(LifecycleResponse {
        running: engine.is_running().await,
        changed,
    })
}

async fn post_stop(State(engine): State<GuardedSyncEngine>) -> impl IntoResponse {
    let changed = engine.stop().await;
    Json(LifecycleResponse {
        running: engine.is_running().await,
        changed,
    })
}

pub fn make_app(config: ServerConfig, engine: GuardedSyncEngine) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        engine,
    };

    let sync_routes: Router = Router::new()
        .route("/now-playing", get(get_now_playing))
        .route("/refresh", post(refresh))
        .route("/transitions", get(get_transitions))
        .route("/state", get(get_sync_state))
        .route("/visibility", put(put_visibility))
        .route("/connectivity", post(post_connectivity))
        .route("/start", post(post_start))
        .route("/stop", post(post_stop))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone())
        .nest("/v1/sync", sync_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serve the admin API until `shutdown_token` is cancelled.
pub async fn run_server(
    engine: std::sync::Arc<SyncEngine>,
    config: ServerConfig,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, engine);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind admin port {}", port))?;
    info!("Admin API listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_token.cancelled_owned())
        .await?;
    Ok(())
}
