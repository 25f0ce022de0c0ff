//! Fake venue backend
//!
//! Serves the playback and song request endpoints the engine polls, backed by
//! in-memory state that tests can inspect and change between cycles.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use now_playing_sync::request_store::{StatusUpdateBody, WireSongRequest};
use now_playing_sync::RequestStatus;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
pub struct FakeTrack {
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
}

impl FakeTrack {
    pub fn new(uri: &str, name: &str, artists: &[&str]) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "uri": self.uri,
            "name": self.name,
            "artists": self.artists.iter().map(|a| json!({ "name": a })).collect::<Vec<_>>(),
        })
    }
}

#[derive(Default)]
struct VenueState {
    playing: Option<FakeTrack>,
    upcoming: Vec<FakeTrack>,
    player_down: bool,
    requests: Vec<WireSongRequest>,
    conflicting_ids: HashSet<String>,
    status_polls: usize,
    status_updates: Vec<(String, String)>,
}

type SharedVenue = Arc<Mutex<VenueState>>;

/// In-process venue backend on a random port.
pub struct FakeVenue {
    pub base_url: String,
    state: SharedVenue,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<String>,
    limit: Option<usize>,
}

async fn playback_status(State(state): State<SharedVenue>) -> Response {
    let mut state = state.lock().unwrap();
    state.status_polls += 1;
    if state.player_down {
        return (StatusCode::BAD_GATEWAY, "player unreachable").into_response();
    }
    let body = match &state.playing {
        Some(track) => json!({
            "ok": true,
            "status": {
                "is_playing": true,
                "progress_ms": 30000,
                "item": track.to_json(),
            }
        }),
        None => json!({ "ok": true, "status": null }),
    };
    Json(body).into_response()
}

async fn playback_queue(State(state): State<SharedVenue>) -> Response {
    let state = state.lock().unwrap();
    if state.player_down {
        return (StatusCode::BAD_GATEWAY, "player unreachable").into_response();
    }
    Json(json!({
        "ok": true,
        "queue": {
            "currently_playing": state.playing.as_ref().map(FakeTrack::to_json),
            "queue": state.upcoming.iter().map(FakeTrack::to_json).collect::<Vec<_>>(),
        }
    }))
    .into_response()
}

async fn list_requests(
    State(state): State<SharedVenue>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    let wanted: Option<Vec<String>> = query
        .status
        .map(|s| s.split(',').map(|s| s.to_string()).collect());
    let mut items: Vec<&WireSongRequest> = state
        .requests
        .iter()
        .filter(|r| wanted.as_ref().map_or(true, |w| w.contains(&r.status)))
        .collect();
    items.sort_by_key(|r| r.created_at);
    let total = items.len();
    items.truncate(query.limit.unwrap_or(100));
    Json(json!({ "ok": true, "items": items, "total": total }))
}

async fn update_request(
    State(state): State<SharedVenue>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateBody>,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.conflicting_ids.contains(&id) {
        return (StatusCode::CONFLICT, "request changed by staff").into_response();
    }
    let Some(request) = state.requests.iter_mut().find(|r| r.id == id) else {
        return (StatusCode::NOT_FOUND, "no such request").into_response();
    };
    request.status = body.status.as_str().to_string();
    state.status_updates.push((id, body.status.as_str().to_string()));
    Json(json!({ "ok": true })).into_response()
}

impl FakeVenue {
    pub async fn spawn() -> Self {
        let state: SharedVenue = Arc::new(Mutex::new(VenueState::default()));

        let app = Router::new()
            .route("/api/music/playback/status", get(playback_status))
            .route("/api/music/playback/queue", get(playback_queue))
            .route("/api/music/requests", get(list_requests))
            .route("/api/music/requests/{id}", put(update_request))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake venue failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn play(&self, track: Option<FakeTrack>) {
        self.state.lock().unwrap().playing = track;
    }

    pub fn set_upcoming(&self, tracks: Vec<FakeTrack>) {
        self.state.lock().unwrap().upcoming = tracks;
    }

    pub fn set_player_down(&self, down: bool) {
        self.state.lock().unwrap().player_down = down;
    }

    /// Add a request submitted `minute` minutes into the evening.
    pub fn add_request(
        &self,
        id: &str,
        track_uri: &str,
        title: &str,
        artist: &str,
        status: RequestStatus,
        minute: i64,
    ) {
        let created_at: DateTime<Utc> =
            Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap() + ChronoDuration::minutes(minute);
        self.state.lock().unwrap().requests.push(WireSongRequest {
            id: id.to_string(),
            track_uri: track_uri.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            status: status.as_str().to_string(),
            created_at,
            image_url: None,
            votes: 0,
        });
    }

    /// Change a request's status the way staff do from the dashboard.
    pub fn staff_set_status(&self, id: &str, status: RequestStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(request) = state.requests.iter_mut().find(|r| r.id == id) {
            request.status = status.as_str().to_string();
        }
    }

    /// Make every status update of `id` answer 409.
    pub fn conflict_on(&self, id: &str) {
        self.state.lock().unwrap().conflicting_ids.insert(id.to_string());
    }

    pub fn status_of(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status.clone())
    }

    pub fn statuses(&self) -> HashMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| (r.id.clone(), r.status.clone()))
            .collect()
    }

    pub fn status_polls(&self) -> usize {
        self.state.lock().unwrap().status_polls
    }

    /// Every status update received, in arrival order.
    pub fn status_updates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().status_updates.clone()
    }
}
