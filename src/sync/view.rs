use chrono::{DateTime, Utc};
use serde::Serialize;

use super::matcher::matches;
use super::reconciler::Transition;
use crate::player::{PlaybackStatus, TrackIdentity};
use crate::request_store::{RequestStatus, SongRequest};

/// Merged now-playing view published after every successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingView {
    pub current_track: Option<TrackIdentity>,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub now_playing_request: Option<SongRequest>,
    pub pending_requests: Vec<SongRequest>,
    pub upcoming: Vec<TrackIdentity>,
    pub refreshed_at: DateTime<Utc>,
}

impl NowPlayingView {
    /// Build the view from one cycle's snapshots, with `applied` folded into
    /// the fetched request list.
    pub fn build(
        status: &PlaybackStatus,
        current: Option<&TrackIdentity>,
        open_requests: &[SongRequest],
        applied: &[Transition],
        upcoming: Vec<TrackIdentity>,
    ) -> Self {
        let mut requests: Vec<SongRequest> = open_requests.to_vec();
        for transition in applied {
            if let Some(request) = requests.iter_mut().find(|r| r.id == transition.request_id) {
                request.status = transition.new_status;
            }
        }
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let now_playing_request = current.and_then(|current| {
            requests
                .iter()
                .find(|r| r.status == RequestStatus::Playing && matches(r, current))
                .cloned()
        });

        let pending_requests = requests
            .into_iter()
            .filter(|r| r.status.is_pending())
            .collect();

        Self {
            current_track: current.cloned(),
            is_playing: status.is_playing,
            progress_ms: status.progress_ms,
            now_playing_request,
            pending_requests,
            upcoming,
            refreshed_at: Utc::now(),
        }
    }
}
