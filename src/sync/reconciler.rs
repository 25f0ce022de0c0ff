//! Transition planning.
//!
//! Given what is sounding now, what was sounding on the previous poll and the
//! open request set, decide which requests close and which single request is
//! promoted. No I/O happens here; `SyncCycle` fetches and applies.

use serde::Serialize;
use std::collections::HashSet;

use super::matcher::{matches, same_track};
use crate::player::TrackIdentity;
use crate::request_store::{RequestStatus, SongRequest};

/// A single request status change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Transition {
    pub request_id: String,
    pub new_status: RequestStatus,
}

impl Transition {
    pub fn new(request_id: impl Into<String>, new_status: RequestStatus) -> Self {
        Self {
            request_id: request_id.into(),
            new_status,
        }
    }
}

/// Engine-owned memory of the previous poll.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationState {
    pub last_observed: Option<TrackIdentity>,
}

/// Whether the sounding track changed between two observations. A first
/// observation (no previous track) is not a change.
pub fn track_changed(current: Option<&TrackIdentity>, previous: Option<&TrackIdentity>) -> bool {
    match (current, previous) {
        (Some(current), Some(previous)) => !same_track(current, previous),
        _ => false,
    }
}

/// Whether the previously observed track stopped sounding: it was replaced by
/// another track or playback now reports nothing.
pub fn track_ended(current: Option<&TrackIdentity>, previous: Option<&TrackIdentity>) -> bool {
    match (current, previous) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(current), Some(previous)) => !same_track(current, previous),
    }
}

/// Plan the transitions of one cycle.
///
/// `open_requests` must hold the requests currently `queued`, `approved` or
/// `playing`; anything else is ignored. Closures come first in the returned
/// list, the promotion (if any) last. Promotion only happens on a first
/// observation or a track change, so re-observing a stable track plans nothing.
pub fn plan_transitions(
    current: Option<&TrackIdentity>,
    previous: Option<&TrackIdentity>,
    open_requests: &[SongRequest],
) -> Vec<Transition> {
    let open: Vec<&SongRequest> = open_requests
        .iter()
        .filter(|r| r.status.is_open())
        .collect();

    let mut transitions = Vec::new();
    let mut closing: HashSet<&str> = HashSet::new();

    if let Some(previous) = previous.filter(|_| track_ended(current, previous)) {
        for request in open.iter().filter(|r| matches(r, previous)) {
            closing.insert(request.id.as_str());
            transitions.push(Transition::new(request.id.clone(), RequestStatus::Done));
        }
    }

    let newly_observed = previous.is_none() || track_changed(current, previous);
    if let Some(current) = current.filter(|_| newly_observed) {
        let already_playing = open.iter().any(|r| {
            r.status == RequestStatus::Playing
                && !closing.contains(r.id.as_str())
                && matches(r, current)
        });

        if !already_playing {
            let pick = open
                .iter()
                .filter(|r| r.status.is_pending())
                .filter(|r| !closing.contains(r.id.as_str()))
                .filter(|r| matches(r, current))
                .min_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.id.cmp(&b.id))
                });
            if let Some(pick) = pick {
                transitions.push(Transition::new(pick.id.clone(), RequestStatus::Playing));
            }
        }
    }

    transitions
}
