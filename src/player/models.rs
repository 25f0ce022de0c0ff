//! Wire models for the venue backend's playback endpoints.
//!
//! The backend relays the player's own JSON, so only the fields the engine
//! reads are modelled; everything else is ignored by serde.

use serde::{Deserialize, Serialize};

use super::{PlaybackStatus, TrackIdentity, UpcomingQueue};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WireArtist {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WireTrack {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
}

impl WireTrack {
    /// Convert to a track identity. Tracks with neither uri nor name are dropped.
    pub fn to_identity(&self) -> Option<TrackIdentity> {
        let identity = TrackIdentity {
            uri: self.uri.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            artist_names: self
                .artists
                .iter()
                .map(|a| a.name.clone())
                .filter(|n| !n.is_empty())
                .collect(),
        };
        if identity.is_blank() {
            None
        } else {
            Some(identity)
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WirePlaybackState {
    #[serde(default)]
    pub item: Option<WireTrack>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

/// Response of `GET /api/music/playback/status`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PlaybackStatusResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub status: Option<WirePlaybackState>,
}

impl PlaybackStatusResponse {
    pub fn into_status(self) -> PlaybackStatus {
        match self.status {
            Some(state) => PlaybackStatus {
                current_track: state.item.as_ref().and_then(WireTrack::to_identity),
                is_playing: state.is_playing,
                progress_ms: state.progress_ms.unwrap_or(0),
            },
            None => PlaybackStatus::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WireQueue {
    #[serde(default)]
    pub currently_playing: Option<WireTrack>,
    #[serde(default)]
    pub queue: Vec<WireTrack>,
}

/// Response of `GET /api/music/playback/queue`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub queue: Option<WireQueue>,
}

impl QueueResponse {
    pub fn into_queue(self) -> UpcomingQueue {
        let queue = self.queue.unwrap_or_default();
        UpcomingQueue {
            currently_playing: queue
                .currently_playing
                .as_ref()
                .and_then(WireTrack::to_identity),
            tracks: queue.queue.iter().filter_map(WireTrack::to_identity).collect(),
        }
    }
}
