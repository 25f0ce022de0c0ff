//! External player gateway.
//!
//! Read-only access to the venue player's playback state and upcoming queue.

mod client;
mod models;

pub use client::HttpPlayerGateway;
pub use models::{PlaybackStatusResponse, QueueResponse, WireArtist, WireTrack};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The external player's description of what is sounding for one poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub uri: String,
    pub name: String,
    pub artist_names: Vec<String>,
}

impl TrackIdentity {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, artists: &[&str]) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            artist_names: artists.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Identity carrying only the opaque player uri.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Artist names joined the way the dashboard displays them.
    pub fn artist_label(&self) -> String {
        self.artist_names.join(", ")
    }

    /// True when the identity carries neither a uri nor a name.
    pub fn is_blank(&self) -> bool {
        self.uri.is_empty() && self.name.trim().is_empty()
    }
}

impl std::fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.artist_names.is_empty() {
            write!(f, "{} <{}>", self.name, self.uri)
        } else {
            write!(f, "{} - {} <{}>", self.artist_label(), self.name, self.uri)
        }
    }
}

/// Snapshot of the player's playback state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlaybackStatus {
    pub current_track: Option<TrackIdentity>,
    pub is_playing: bool,
    pub progress_ms: u64,
}

/// Snapshot of the player's upcoming queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UpcomingQueue {
    pub currently_playing: Option<TrackIdentity>,
    pub tracks: Vec<TrackIdentity>,
}

/// Read-only view of the venue player.
#[async_trait]
pub trait PlayerGateway: Send + Sync {
    /// Current playback snapshot.
    async fn playback_status(&self) -> Result<PlaybackStatus>;

    /// Upcoming queue snapshot. Only used for display.
    async fn upcoming_queue(&self) -> Result<UpcomingQueue>;
}
