use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a song request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Queued,
    Approved,
    Playing,
    Rejected, // terminal, staff only
    Done,     // terminal
}

impl RequestStatus {
    /// Statuses eligible for promotion.
    pub const PENDING: [RequestStatus; 2] = [RequestStatus::Queued, RequestStatus::Approved];

    /// Statuses that may still be closed when their track ends.
    pub const OPEN: [RequestStatus; 3] = [
        RequestStatus::Queued,
        RequestStatus::Approved,
        RequestStatus::Playing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "queued",
            RequestStatus::Approved => "approved",
            RequestStatus::Playing => "playing",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Done => "done",
        }
    }

    /// Parse a status as stored or sent by the backend. Case-insensitive,
    /// the dashboard historically sent upper-case values.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Some(RequestStatus::Queued),
            "approved" => Some(RequestStatus::Approved),
            "playing" => Some(RequestStatus::Playing),
            "rejected" => Some(RequestStatus::Rejected),
            "done" => Some(RequestStatus::Done),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Queued | RequestStatus::Approved)
    }

    pub fn is_open(&self) -> bool {
        self.is_pending() || *self == RequestStatus::Playing
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Done)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        match self {
            RequestStatus::Queued | RequestStatus::Approved => true,
            RequestStatus::Playing => {
                matches!(next, RequestStatus::Done | RequestStatus::Rejected)
            }
            RequestStatus::Rejected | RequestStatus::Done => false,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer-submitted song request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRequest {
    pub id: String,
    pub track_uri: String,
    pub title: String,
    pub artist: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub votes: u32,
}

impl SongRequest {
    pub fn new(
        id: impl Into<String>,
        track_uri: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        status: RequestStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            track_uri: track_uri.into(),
            title: title.into(),
            artist: artist.into(),
            status,
            created_at,
            image_url: None,
            votes: 0,
        }
    }

    /// A freshly submitted request with a generated id.
    pub fn submitted(
        track_uri: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            track_uri,
            title,
            artist,
            RequestStatus::Queued,
            Utc::now(),
        )
    }
}

/// Song request as returned by the venue backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSongRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub track_uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub votes: u32,
}

impl WireSongRequest {
    /// Convert to the domain model. Requests with an unknown status are dropped.
    pub fn into_request(self) -> Option<SongRequest> {
        let status = RequestStatus::from_db_str(&self.status)?;
        Some(SongRequest {
            id: self.id,
            track_uri: self.track_uri,
            title: self.title,
            artist: self.artist,
            status,
            created_at: self.created_at,
            image_url: self.image_url,
            votes: self.votes,
        })
    }
}

/// Response of `GET /api/music/requests`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestsResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub items: Vec<WireSongRequest>,
    #[serde(default)]
    pub total: usize,
}

/// Body of `PUT /api/music/requests/{id}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusUpdateBody {
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
