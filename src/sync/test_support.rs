//! Fakes shared by the sync unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::player::{PlaybackStatus, PlayerGateway, TrackIdentity, UpcomingQueue};
use crate::request_store::{RequestStatus, RequestStore, SongRequest, SqliteRequestStore, StoreError};

/// Player whose sounding track is set by the test.
#[derive(Default)]
pub struct ScriptedPlayer {
    current: Mutex<Option<TrackIdentity>>,
    queue: Mutex<UpcomingQueue>,
    pub status_fails: AtomicBool,
    pub queue_fails: AtomicBool,
    delay: Mutex<Duration>,
    pub status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&self, track: Option<TrackIdentity>) {
        *self.current.lock().unwrap() = track;
    }

    pub fn set_queue(&self, queue: UpcomingQueue) {
        *self.queue.lock().unwrap() = queue;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerGateway for ScriptedPlayer {
    async fn playback_status(&self) -> Result<PlaybackStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.status_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("player offline"));
        }
        let current = self.current.lock().unwrap().clone();
        Ok(PlaybackStatus {
            is_playing: current.is_some(),
            current_track: current,
            progress_ms: 0,
        })
    }

    async fn upcoming_queue(&self) -> Result<UpcomingQueue> {
        if self.queue_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("queue unavailable"));
        }
        Ok(self.queue.lock().unwrap().clone())
    }
}

/// In-memory SQLite store with injectable failures.
pub struct FlakyStore {
    pub inner: SqliteRequestStore,
    pub conflicting_ids: Mutex<HashSet<String>>,
    pub list_fails: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteRequestStore::in_memory().unwrap(),
            conflicting_ids: Mutex::new(HashSet::new()),
            list_fails: AtomicBool::new(false),
        }
    }

    pub fn with_requests(requests: &[SongRequest]) -> Self {
        let store = Self::new();
        for request in requests {
            store.inner.insert_request(request).unwrap();
        }
        store
    }

    pub fn conflict_on(&self, id: &str) {
        self.conflicting_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn status_of(&self, id: &str) -> Option<RequestStatus> {
        self.inner.get_request(id).unwrap().map(|r| r.status)
    }
}

#[async_trait]
impl RequestStore for FlakyStore {
    async fn list_requests(&self, statuses: &[RequestStatus]) -> Result<Vec<SongRequest>, StoreError> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("store offline")));
        }
        self.inner.list_requests(statuses).await
    }

    async fn update_request_status(
        &self,
        id: &str,
        new_status: RequestStatus,
    ) -> Result<(), StoreError> {
        if self.conflicting_ids.lock().unwrap().contains(id) {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                reason: "changed by staff".to_string(),
            });
        }
        self.inner.update_request_status(id, new_status).await
    }
}
