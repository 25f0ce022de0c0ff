use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::errors::SyncError;
use super::reconciler::{plan_transitions, track_changed, ReconciliationState, Transition};
use super::view::NowPlayingView;
use crate::player::{PlayerGateway, TrackIdentity};
use crate::request_store::{RequestStatus, RequestStore, SongRequest, StoreError};
use crate::server::metrics;

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    /// Transitions the store accepted, in plan order.
    pub transitions: Vec<Transition>,
    pub track_changed: bool,
    /// Planned updates the store refused or could not take.
    pub skipped_updates: usize,
}

/// One poll-fetch-compare-apply pass over the player and the request store.
pub struct SyncCycle {
    gateway: Arc<dyn PlayerGateway>,
    store: Arc<dyn RequestStore>,
    max_concurrent_updates: usize,
    view_tx: watch::Sender<Option<NowPlayingView>>,
}

impl SyncCycle {
    pub fn new(
        gateway: Arc<dyn PlayerGateway>,
        store: Arc<dyn RequestStore>,
        max_concurrent_updates: usize,
    ) -> Self {
        let (view_tx, _) = watch::channel(None);
        Self {
            gateway,
            store,
            max_concurrent_updates: max_concurrent_updates.max(1),
            view_tx,
        }
    }

    /// Receiver of the view published after each successful cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<NowPlayingView>> {
        self.view_tx.subscribe()
    }

    /// Run a full cycle. On a failed required fetch `state` is left untouched.
    pub async fn run(&self, state: &mut ReconciliationState) -> Result<CycleReport, SyncError> {
        let (status, queue) = tokio::join!(
            self.gateway.playback_status(),
            self.gateway.upcoming_queue()
        );
        let status = status.map_err(SyncError::player)?;
        let queue = match queue {
            Ok(queue) => Some(queue),
            Err(e) => {
                warn!("Failed to fetch upcoming queue, keeping previous one: {}", e);
                None
            }
        };

        let current = status.current_track.clone().or_else(|| {
            queue
                .as_ref()
                .and_then(|q| q.currently_playing.clone())
        });

        let open_requests = self.fetch_open_requests().await?;
        let previous = state.last_observed.clone();
        let changed = track_changed(current.as_ref(), previous.as_ref());
        if changed {
            if let (Some(previous), Some(current)) = (&previous, &current) {
                info!("Track changed: {} -> {}", previous, current);
            }
        }

        let (applied, skipped_updates) = self
            .apply_plan(current.as_ref(), previous.as_ref(), &open_requests)
            .await;

        state.last_observed = current.clone();

        let upcoming = match queue {
            Some(queue) => queue.tracks,
            None => self
                .view_tx
                .borrow()
                .as_ref()
                .map(|view| view.upcoming.clone())
                .unwrap_or_default(),
        };
        let view = NowPlayingView::build(
            &status,
            current.as_ref(),
            &open_requests,
            &applied,
            upcoming,
        );
        self.view_tx.send_replace(Some(view));

        Ok(CycleReport {
            transitions: applied,
            track_changed: changed,
            skipped_updates,
        })
    }

    /// Plan and apply transitions for the given observations against a fresh
    /// read of the open requests. Returns the transitions the store accepted.
    pub async fn reconcile(
        &self,
        current: Option<&TrackIdentity>,
        previous: Option<&TrackIdentity>,
    ) -> Result<Vec<Transition>, SyncError> {
        let open_requests = self.fetch_open_requests().await?;
        let (applied, _) = self.apply_plan(current, previous, &open_requests).await;
        Ok(applied)
    }

    async fn fetch_open_requests(&self) -> Result<Vec<SongRequest>, SyncError> {
        self.store
            .list_requests(&RequestStatus::OPEN)
            .await
            .map_err(SyncError::request_store)
    }

    async fn apply_plan(
        &self,
        current: Option<&TrackIdentity>,
        previous: Option<&TrackIdentity>,
        open_requests: &[SongRequest],
    ) -> (Vec<Transition>, usize) {
        let plan = plan_transitions(current, previous, open_requests);
        if plan.is_empty() {
            return (Vec::new(), 0);
        }
        debug!("Planned {} transition(s): {:?}", plan.len(), plan);

        let planned = plan.len();
        let mut applied: Vec<(usize, Transition)> = stream::iter(plan.into_iter().enumerate())
            .map(|(index, transition)| async move {
                self.apply_one(&transition)
                    .await
                    .then_some((index, transition))
            })
            .buffer_unordered(self.max_concurrent_updates)
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;
        applied.sort_by_key(|(index, _)| *index);

        let applied: Vec<Transition> = applied.into_iter().map(|(_, t)| t).collect();
        let skipped = planned - applied.len();
        (applied, skipped)
    }

    /// Apply a single status update. Store refusals are logged and skipped.
    async fn apply_one(&self, transition: &Transition) -> bool {
        match self
            .store
            .update_request_status(&transition.request_id, transition.new_status)
            .await
        {
            Ok(()) => {
                info!(
                    "Request {} is now {}",
                    transition.request_id, transition.new_status
                );
                metrics::record_transition(transition.new_status.as_str());
                true
            }
            Err(e @ (StoreError::Conflict { .. } | StoreError::NotFound(_))) => {
                info!(
                    "Skipping {} -> {}: {}",
                    transition.request_id, transition.new_status, e
                );
                metrics::record_update_failure(e.kind());
                false
            }
            Err(e) => {
                warn!(
                    "Failed to move request {} to {}: {}",
                    transition.request_id, transition.new_status, e
                );
                metrics::record_update_failure(e.kind());
                false
            }
        }
    }
}
