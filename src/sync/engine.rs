use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::cycle::{CycleReport, SyncCycle};
use super::errors::SyncError;
use super::handle::{SharedSyncState, SyncHandle};
use super::reconciler::Transition;
use super::scheduler::create_scheduler;
use super::view::NowPlayingView;
use crate::player::PlayerGateway;
use crate::request_store::RequestStore;

/// Tuning of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub max_concurrent_updates: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(4000),
            max_concurrent_updates: 4,
        }
    }
}

struct RunningScheduler {
    handle: SyncHandle,
    shutdown_token: CancellationToken,
    task: JoinHandle<()>,
}

/// Keeps the venue player and the song request store in agreement.
///
/// `start` and `stop` are idempotent. Every `start` begins with a fresh
/// reconciliation state, so the first poll after a restart closes nothing.
pub struct SyncEngine {
    cycle: Arc<SyncCycle>,
    settings: SyncSettings,
    shared_state: Arc<RwLock<SharedSyncState>>,
    running: Mutex<Option<RunningScheduler>>,
}

impl SyncEngine {
    pub fn new(
        gateway: Arc<dyn PlayerGateway>,
        store: Arc<dyn RequestStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            cycle: Arc::new(SyncCycle::new(
                gateway,
                store,
                settings.max_concurrent_updates,
            )),
            settings,
            shared_state: Arc::new(RwLock::new(SharedSyncState::default())),
            running: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Start polling. Returns false if already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return false;
        }

        let shutdown_token = CancellationToken::new();
        let (mut scheduler, handle) = create_scheduler(
            Arc::clone(&self.cycle),
            Arc::clone(&self.shared_state),
            shutdown_token.clone(),
            self.settings.poll_interval,
        );
        let task = tokio::spawn(async move {
            scheduler.run().await;
        });

        *running = Some(RunningScheduler {
            handle,
            shutdown_token,
            task,
        });
        info!("Now-playing sync started");
        true
    }

    /// Stop polling and wait for the in-flight cycle, if any. Returns false if
    /// not running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().await.take() else {
            return false;
        };

        running.shutdown_token.cancel();
        if let Err(e) = running.task.await {
            error!("Sync scheduler task failed: {}", e);
        }
        info!("Now-playing sync stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    async fn handle(&self) -> Option<SyncHandle> {
        self.running.lock().await.as_ref().map(|r| r.handle.clone())
    }

    /// Run a cycle immediately and wait for it.
    pub async fn run_cycle_now(&self) -> Result<CycleReport, SyncError> {
        let handle = self.handle().await.ok_or(SyncError::NotRunning)?;
        handle.run_cycle_now().await
    }

    /// Transitions applied by the last completed cycle.
    pub async fn last_applied_transitions(&self) -> Vec<Transition> {
        self.shared_state.read().await.last_transitions.clone()
    }

    /// Record host visibility. While hidden no interval cycles run; becoming
    /// visible again triggers a cycle.
    pub async fn set_host_visible(&self, visible: bool) {
        if let Some(handle) = self.handle().await {
            if handle.set_host_visible(visible).await.is_ok() {
                return;
            }
        }
        self.shared_state.write().await.host_visible = visible;
    }

    /// Signal that connectivity came back. No-op when stopped.
    pub async fn connectivity_restored(&self) {
        if let Some(handle) = self.handle().await {
            let _ = handle.connectivity_restored().await;
        }
    }

    /// Receiver of the view published after each successful cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<NowPlayingView>> {
        self.cycle.subscribe()
    }

    /// Snapshot of the scheduler state.
    pub async fn state(&self) -> SharedSyncState {
        self.shared_state.read().await.clone()
    }
}
