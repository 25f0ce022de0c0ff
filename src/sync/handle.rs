use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

use super::cycle::CycleReport;
use super::errors::SyncError;
use super::reconciler::Transition;

/// What caused a cycle to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Startup,
    Interval,
    Manual,
    Foregrounded,
    ConnectivityRestored,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Interval => "interval",
            SyncTrigger::Manual => "manual",
            SyncTrigger::Foregrounded => "foregrounded",
            SyncTrigger::ConnectivityRestored => "connectivity",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command sent to the scheduler.
pub enum SchedulerCommand {
    RunNow {
        response: oneshot::Sender<Result<CycleReport, SyncError>>,
    },
    SetHostVisible(bool),
    ConnectivityRestored,
}

/// Shared state between scheduler and handle. Outlives a single scheduler so
/// visibility survives a stop/start.
#[derive(Debug, Clone, Serialize)]
pub struct SharedSyncState {
    pub host_visible: bool,
    pub cycle_running: bool,
    pub last_transitions: Vec<Transition>,
    pub last_trigger: Option<SyncTrigger>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for SharedSyncState {
    fn default() -> Self {
        Self {
            host_visible: true,
            cycle_running: false,
            last_transitions: Vec::new(),
            last_trigger: None,
            last_completed_at: None,
            last_error: None,
        }
    }
}

/// Handle to interact with a running scheduler.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    shared_state: Arc<RwLock<SharedSyncState>>,
}

impl SyncHandle {
    pub fn new(
        command_tx: mpsc::Sender<SchedulerCommand>,
        shared_state: Arc<RwLock<SharedSyncState>>,
    ) -> Self {
        Self {
            command_tx,
            shared_state,
        }
    }

    /// Run a cycle now and wait for its report.
    pub async fn run_cycle_now(&self) -> Result<CycleReport, SyncError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::RunNow {
                response: response_tx,
            })
            .await
            .map_err(|_| SyncError::NotRunning)?;

        response_rx.await.map_err(|_| SyncError::NotRunning)?
    }

    /// Report whether the host is in the foreground.
    pub async fn set_host_visible(&self, visible: bool) -> Result<(), SyncError> {
        self.command_tx
            .send(SchedulerCommand::SetHostVisible(visible))
            .await
            .map_err(|_| SyncError::NotRunning)
    }

    /// Report that network connectivity came back.
    pub async fn connectivity_restored(&self) -> Result<(), SyncError> {
        self.command_tx
            .send(SchedulerCommand::ConnectivityRestored)
            .await
            .map_err(|_| SyncError::NotRunning)
    }

    /// Transitions applied by the last completed cycle.
    pub async fn last_applied_transitions(&self) -> Vec<Transition> {
        self.shared_state.read().await.last_transitions.clone()
    }

    pub async fn is_cycle_running(&self) -> bool {
        self.shared_state.read().await.cycle_running
    }

    /// Snapshot of the shared scheduler state.
    pub async fn snapshot(&self) -> SharedSyncState {
        self.shared_state.read().await.clone()
    }
}
