use super::cycle::{CycleReport, SyncCycle};
use super::errors::SyncError;
use super::handle::{SchedulerCommand, SharedSyncState, SyncHandle, SyncTrigger};
use super::reconciler::ReconciliationState;
use crate::server::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest time shutdown waits for an in-flight cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Drives reconciliation cycles: one at a time, on a fixed period and on
/// demand.
pub struct SyncScheduler {
    cycle: Arc<SyncCycle>,

    /// Owned by whichever cycle is running. Fresh for every scheduler.
    reconciliation_state: Arc<Mutex<ReconciliationState>>,

    /// Shared state accessible by SyncHandle
    shared_state: Arc<RwLock<SharedSyncState>>,

    /// Task of the cycle in flight, if any
    in_flight: Option<JoinHandle<()>>,

    /// Receiver for commands from SyncHandle
    command_receiver: mpsc::Receiver<SchedulerCommand>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,

    poll_interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        cycle: Arc<SyncCycle>,
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        shared_state: Arc<RwLock<SharedSyncState>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            cycle,
            reconciliation_state: Arc::new(Mutex::new(ReconciliationState::default())),
            shared_state,
            in_flight: None,
            command_receiver,
            shutdown_token,
            poll_interval,
        }
    }

    /// Main scheduler loop.
    pub async fn run(&mut self) {
        info!(
            "Starting now-playing sync, polling every {:?}",
            self.poll_interval
        );

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.poll_interval,
            self.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if self.host_visible().await {
            self.spawn_cycle(SyncTrigger::Startup, None).await;
        } else {
            debug!("Host hidden at startup, waiting to be foregrounded");
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick().await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Sync scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    async fn cycle_in_flight(&self) -> bool {
        self.shared_state.read().await.cycle_running
    }

    async fn host_visible(&self) -> bool {
        self.shared_state.read().await.host_visible
    }

    async fn on_tick(&mut self) {
        if !self.host_visible().await {
            debug!("Skipping tick, host is hidden");
            metrics::record_skipped_tick("hidden");
            return;
        }
        if self.cycle_in_flight().await {
            debug!("Skipping tick, a cycle is still in flight");
            metrics::record_skipped_tick("in_flight");
            return;
        }
        self.spawn_cycle(SyncTrigger::Interval, None).await;
    }

    /// Handle a command from the SyncHandle.
    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::RunNow { response } => {
                if self.cycle_in_flight().await {
                    let _ = response.send(Err(SyncError::CycleInProgress));
                } else {
                    self.spawn_cycle(SyncTrigger::Manual, Some(response)).await;
                }
            }
            SchedulerCommand::SetHostVisible(visible) => {
                let was_visible = {
                    let mut state = self.shared_state.write().await;
                    std::mem::replace(&mut state.host_visible, visible)
                };
                if visible && !was_visible {
                    info!("Host foregrounded");
                    self.trigger_if_idle(SyncTrigger::Foregrounded).await;
                } else if !visible && was_visible {
                    info!("Host hidden, suspending polling");
                }
            }
            SchedulerCommand::ConnectivityRestored => {
                if self.host_visible().await {
                    info!("Connectivity restored");
                    self.trigger_if_idle(SyncTrigger::ConnectivityRestored).await;
                } else {
                    debug!("Connectivity restored while hidden, ignoring");
                }
            }
        }
    }

    async fn trigger_if_idle(&mut self, trigger: SyncTrigger) {
        if self.cycle_in_flight().await {
            debug!("Not starting {} cycle, one is already in flight", trigger);
            metrics::record_skipped_tick("in_flight");
            return;
        }
        self.spawn_cycle(trigger, None).await;
    }

    /// Spawn a cycle task. `response` receives the outcome of manual runs.
    async fn spawn_cycle(
        &mut self,
        trigger: SyncTrigger,
        response: Option<oneshot::Sender<Result<CycleReport, SyncError>>>,
    ) {
        debug!("Starting sync cycle (trigger: {})", trigger);

        {
            let mut state = self.shared_state.write().await;
            state.cycle_running = true;
        }

        let cycle = Arc::clone(&self.cycle);
        let reconciliation_state = Arc::clone(&self.reconciliation_state);
        let shared_state = Arc::clone(&self.shared_state);

        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = {
                let mut reconciliation_state = reconciliation_state.lock().await;
                cycle.run(&mut reconciliation_state).await
            };
            let elapsed = start_time.elapsed();

            {
                let mut state = shared_state.write().await;
                state.cycle_running = false;
                state.last_trigger = Some(trigger);
                match &result {
                    Ok(report) => {
                        state.last_transitions = report.transitions.clone();
                        state.last_completed_at = Some(chrono::Utc::now());
                        state.last_error = None;
                    }
                    Err(e) => {
                        state.last_error = Some(e.to_string());
                    }
                }
            }

            match &result {
                Ok(report) => {
                    if report.transitions.is_empty() {
                        debug!("Sync cycle ({}) finished in {:?}", trigger, elapsed);
                    } else {
                        info!(
                            "Sync cycle ({}) applied {} transition(s) in {:?}",
                            trigger,
                            report.transitions.len(),
                            elapsed
                        );
                    }
                    metrics::record_cycle(trigger.as_str(), "success", elapsed);
                }
                Err(e) => {
                    warn!("Sync cycle ({}) failed after {:?}: {}", trigger, elapsed, e);
                    metrics::record_cycle(trigger.as_str(), e.label(), elapsed);
                }
            }

            if let Some(response) = response {
                let _ = response.send(result);
            }
        });

        self.in_flight = Some(handle);
    }

    /// Stop scheduling and let the in-flight cycle finish.
    async fn shutdown(&mut self) {
        info!("Shutting down sync scheduler...");

        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                info!("Waiting for in-flight sync cycle to complete...");
            }
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("In-flight sync cycle did not finish within {:?}", SHUTDOWN_GRACE);
            }
        }

        info!("Sync scheduler shutdown complete");
    }
}

/// Create a scheduler and its handle.
pub fn create_scheduler(
    cycle: Arc<SyncCycle>,
    shared_state: Arc<RwLock<SharedSyncState>>,
    shutdown_token: CancellationToken,
    poll_interval: Duration,
) -> (SyncScheduler, SyncHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);

    let scheduler = SyncScheduler::new(
        cycle,
        command_rx,
        shutdown_token,
        Arc::clone(&shared_state),
        poll_interval,
    );
    let handle = SyncHandle::new(command_tx, shared_state);

    (scheduler, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::TrackIdentity;
    use crate::request_store::{RequestStatus, SongRequest};
    use crate::sync::test_support::{FlakyStore, ScriptedPlayer};
    use chrono::Utc;
    use std::sync::atomic::Ordering;

    struct Harness {
        player: Arc<ScriptedPlayer>,
        store: Arc<FlakyStore>,
        handle: SyncHandle,
        shutdown_token: CancellationToken,
        task: JoinHandle<()>,
    }

    fn start(
        poll_interval: Duration,
        host_visible: bool,
        requests: &[SongRequest],
    ) -> Harness {
        let player = Arc::new(ScriptedPlayer::new());
        let store = Arc::new(FlakyStore::with_requests(requests));
        let cycle = Arc::new(SyncCycle::new(player.clone(), store.clone(), 4));
        let shared_state = Arc::new(RwLock::new(SharedSyncState {
            host_visible,
            ..Default::default()
        }));
        let shutdown_token = CancellationToken::new();
        let (mut scheduler, handle) =
            create_scheduler(cycle, shared_state, shutdown_token.clone(), poll_interval);
        let task = tokio::spawn(async move { scheduler.run().await });
        Harness {
            player,
            store,
            handle,
            shutdown_token,
            task,
        }
    }

    async fn wait_for_calls(player: &ScriptedPlayer, at_least: usize) {
        for _ in 0..200 {
            if player.calls() >= at_least {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("player was polled {} times, expected {}", player.calls(), at_least);
    }

    #[tokio::test]
    async fn runs_on_startup_and_on_interval() {
        let h = start(Duration::from_millis(30), true, &[]);
        wait_for_calls(&h.player, 3).await;

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn cycles_never_overlap() {
        let h = start(Duration::from_millis(10), true, &[]);
        h.player.set_delay(Duration::from_millis(60));

        tokio::time::sleep(Duration::from_millis(300)).await;

        h.shutdown_token.cancel();
        h.task.await.unwrap();
        assert!(h.player.calls() >= 2);
        assert_eq!(h.player.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn manual_run_returns_report() {
        let h = start(
            Duration::from_secs(3600),
            true,
            &[SongRequest::new(
                "a",
                "A",
                "Song",
                "Band",
                RequestStatus::Queued,
                Utc::now(),
            )],
        );
        wait_for_calls(&h.player, 1).await;
        while h.handle.is_cycle_running().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        h.player.play(Some(TrackIdentity::from_uri("A")));
        let report = h.handle.run_cycle_now().await.unwrap();
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(h.store.status_of("a"), Some(RequestStatus::Playing));
        assert_eq!(h.handle.last_applied_transitions().await, report.transitions);

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn manual_run_during_cycle_is_rejected() {
        let h = start(Duration::from_secs(3600), true, &[]);
        h.player.set_delay(Duration::from_millis(300));
        // The startup cycle is still sleeping in the player.
        wait_for_calls(&h.player, 1).await;

        let result = h.handle.run_cycle_now().await;
        assert!(matches!(result, Err(SyncError::CycleInProgress)));

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn hidden_host_is_not_polled_until_foregrounded() {
        let h = start(Duration::from_millis(20), false, &[]);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(h.player.calls(), 0);

        h.handle.set_host_visible(true).await.unwrap();
        wait_for_calls(&h.player, 1).await;

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn connectivity_restored_triggers_a_cycle() {
        let h = start(Duration::from_secs(3600), true, &[]);
        wait_for_calls(&h.player, 1).await;
        while h.handle.is_cycle_running().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        h.handle.connectivity_restored().await.unwrap();
        wait_for_calls(&h.player, 2).await;

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_cycle() {
        let h = start(Duration::from_secs(3600), true, &[]);
        h.player.set_delay(Duration::from_millis(150));
        wait_for_calls(&h.player, 1).await;

        h.shutdown_token.cancel();
        h.task.await.unwrap();

        let state = h.handle.snapshot().await;
        assert!(!state.cycle_running);
        assert!(state.last_completed_at.is_some());

        // No scheduler left to answer.
        assert!(matches!(
            h.handle.run_cycle_now().await,
            Err(SyncError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn failed_cycle_records_error() {
        let h = start(Duration::from_secs(3600), true, &[]);
        h.player.status_fails.store(true, Ordering::SeqCst);
        wait_for_calls(&h.player, 1).await;
        while h.handle.is_cycle_running().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let err = h.handle.run_cycle_now().await.unwrap_err();
        assert!(matches!(err, SyncError::TransientFetch { .. }));
        assert!(h.handle.snapshot().await.last_error.is_some());

        h.shutdown_token.cancel();
        h.task.await.unwrap();
    }
}
