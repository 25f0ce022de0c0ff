//! Test rig lifecycle management
//!
//! Wires a sync engine to a fake venue through the real HTTP collaborators and
//! serves the admin API on a random port.

use super::constants::*;
use super::venue::FakeVenue;
use now_playing_sync::server::{make_app, RequestsLoggingLevel, ServerConfig};
use now_playing_sync::{
    HttpPlayerGateway, HttpRequestStore, PlayerGateway, RequestStore, SyncEngine, SyncSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct TestRig {
    /// Base URL of the admin API (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub venue: FakeVenue,

    pub engine: Arc<SyncEngine>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestRig {
    /// Spawn a rig that only polls when told to.
    pub async fn spawn() -> Self {
        Self::spawn_with_interval(Duration::from_millis(MANUAL_POLL_INTERVAL_MS)).await
    }

    pub async fn spawn_with_interval(poll_interval: Duration) -> Self {
        let venue = FakeVenue::spawn().await;

        let gateway: Arc<dyn PlayerGateway> = Arc::new(
            HttpPlayerGateway::new(venue.base_url.clone(), 5).expect("Failed to build gateway"),
        );
        let store: Arc<dyn RequestStore> = Arc::new(
            HttpRequestStore::new(venue.base_url.clone(), 5, 100)
                .expect("Failed to build request store"),
        );
        let engine = Arc::new(SyncEngine::new(
            gateway,
            store,
            SyncSettings {
                poll_interval,
                max_concurrent_updates: 4,
            },
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(config, engine.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            venue,
            engine,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Start the engine and wait for its startup cycle to finish.
    pub async fn start_engine(&self) {
        let polls = self.venue.status_polls();
        self.engine.start().await;
        self.wait_for_polls(polls + 1).await;
    }

    /// Wait until the venue has been polled `at_least` times and no cycle is
    /// in flight.
    pub async fn wait_for_polls(&self, at_least: usize) {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SYNC_SETTLE_TIMEOUT_MS);
        loop {
            if self.venue.status_polls() >= at_least && !self.engine.state().await.cycle_running
            {
                return;
            }
            if start.elapsed() > timeout {
                panic!(
                    "Venue polled {} times, expected at least {}",
                    self.venue.status_polls(),
                    at_least
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
