//! Now-Playing Sync Library
//!
//! Keeps a venue's song request queue in step with what its music player is
//! actually playing. Modules are public for the binary and the integration
//! tests.

pub mod config;
pub mod player;
pub mod request_store;
pub mod server;
pub mod sqlite_persistence;
pub mod sync;

// Re-export commonly used types for convenience
pub use player::{HttpPlayerGateway, PlayerGateway, TrackIdentity};
pub use request_store::{
    HttpRequestStore, RequestStatus, RequestStore, SongRequest, SqliteRequestStore, StoreError,
};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use sync::{NowPlayingView, SyncEngine, SyncError, SyncSettings, Transition};
