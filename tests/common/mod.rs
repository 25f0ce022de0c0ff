//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeTrack, TestClient, TestRig, TRACK_A_URI};
//!
//! #[tokio::test]
//! async fn test_refresh() {
//!     let rig = TestRig::spawn().await;
//!     rig.start_engine().await;
//!     let client = TestClient::new(rig.base_url.clone());
//!
//!     rig.venue.play(Some(FakeTrack::new(TRACK_A_URI, "Song", &[])));
//!     let response = client.refresh().await;
//!     assert_eq!(response.status(), reqwest::StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod server;
mod venue;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::TestRig;
pub use venue::{FakeTrack, FakeVenue};
