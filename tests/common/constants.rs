//! Shared constants for end-to-end tests

// ============================================================================
// Test Tracks
// ============================================================================

/// "Opening Song" by The Test Band
pub const TRACK_A_URI: &str = "spotify:track:aaaa";
pub const TRACK_A_NAME: &str = "Opening Song";

/// "Second Song" by The Test Band
pub const TRACK_B_URI: &str = "spotify:track:bbbb";
pub const TRACK_B_NAME: &str = "Second Song";

/// "Third Song" by Jazz Ensemble, never requested
pub const TRACK_C_URI: &str = "spotify:track:cccc";
pub const TRACK_C_NAME: &str = "Third Song";

pub const BAND: &str = "The Test Band";
pub const JAZZ: &str = "Jazz Ensemble";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a server to accept connections
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Maximum time to wait for the sync engine to settle
pub const SYNC_SETTLE_TIMEOUT_MS: u64 = 5000;

/// Poll interval used when a test drives cycles manually
pub const MANUAL_POLL_INTERVAL_MS: u64 = 3_600_000;
