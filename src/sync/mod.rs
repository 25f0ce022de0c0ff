//! Now-playing reconciliation.
//!
//! Polls the venue player and the song request store and moves requests
//! through `queued/approved -> playing -> done` as tracks change.

mod cycle;
mod engine;
mod errors;
mod handle;
pub mod matcher;
pub mod reconciler;
mod scheduler;
mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use cycle::{CycleReport, SyncCycle};
pub use engine::{SyncEngine, SyncSettings};
pub use errors::{FetchOrigin, SyncError};
pub use handle::{SchedulerCommand, SharedSyncState, SyncHandle, SyncTrigger};
pub use reconciler::{
    plan_transitions, track_changed, track_ended, ReconciliationState, Transition,
};
pub use scheduler::{create_scheduler, SyncScheduler};
pub use view::NowPlayingView;
