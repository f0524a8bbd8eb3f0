//! Progress reporting for tracked sync runs.
//!
//! The tracker pushes state changes through this trait so hosts (Tauri
//! events, SSE, a TUI) can re-render without polling the snapshot.

use adsync_core::sync::SyncRun;

use crate::tracker::TrackSnapshot;

/// Trait for receiving tracker state changes.
pub trait SyncTrackReporter: Send + Sync {
    /// A run was started and is now being tracked.
    fn track_started(&self, run: &SyncRun);

    /// Derived state changed after a poll tick.
    fn track_progress(&self, snapshot: &TrackSnapshot);

    /// The run reached a terminal status and tracking stopped.
    fn track_finished(&self, run: &SyncRun);
}

/// A no-op reporter for hosts that only use the pull-based snapshot.
#[derive(Debug, Clone, Default)]
pub struct NoOpTrackReporter;

impl SyncTrackReporter for NoOpTrackReporter {
    fn track_started(&self, _run: &SyncRun) {
        // No-op
    }

    fn track_progress(&self, _snapshot: &TrackSnapshot) {
        // No-op
    }

    fn track_finished(&self, _run: &SyncRun) {
        // No-op
    }
}
