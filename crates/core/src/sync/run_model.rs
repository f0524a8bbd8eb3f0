//! Sync run domain models.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Which subset of the backend pipeline a run covers.
///
/// The scope is assigned by the backend when the run starts and fixed for
/// the lifetime of the run; it selects the stage table used for progress
/// estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncScope {
    /// Full pipeline: ads entities plus pages, Instagram and media.
    #[default]
    All,
    /// Ads entities only (ad accounts through ad insights).
    Meta,
    /// Pages, Instagram accounts and media only.
    Instagram,
}

/// Server-authoritative status of a sync run.
///
/// Transitions are monotonic: `Pending -> Running -> {Success, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncRunStatus {
    /// Queued, not picked up by a worker yet.
    #[default]
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with an error. A normal terminal outcome, not a tracker
    /// failure.
    Failed,
}

impl SyncRunStatus {
    /// True for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncRunStatus::Success | SyncRunStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            SyncRunStatus::Pending => 0,
            SyncRunStatus::Running => 1,
            SyncRunStatus::Success | SyncRunStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncRunStatus::Pending => write!(f, "pending"),
            SyncRunStatus::Running => write!(f, "running"),
            SyncRunStatus::Success => write!(f, "success"),
            SyncRunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The kind of job the user asked the backend to run.
///
/// Each kind maps to a dedicated start endpoint; the backend answers with
/// the scope it actually scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncJobKind {
    /// Full synchronization of every pipeline unit.
    Full,
    /// Ads entities only.
    Meta,
    /// Instagram entities only.
    Instagram,
    /// Full pipeline, insights restricted to the last 7 days.
    InsightsLast7Days,
    /// Full pipeline, insights restricted to the last day.
    InsightsLastDay,
}

impl SyncJobKind {
    /// The scope a run of this kind is expected to cover. Used as a
    /// fallback when the start response omits the scope.
    pub fn scope(&self) -> SyncScope {
        match self {
            SyncJobKind::Meta => SyncScope::Meta,
            SyncJobKind::Instagram => SyncScope::Instagram,
            SyncJobKind::Full
            | SyncJobKind::InsightsLast7Days
            | SyncJobKind::InsightsLastDay => SyncScope::All,
        }
    }
}

/// Represents one backend job invocation as seen from the client.
///
/// Created on a successful start call, mutated only by applying poll
/// responses, and discarded when a new run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    /// Opaque run identifier assigned by the backend.
    pub id: String,
    /// Which stage set applies. Fixed at creation.
    pub scope: SyncScope,
    /// Last server-reported status.
    pub status: SyncRunStatus,
    /// When the client observed the run starting.
    pub started_at: DateTime<Utc>,
    /// Server-reported finish time, once terminal.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    /// Create a freshly started run.
    pub fn new(id: String, scope: SyncScope, status: SyncRunStatus) -> Self {
        Self {
            id,
            scope,
            status,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// True iff the run reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a server-reported status, enforcing monotonicity.
    ///
    /// Backward transitions (for example a stale poll response claiming
    /// `pending` after `running`) are ignored. Returns whether the status
    /// actually changed.
    pub fn apply_status(&mut self, status: SyncRunStatus) -> bool {
        if status == self.status {
            return false;
        }
        if status.rank() < self.status.rank() {
            warn!(
                "ignoring backward status transition {} -> {} for run {}",
                self.status, status, self.id
            );
            return false;
        }
        self.status = status;
        true
    }
}
