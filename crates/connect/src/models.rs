//! Wire models for the sync API.
//! These mirror the backend's JSON response structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adsync_core::sync::{LogEntry, SyncRunStatus, SyncScope};

/// Response from the start-sync endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSyncResponse {
    /// Identifier of the run the backend just scheduled.
    #[serde(rename = "sync_run_id")]
    pub run_id: String,

    /// Initial status, normally `pending`.
    #[serde(default)]
    pub status: SyncRunStatus,

    /// Scope the backend scheduled. Older backends omit it.
    #[serde(default, rename = "sync_scope")]
    pub scope: Option<SyncScope>,
}

/// Run summary embedded in every log page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub status: SyncRunStatus,

    #[serde(default)]
    pub is_finished: bool,

    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// One page of incremental logs for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogsPage {
    /// Entries with id strictly greater than the requested cursor.
    #[serde(default)]
    pub logs: Vec<LogEntry>,

    /// Cursor for the next fetch. Absent means "keep the current cursor".
    #[serde(default)]
    pub next_since_id: Option<i64>,

    /// Current run state, server-authoritative.
    #[serde(rename = "sync_run")]
    pub run: RunSummary,
}

/// Error body the API returns on a refused start call.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default)]
    pub sync_requires_reconnect: bool,
}
