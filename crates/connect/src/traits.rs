//! Traits defining the contract between the tracker and the sync API.

use async_trait::async_trait;

use adsync_core::sync::SyncJobKind;
use adsync_core::Result;

use crate::connection::ConnectionStatus;
use crate::models::{StartSyncResponse, SyncLogsPage};

/// Trait for the backend sync API.
///
/// `SyncApiClient` is the production implementation; tests substitute
/// scripted mocks.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Ask the backend to schedule a sync job.
    ///
    /// Fails with [`adsync_core::Error::ConnectionRequired`] when the
    /// upstream account must be re-linked first.
    async fn start_sync(&self, kind: SyncJobKind) -> Result<StartSyncResponse>;

    /// Fetch log entries with id strictly greater than `since_id`, plus the
    /// run's current state.
    async fn fetch_run_logs(&self, run_id: &str, since_id: i64) -> Result<SyncLogsPage>;

    /// Fetch the upstream account connection snapshot.
    async fn connection_status(&self) -> Result<ConnectionStatus>;
}
