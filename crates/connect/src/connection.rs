//! Upstream account connection status.
//!
//! The gate tracks whether the connected ad-platform account is valid
//! enough to start a sync. It keeps nothing beyond the last-fetched
//! snapshot and is re-fetched after every terminal run, since a sync may
//! change token state server-side.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::traits::SyncBackend;

/// Snapshot of the upstream account linkage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// An account is linked at all.
    #[serde(default)]
    pub connected: bool,

    /// The long-lived token is currently valid.
    #[serde(default, rename = "has_valid_long_token")]
    pub has_valid_token: bool,

    /// The user has to redo the OAuth handshake before syncing.
    #[serde(default, rename = "sync_requires_reconnect")]
    pub requires_reconnect: bool,

    /// External account identifier, when linked.
    #[serde(default, rename = "external_account_id")]
    pub external_account_id: Option<String>,

    /// Expiry of the current token.
    #[serde(default, rename = "token_expires_at")]
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    /// True iff the backend-declared flags permit starting a sync.
    pub fn can_start_sync(&self) -> bool {
        self.connected && self.has_valid_token && !self.requires_reconnect
    }

    /// The pessimistic snapshot assumed when the status fetch itself fails.
    pub fn disconnected() -> Self {
        Self {
            requires_reconnect: true,
            ..Self::default()
        }
    }
}

/// Tracks the last known connection snapshot.
pub struct ConnectionGate {
    backend: Arc<dyn SyncBackend>,
    last: Mutex<Option<ConnectionStatus>>,
}

impl ConnectionGate {
    pub fn new(backend: Arc<dyn SyncBackend>) -> Self {
        Self {
            backend,
            last: Mutex::new(None),
        }
    }

    /// Re-fetch the connection snapshot. Idempotent.
    ///
    /// A fetch failure degrades to a "disconnected" assumption rather than
    /// propagating: the gate must never block the UI.
    pub async fn refresh(&self) -> ConnectionStatus {
        let status = match self.backend.connection_status().await {
            Ok(status) => {
                debug!(
                    "connection status refreshed: connected={} valid_token={} requires_reconnect={}",
                    status.connected, status.has_valid_token, status.requires_reconnect
                );
                status
            }
            Err(err) => {
                warn!("connection status fetch failed, assuming disconnected: {err}");
                ConnectionStatus::disconnected()
            }
        };
        self.store(status.clone());
        status
    }

    /// The last fetched snapshot, if any fetch has happened.
    pub fn current(&self) -> Option<ConnectionStatus> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether a start attempt should be allowed right now.
    ///
    /// With no snapshot yet the backend stays the authority and the start
    /// is allowed through.
    pub fn allows_start(&self) -> bool {
        match self.current() {
            Some(status) => status.can_start_sync(),
            None => true,
        }
    }

    fn store(&self, status: ConnectionStatus) {
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(status);
    }
}
