//! Core error types for the AdSync tracking core.
//!
//! This module defines transport-agnostic error types. HTTP-specific failures
//! (from reqwest, response bodies, etc.) are converted to these types by the
//! connect layer.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sync tracking core.
///
/// Network-boundary errors are caught at the controller boundary and
/// converted to state; nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection refused, timeout, 5xx body read).
    #[error("Request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status and a parseable message.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Starting a sync was refused because the upstream account must be
    /// reconnected first.
    #[error("Connection requires re-authentication: {0}")]
    ConnectionRequired(String),

    /// A sync run is already being tracked by this controller.
    #[error("A sync run is already in progress")]
    SyncInProgress,

    /// The completion-timestamp store could not be read or written.
    #[error("Completion store error: {0}")]
    Store(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True when the failure means the user has to redo the OAuth handshake.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Error::ConnectionRequired(_))
    }
}
