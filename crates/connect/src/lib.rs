//! AdSync Connect - Backend integration for the sync dashboard.
//!
//! This crate provides the HTTP client for the sync API, the connection
//! status gate and the `SyncTracker` controller that starts a backend run
//! and follows it to completion by polling incremental logs.

pub mod client;
pub mod connection;
pub mod models;
pub mod reporter;
pub mod tracker;
pub mod traits;

// Re-export commonly used types
pub use client::SyncApiClient;
pub use connection::{ConnectionGate, ConnectionStatus};
pub use models::{RunSummary, StartSyncResponse, SyncLogsPage};
pub use reporter::{NoOpTrackReporter, SyncTrackReporter};
pub use tracker::{SyncTracker, TrackSnapshot, TrackedLogLine, TrackerConfig, TrackerPhase};
pub use traits::SyncBackend;
