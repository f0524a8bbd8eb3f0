//! AdSync Core - Domain entities and sync-tracking logic.
//!
//! This crate contains the pure parts of the synchronization tracking core:
//! run and log models, heuristic log classification, stage detection,
//! progress estimation and the completion-timestamp store. It is
//! transport-agnostic; the `adsync-connect` crate supplies the HTTP side.

pub mod errors;
pub mod sync;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
