//! Sync domain models and tracking logic.

mod completion_store;
mod log_model;
mod progress;
mod run_model;
mod stages;

pub use completion_store::*;
pub use log_model::*;
pub use progress::*;
pub use run_model::*;
pub use stages::*;
