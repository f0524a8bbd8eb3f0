//! Sync log entries and heuristic classification.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One immutable server-emitted log line.
///
/// Entries are append-only for a given run; `id` is monotonically
/// increasing and doubles as the de-dup key and the "fetch since" cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonically increasing identifier.
    pub id: i64,
    /// Free-text label naming the pipeline unit that emitted the line.
    pub entity: String,
    /// Human-readable description.
    pub message: String,
    /// Emission time, if the backend supplied one.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// Classify this entry for display.
    pub fn status_tag(&self) -> LogStatusTag {
        classify(self)
    }
}

/// Coarse display tag for a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatusTag {
    /// The line reports a failure.
    Error,
    /// The line reports a completed step.
    Done,
    /// The line reports rows being persisted.
    Saving,
    /// Default: data is being pulled from the platform API.
    Extracting,
}

// Backend workers report error totals even when zero ("0 errors"); those
// lines must not be tagged as errors.
static ZERO_ERROR_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b0+\s*(errors?|erros?|falhas?)\b").expect("invalid zero-error regex")
});
static ERROR_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(errors?|erros?|falhas?|failed)\b").expect("invalid error-signal regex")
});

/// Map a raw log record to a coarse status tag.
///
/// Pure and total: every entry maps to exactly one tag. Matching is
/// case-insensitive over `entity + " " + message`.
pub fn classify(entry: &LogEntry) -> LogStatusTag {
    let text = format!("{} {}", entry.entity, entry.message).to_lowercase();
    if ERROR_SIGNAL.is_match(&text) && !ZERO_ERROR_COUNT.is_match(&text) {
        return LogStatusTag::Error;
    }
    if text.contains("conclu") {
        return LogStatusTag::Done;
    }
    if text.contains("salv") || text.contains("upsert") {
        return LogStatusTag::Saving;
    }
    LogStatusTag::Extracting
}
