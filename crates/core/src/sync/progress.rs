//! Progress estimation from stage completion and run status.
//!
//! The server owns ground-truth status; the percentage here is a display
//! estimate only. 100% is reserved for confirmed success.

use super::log_model::LogEntry;
use super::run_model::{SyncRun, SyncRunStatus};
use super::stages::{match_stages, StageMatch};

/// Floor shown once a run has produced any output, and the minimum for a
/// failed run, so the bar never reads as "nothing happened".
pub const MIN_VISIBLE_PROGRESS: u8 = 8;

/// Hard ceiling while the server has not confirmed completion.
pub const UNFINISHED_PROGRESS_CEILING: u8 = 95;

/// Combine stage completion and run status into a 0-100 percentage.
///
/// Rules, in priority order:
/// 1. `Success` returns exactly 100.
/// 2. `Failed` returns `max(8, round(completed/total * 100))`.
/// 3. Otherwise the rounded ratio, clamped to `[8, 95]` once any log has
///    arrived, and 0 before.
///
/// For a fixed non-success status the result is non-decreasing in the
/// number of completed stages, since detectors are monotone over
/// append-only logs.
pub fn estimate_progress(
    status: SyncRunStatus,
    completed: usize,
    total: usize,
    has_logs: bool,
) -> u8 {
    if status == SyncRunStatus::Success {
        return 100;
    }

    // The stage table is never empty, but guard anyway.
    let total = total.max(1);
    let ratio = (completed.min(total) as f64 / total as f64) * 100.0;
    let rounded = ratio.round() as u8;

    if status == SyncRunStatus::Failed {
        return rounded.max(MIN_VISIBLE_PROGRESS);
    }
    if completed == 0 && !has_logs {
        return 0;
    }
    rounded.clamp(MIN_VISIBLE_PROGRESS, UNFINISHED_PROGRESS_CEILING)
}

/// Estimate a run's progress from its accumulated logs.
pub fn run_progress(run: &SyncRun, logs: &[LogEntry]) -> u8 {
    let matches = match_stages(run.scope, logs);
    let completed = completed_count(&matches);
    estimate_progress(run.status, completed, matches.len(), !logs.is_empty())
}

/// Number of completed stages in a match set.
pub fn completed_count(matches: &[StageMatch]) -> usize {
    matches.iter().filter(|m| m.done).count()
}
