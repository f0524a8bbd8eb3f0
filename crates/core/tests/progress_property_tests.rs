//! Property-based tests for stage detection and progress estimation.
//!
//! These verify the universal invariants of the tracking core across random
//! log sets, using the `proptest` crate for case generation.

use proptest::prelude::*;

use adsync_core::sync::{
    classify, estimate_progress, match_stages, run_progress, stage_specs, LogEntry, SyncRun,
    SyncRunStatus, SyncScope, MIN_VISIBLE_PROGRESS, UNFINISHED_PROGRESS_CEILING,
};

// =============================================================================
// Generators
// =============================================================================

fn arb_scope() -> impl Strategy<Value = SyncScope> {
    prop_oneof![
        Just(SyncScope::All),
        Just(SyncScope::Meta),
        Just(SyncScope::Instagram),
    ]
}

fn arb_nonterminal_status() -> impl Strategy<Value = SyncRunStatus> {
    prop_oneof![Just(SyncRunStatus::Pending), Just(SyncRunStatus::Running)]
}

/// A log line that may or may not contain a stage marker for the scope.
fn arb_log_message(scope: SyncScope) -> impl Strategy<Value = String> {
    let labels: Vec<&'static str> = stage_specs(scope).iter().map(|s| s.label).collect();
    prop_oneof![
        4 => "[a-z0-9 ]{0,40}",
        2 => proptest::sample::select(labels.clone())
            .prop_map(|label| format!("[{label}] concluido")),
        1 => proptest::sample::select(labels)
            .prop_map(|label| format!("[{label}] inicio")),
    ]
}

fn arb_logs(scope: SyncScope, max: usize) -> impl Strategy<Value = Vec<LogEntry>> {
    proptest::collection::vec(("[a-z ]{0,16}", arb_log_message(scope)), 0..max).prop_map(
        |lines| {
            lines
                .into_iter()
                .enumerate()
                .map(|(i, (entity, message))| LogEntry {
                    id: i as i64 + 1,
                    entity,
                    message,
                    timestamp: None,
                })
                .collect()
        },
    )
}

/// A scope together with a log set generated against its stage table.
fn arb_scoped_logs(max: usize) -> impl Strategy<Value = (SyncScope, Vec<LogEntry>)> {
    arb_scope().prop_flat_map(move |scope| (Just(scope), arb_logs(scope, max)))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Monotonic progress: for a prefix L1 of an append-only log set L2 and
    /// a fixed non-success status, the estimate over L2 is never lower.
    #[test]
    fn progress_monotone_under_append(
        (scope, logs) in arb_scoped_logs(24),
        status in arb_nonterminal_status(),
        split in 0usize..24,
    ) {
        let mut run = SyncRun::new("run".to_string(), scope, SyncRunStatus::Pending);
        run.status = status;

        let cut = split.min(logs.len());
        let earlier = run_progress(&run, &logs[..cut]);
        let later = run_progress(&run, &logs);
        prop_assert!(later >= earlier);
    }

    /// Terminal clamp: SUCCESS always reports exactly 100.
    #[test]
    fn success_reports_100((scope, logs) in arb_scoped_logs(16)) {
        let mut run = SyncRun::new("run".to_string(), scope, SyncRunStatus::Pending);
        run.status = SyncRunStatus::Success;
        prop_assert_eq!(run_progress(&run, &logs), 100);
    }

    /// Failure floor: FAILED always reports at least the visible minimum.
    #[test]
    fn failed_reports_at_least_floor((scope, logs) in arb_scoped_logs(16)) {
        let mut run = SyncRun::new("run".to_string(), scope, SyncRunStatus::Pending);
        run.status = SyncRunStatus::Failed;
        prop_assert!(run_progress(&run, &logs) >= MIN_VISIBLE_PROGRESS);
    }

    /// Unfinished runs never reach 100.
    #[test]
    fn unfinished_never_reaches_100(
        (scope, logs) in arb_scoped_logs(16),
        status in arb_nonterminal_status(),
    ) {
        let mut run = SyncRun::new("run".to_string(), scope, SyncRunStatus::Pending);
        run.status = status;
        prop_assert!(run_progress(&run, &logs) <= UNFINISHED_PROGRESS_CEILING);
    }

    /// Stage detection is monotone under appends.
    #[test]
    fn stage_detection_monotone(
        (scope, logs) in arb_scoped_logs(24),
        split in 0usize..24,
    ) {
        let cut = split.min(logs.len());
        let before = match_stages(scope, &logs[..cut]);
        let after = match_stages(scope, &logs);
        for (b, a) in before.iter().zip(after.iter()) {
            if b.done {
                prop_assert!(a.done);
            }
        }
    }

    /// The estimator is total and in range for any input combination.
    #[test]
    fn estimate_always_in_range(
        completed in 0usize..32,
        total in 0usize..32,
        has_logs in any::<bool>(),
    ) {
        for status in [
            SyncRunStatus::Pending,
            SyncRunStatus::Running,
            SyncRunStatus::Success,
            SyncRunStatus::Failed,
        ] {
            let value = estimate_progress(status, completed, total, has_logs);
            prop_assert!(value <= 100);
        }
    }

    /// Classification is pure and total over arbitrary text.
    #[test]
    fn classify_is_pure(entity in ".{0,32}", message in ".{0,64}") {
        let line = LogEntry { id: 1, entity, message, timestamp: None };
        prop_assert_eq!(classify(&line), classify(&line));
    }
}
