//! Client-side tracking of one in-flight sync run.
//!
//! `SyncTracker` owns the full lifecycle: it starts a backend job, follows
//! it with a self-scheduling poll loop (the next tick is armed only after
//! the previous response was handled, so at most one request is ever in
//! flight), rederives stages and progress from the accumulated log set on
//! every tick, reconciles the server-reported terminal state, and exposes a
//! consistent snapshot to the UI layer. Transient poll failures are retried
//! forever at the fixed interval; the only fatal-looking outcome is the run
//! itself finishing as failed, which is a normal result, not a tracker
//! error.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use adsync_core::sync::{
    classify, run_progress, stage_progress, CompletionStore, LogEntry, LogStatusTag,
    StageProgress, SyncJobKind, SyncRun, SyncRunStatus,
};
use adsync_core::{Error, Result};

use crate::connection::{ConnectionGate, ConnectionStatus};
use crate::models::SyncLogsPage;
use crate::reporter::SyncTrackReporter;
use crate::traits::SyncBackend;

/// Configuration for run tracking.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Fixed delay between poll ticks.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Lifecycle phase of the tracker itself (not of the backend run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerPhase {
    /// No run is being tracked.
    Idle,
    /// The start call is in flight.
    Starting,
    /// The poll loop is live.
    Polling,
    /// Tracking is suspended; the backend job keeps running.
    Paused,
    /// The tracked run reached a terminal status.
    Finished,
}

/// A log entry together with its display classification.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedLogLine {
    pub entry: LogEntry,
    pub tag: LogStatusTag,
}

/// Consistent view of the tracker state, for the UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct TrackSnapshot {
    pub phase: TrackerPhase,
    pub run: Option<SyncRun>,
    pub logs: Vec<TrackedLogLine>,
    pub progress: u8,
    pub stages: Vec<StageProgress>,
    pub feedback: Option<String>,
    pub error: Option<String>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub connection: Option<ConnectionStatus>,
}

struct TrackState {
    phase: TrackerPhase,
    run: Option<SyncRun>,
    logs: Vec<LogEntry>,
    seen_ids: HashSet<i64>,
    cursor: i64,
    stages: Vec<StageProgress>,
    progress: u8,
    feedback: Option<String>,
    error: Option<String>,
    last_completed_at: Option<DateTime<Utc>>,
    /// Bumped on every start/teardown; poll loops from older generations
    /// discard their in-flight responses and exit.
    generation: u64,
    poll_task: Option<JoinHandle<()>>,
}

enum TickOutcome {
    Continue,
    Finished,
    Stale,
}

struct Inner<R: SyncTrackReporter> {
    backend: Arc<dyn SyncBackend>,
    gate: Arc<ConnectionGate>,
    store: Arc<dyn CompletionStore>,
    reporter: Arc<R>,
    config: TrackerConfig,
    state: Mutex<TrackState>,
    paused_tx: watch::Sender<bool>,
    cancel_tx: watch::Sender<u64>,
}

/// Tracks a single in-flight sync run. Cheap to clone; clones share state.
pub struct SyncTracker<R: SyncTrackReporter> {
    inner: Arc<Inner<R>>,
}

impl<R: SyncTrackReporter> Clone for SyncTracker<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn started_message(kind: SyncJobKind) -> &'static str {
    match kind {
        SyncJobKind::Full => "Synchronization started.",
        SyncJobKind::Meta => "Meta synchronization started.",
        SyncJobKind::Instagram => "Instagram synchronization started.",
        SyncJobKind::InsightsLast7Days => "Insights synchronization (7 days) started.",
        SyncJobKind::InsightsLastDay => "Insights synchronization (1 day) started.",
    }
}

const FINISHED_OK_FEEDBACK: &str = "Synchronization finished successfully.";
const FINISHED_FAILED_MESSAGE: &str = "Synchronization finished with an error.";
const ALREADY_RUNNING_MESSAGE: &str = "A sync run is already in progress.";
const RECONNECT_BEFORE_START_MESSAGE: &str = "Connect the ad account before starting a sync.";

impl<R: SyncTrackReporter + 'static> SyncTracker<R> {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        gate: Arc<ConnectionGate>,
        store: Arc<dyn CompletionStore>,
        reporter: Arc<R>,
        config: TrackerConfig,
    ) -> Self {
        // Read-on-mount so "last synced at" shows before any run happens.
        let last_completed_at = match store.last_completed_at() {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to read last completion timestamp: {err}");
                None
            }
        };
        let (paused_tx, _) = watch::channel(false);
        let (cancel_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                backend,
                gate,
                store,
                reporter,
                config,
                state: Mutex::new(TrackState {
                    phase: TrackerPhase::Idle,
                    run: None,
                    logs: Vec::new(),
                    seen_ids: HashSet::new(),
                    cursor: 0,
                    stages: Vec::new(),
                    progress: 0,
                    feedback: None,
                    error: None,
                    last_completed_at,
                    generation: 0,
                    poll_task: None,
                }),
                paused_tx,
                cancel_tx,
            }),
        }
    }

    /// Start a new backend run and begin tracking it.
    ///
    /// Rejected while a run is already being tracked, and rejected fast
    /// when the last connection snapshot says syncing is not allowed. A
    /// start failure that signals reconnect-required triggers a gate
    /// refresh before returning.
    pub async fn start(&self, kind: SyncJobKind) -> Result<SyncRun> {
        {
            let mut state = self.inner.lock_state();
            if matches!(
                state.phase,
                TrackerPhase::Starting | TrackerPhase::Polling | TrackerPhase::Paused
            ) {
                state.error = Some(ALREADY_RUNNING_MESSAGE.to_string());
                return Err(Error::SyncInProgress);
            }
            if !self.inner.gate.allows_start() {
                state.error = Some(RECONNECT_BEFORE_START_MESSAGE.to_string());
                return Err(Error::ConnectionRequired(
                    RECONNECT_BEFORE_START_MESSAGE.to_string(),
                ));
            }
            state.phase = TrackerPhase::Starting;
            state.error = None;
            state.feedback = None;
        }

        match self.inner.backend.start_sync(kind).await {
            Ok(response) => {
                let scope = response.scope.unwrap_or_else(|| kind.scope());
                let run = SyncRun::new(response.run_id, scope, response.status);
                let generation = {
                    let mut state = self.inner.lock_state();
                    state.generation += 1;
                    state.run = Some(run.clone());
                    state.logs.clear();
                    state.seen_ids.clear();
                    state.cursor = 0;
                    state.stages = stage_progress(scope, &[], run.status);
                    state.progress = run_progress(&run, &[]);
                    state.feedback = Some(started_message(kind).to_string());
                    state.phase = TrackerPhase::Polling;
                    state.generation
                };
                self.inner.cancel_tx.send_replace(generation);
                self.inner.paused_tx.send_replace(false);
                info!("tracking sync run {} (scope {:?})", run.id, scope);
                self.inner.reporter.track_started(&run);

                let task = tokio::spawn(Inner::poll_loop(Arc::clone(&self.inner), generation));
                self.inner.lock_state().poll_task = Some(task);
                Ok(run)
            }
            Err(err) => {
                {
                    let mut state = self.inner.lock_state();
                    state.phase = TrackerPhase::Idle;
                    state.error = Some(err.to_string());
                }
                if err.requires_reconnect() {
                    self.inner.gate.refresh().await;
                }
                Err(err)
            }
        }
    }

    /// Suspend the poll loop. The backend job continues independently; no
    /// network calls are made until [`resume`](Self::resume).
    pub fn pause(&self) {
        let mut state = self.inner.lock_state();
        if state.phase == TrackerPhase::Polling {
            state.phase = TrackerPhase::Paused;
            drop(state);
            self.inner.paused_tx.send_replace(true);
            debug!("sync tracking paused");
        }
    }

    /// Resume a paused poll loop from the last known cursor.
    pub fn resume(&self) {
        let mut state = self.inner.lock_state();
        if state.phase == TrackerPhase::Paused {
            state.phase = TrackerPhase::Polling;
            drop(state);
            self.inner.paused_tx.send_replace(false);
            debug!("sync tracking resumed");
        }
    }

    /// Tear tracking down: cancel any pending tick and discard in-flight
    /// responses. Idempotent; the backend job is unaffected.
    pub fn shutdown(&self) {
        let generation = {
            let mut state = self.inner.lock_state();
            state.generation += 1;
            state.phase = TrackerPhase::Idle;
            state.poll_task = None;
            state.generation
        };
        self.inner.cancel_tx.send_replace(generation);
    }

    /// Await the end of the current poll loop, if one is running.
    pub async fn wait_for_finish(&self) {
        let task = self.inner.lock_state().poll_task.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                debug!("poll task ended abnormally: {err}");
            }
        }
    }

    /// A consistent view of the current tracking state.
    pub fn snapshot(&self) -> TrackSnapshot {
        let state = self.inner.lock_state();
        build_snapshot(&state, self.inner.gate.current())
    }
}

impl<R: SyncTrackReporter + 'static> Inner<R> {
    fn lock_state(&self) -> MutexGuard<'_, TrackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn poll_loop(inner: Arc<Self>, generation: u64) {
        let mut cancel_rx = inner.cancel_tx.subscribe();
        let mut paused_rx = inner.paused_tx.subscribe();

        loop {
            if *cancel_rx.borrow() != generation {
                return;
            }

            // Hold here while paused; nothing is fetched until resumed.
            while *paused_rx.borrow() {
                tokio::select! {
                    changed = paused_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = cancel_rx.changed() => {}
                }
                if *cancel_rx.borrow() != generation {
                    return;
                }
            }

            let (run_id, since) = {
                let state = inner.lock_state();
                match &state.run {
                    Some(run) if state.generation == generation => (run.id.clone(), state.cursor),
                    _ => return,
                }
            };

            match inner.backend.fetch_run_logs(&run_id, since).await {
                Ok(page) => {
                    // A response that lands after teardown/replacement must
                    // not mutate state.
                    if *cancel_rx.borrow() != generation {
                        return;
                    }
                    match inner.apply_logs_page(generation, &run_id, page) {
                        TickOutcome::Stale => return,
                        TickOutcome::Finished => {
                            inner.finish_run().await;
                            return;
                        }
                        TickOutcome::Continue => {}
                    }
                }
                Err(err) => {
                    // Transient by definition: keep all state and retry at
                    // the same fixed interval.
                    warn!("log poll for run {run_id} failed (will retry): {err}");
                }
            }

            // The next tick is armed only after this response was handled,
            // so ticks can never overlap.
            tokio::select! {
                _ = tokio::time::sleep(inner.config.poll_interval) => {}
                _ = cancel_rx.changed() => {}
            }
        }
    }

    /// Fold one log page into state and rederive stages and progress.
    fn apply_logs_page(&self, generation: u64, run_id: &str, page: SyncLogsPage) -> TickOutcome {
        let snapshot;
        let outcome;
        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return TickOutcome::Stale;
            }
            let mut run = match state.run.take() {
                Some(run) if run.id == run_id => run,
                other => {
                    state.run = other;
                    return TickOutcome::Stale;
                }
            };

            // Ordered, deduplicated union of everything seen so far.
            for entry in page.logs {
                if state.seen_ids.insert(entry.id) {
                    state.logs.push(entry);
                }
            }
            state.logs.sort_by_key(|entry| entry.id);

            if let Some(next) = page.next_since_id {
                state.cursor = next;
            }

            run.apply_status(page.run.status);
            if run.is_finished() && run.finished_at.is_none() {
                run.finished_at = page.run.finished_at.or_else(|| Some(Utc::now()));
            }

            state.stages = stage_progress(run.scope, &state.logs, run.status);
            state.progress = run_progress(&run, &state.logs);
            outcome = if run.is_finished() {
                TickOutcome::Finished
            } else {
                TickOutcome::Continue
            };
            state.run = Some(run);
            snapshot = build_snapshot(&state, self.gate.current());
        }

        self.reporter.track_progress(&snapshot);
        outcome
    }

    /// Terminal handling: feedback, completion persistence, gate refresh.
    async fn finish_run(&self) {
        let (run, finished_at) = {
            let mut state = self.lock_state();
            state.phase = TrackerPhase::Finished;
            let run = match state.run.clone() {
                Some(run) => run,
                None => return,
            };
            let finished_at = run.finished_at.unwrap_or_else(Utc::now);
            if run.status == SyncRunStatus::Success {
                state.feedback = Some(FINISHED_OK_FEEDBACK.to_string());
                state.last_completed_at = Some(finished_at);
            } else {
                state.feedback = None;
                state.error = Some(FINISHED_FAILED_MESSAGE.to_string());
            }
            (run, finished_at)
        };

        info!("sync run {} finished with status {}", run.id, run.status);

        if run.status == SyncRunStatus::Success {
            if let Err(err) = self.store.record_completion(finished_at).await {
                error!("failed to persist completion timestamp: {err}");
            }
        }

        // A sync may have changed token state server-side.
        self.gate.refresh().await;
        self.reporter.track_finished(&run);
    }
}

fn build_snapshot(state: &TrackState, connection: Option<ConnectionStatus>) -> TrackSnapshot {
    TrackSnapshot {
        phase: state.phase,
        run: state.run.clone(),
        logs: state
            .logs
            .iter()
            .map(|entry| TrackedLogLine {
                tag: classify(entry),
                entry: entry.clone(),
            })
            .collect(),
        progress: state.progress,
        stages: state.stages.clone(),
        feedback: state.feedback.clone(),
        error: state.error.clone(),
        last_completed_at: state.last_completed_at,
        connection,
    }
}
