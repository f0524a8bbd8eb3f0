//! Stage detection over accumulated sync logs.
//!
//! Each scope declares an ordered stage table; each stage carries a static
//! detector (entity names, entity prefixes, message markers). Detection is
//! monotone: once a stage is complete for a given log set it stays complete
//! for any superset, which holds across polls because logs are append-only.
//! Stage states are always rederived from the full log set, never mutated
//! incrementally.

use serde::Serialize;

use super::log_model::LogEntry;
use super::run_model::{SyncRunStatus, SyncScope};

/// Static detector for one pipeline stage.
///
/// The tables below are configuration data: updating what the backend logs
/// look like must not require touching the state machine.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    /// Stable identifier exposed to the UI.
    pub id: &'static str,
    /// The label the backend uses in its `[label] ...` log markers.
    pub label: &'static str,
    /// Exact entity names (normalized) that belong to this stage.
    pub entities: &'static [&'static str],
    /// Entity-name prefixes (normalized) that belong to this stage.
    pub entity_prefixes: &'static [&'static str],
}

impl StageSpec {
    const fn new(
        id: &'static str,
        label: &'static str,
        entities: &'static [&'static str],
        entity_prefixes: &'static [&'static str],
    ) -> Self {
        Self {
            id,
            label,
            entities,
            entity_prefixes,
        }
    }

    fn done_marker(&self) -> String {
        format!("[{}] concluido", self.label)
    }

    fn start_marker(&self) -> String {
        format!("[{}] inicio", self.label)
    }

    fn owns_entity(&self, normalized_entity: &str) -> bool {
        self.entities.contains(&normalized_entity)
            || self
                .entity_prefixes
                .iter()
                .any(|prefix| normalized_entity.starts_with(prefix))
    }
}

const STAGE_AD_ACCOUNTS: StageSpec =
    StageSpec::new("ad_accounts", "ad accounts", &["ad accounts"], &["ad account"]);
const STAGE_CAMPAIGNS: StageSpec =
    StageSpec::new("campaigns", "campaigns", &["campaigns"], &["campaign"]);
const STAGE_ADSETS: StageSpec = StageSpec::new("adsets", "adsets", &["adsets"], &["adset"]);
const STAGE_ADS: StageSpec = StageSpec::new("ads", "ads", &["ads"], &[]);
const STAGE_AD_INSIGHTS: StageSpec = StageSpec::new(
    "ad_insights",
    "ad insights (somente anuncio)",
    &["ad insights (somente anuncio)"],
    &["ad insight"],
);
const STAGE_FACEBOOK_PAGES: StageSpec = StageSpec::new(
    "facebook_pages",
    "facebook pages",
    &["facebook pages"],
    &["facebook page"],
);
const STAGE_INSTAGRAM_ACCOUNTS: StageSpec = StageSpec::new(
    "instagram_accounts",
    "instagram business + insights da conta",
    &["instagram business + insights da conta"],
    &["instagram business"],
);
const STAGE_MEDIA_INSIGHTS: StageSpec = StageSpec::new(
    "media_insights",
    "midias + insights das midias",
    &["midias + insights das midias"],
    &["midia"],
);

const STAGES_ALL: &[StageSpec] = &[
    STAGE_AD_ACCOUNTS,
    STAGE_CAMPAIGNS,
    STAGE_ADSETS,
    STAGE_ADS,
    STAGE_AD_INSIGHTS,
    STAGE_FACEBOOK_PAGES,
    STAGE_INSTAGRAM_ACCOUNTS,
    STAGE_MEDIA_INSIGHTS,
];

const STAGES_META: &[StageSpec] = &[
    STAGE_AD_ACCOUNTS,
    STAGE_CAMPAIGNS,
    STAGE_ADSETS,
    STAGE_ADS,
    STAGE_AD_INSIGHTS,
];

const STAGES_INSTAGRAM: &[StageSpec] = &[
    STAGE_FACEBOOK_PAGES,
    STAGE_INSTAGRAM_ACCOUNTS,
    STAGE_MEDIA_INSIGHTS,
];

/// The ordered stage table for a scope. Never empty.
pub fn stage_specs(scope: SyncScope) -> &'static [StageSpec] {
    match scope {
        SyncScope::All => STAGES_ALL,
        SyncScope::Meta => STAGES_META,
        SyncScope::Instagram => STAGES_INSTAGRAM,
    }
}

/// Lowercase, strip accents (Latin), trim.
///
/// Backend log messages mix accented and unaccented spellings of the same
/// Portuguese words, in both precomposed and decomposed Unicode forms;
/// markers are matched in the folded form.
pub fn normalize_sync_text(value: &str) -> String {
    let folded: String = value
        .to_lowercase()
        .chars()
        // Decomposed spellings carry the accent as a combining mark.
        .filter(|c| !matches!(c, '\u{0300}'..='\u{036f}'))
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect();
    folded.trim().to_string()
}

/// Completion flags for a scope's stages, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMatch {
    pub id: &'static str,
    pub done: bool,
}

/// Determine which stages have produced a completion signal.
///
/// A stage is complete when its `[label] concluido` marker appears in any
/// message, or when a line owned by the stage's entity reports conclusion.
/// Only positive signal flips a stage; absence of evidence never does.
pub fn match_stages(scope: SyncScope, logs: &[LogEntry]) -> Vec<StageMatch> {
    let normalized: Vec<(String, String)> = logs
        .iter()
        .map(|entry| {
            (
                normalize_sync_text(&entry.entity),
                normalize_sync_text(&entry.message),
            )
        })
        .collect();

    stage_specs(scope)
        .iter()
        .map(|spec| {
            let done_marker = spec.done_marker();
            let done = normalized.iter().any(|(entity, message)| {
                message.contains(&done_marker)
                    || (spec.owns_entity(entity) && message.contains("concluido"))
            });
            StageMatch { id: spec.id, done }
        })
        .collect()
}

/// Display state of a stage, rederived on every poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Active,
    Done,
    Failed,
}

/// A stage with its derived display state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    pub id: &'static str,
    pub label: &'static str,
    pub state: StageState,
}

/// Derive per-stage display states from the full accumulated log set.
///
/// - `Success` forces every stage to `Done`, even if no marker was seen.
/// - Completed stages are `Done` regardless of order.
/// - The first non-done stage is `Active` (`Failed` once the run failed);
///   later non-done stages with an observed `[label] inicio` marker are
///   also `Active`.
pub fn stage_progress(
    scope: SyncScope,
    logs: &[LogEntry],
    status: SyncRunStatus,
) -> Vec<StageProgress> {
    let specs = stage_specs(scope);

    if status == SyncRunStatus::Success {
        return specs
            .iter()
            .map(|spec| StageProgress {
                id: spec.id,
                label: spec.label,
                state: StageState::Done,
            })
            .collect();
    }

    let matches = match_stages(scope, logs);
    let normalized_messages: Vec<String> = logs
        .iter()
        .map(|entry| normalize_sync_text(&entry.message))
        .collect();

    let mut first_open_seen = false;
    specs
        .iter()
        .zip(matches.iter())
        .map(|(spec, matched)| {
            let state = if matched.done {
                StageState::Done
            } else if !first_open_seen {
                first_open_seen = true;
                if status == SyncRunStatus::Failed {
                    StageState::Failed
                } else {
                    StageState::Active
                }
            } else {
                let start_marker = spec.start_marker();
                let started = normalized_messages
                    .iter()
                    .any(|message| message.contains(&start_marker));
                if started && status != SyncRunStatus::Failed {
                    StageState::Active
                } else {
                    StageState::Pending
                }
            };
            StageProgress {
                id: spec.id,
                label: spec.label,
                state,
            }
        })
        .collect()
}
