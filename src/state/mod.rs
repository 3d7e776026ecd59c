//! Persisted scaffolding progress.
//!
//! `ScaffoldState` is the single JSON document kept in `.scaffold/state.json`.
//! Field names are camelCase on disk; phase maps are keyed by the phase
//! number rendered as a string.

pub mod machine;
pub mod store;

pub use store::{Bootstrap, FileStateStore, MemoryStateStore, StateStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::phase::get_all_phases;

/// Schema version written into new state files.
pub const STATE_VERSION: &str = "1.0.0";

/// Status of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    /// `Completed` and `Skipped` end a phase's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseStatus::Completed | PhaseStatus::Skipped)
    }

    /// Whether the phase still needs work (fresh or retry).
    pub fn is_actionable(self) -> bool {
        matches!(self, PhaseStatus::Pending | PhaseStatus::Failed)
    }

    /// The conventional transition table.
    ///
    /// ```text
    /// pending ──▶ in_progress ──▶ completed
    ///    │            │  ▲
    ///    ▼            ▼  │
    /// skipped       failed
    /// ```
    ///
    /// The state machine records transitions outside this table rather than
    /// rejecting them; this only decides whether such a transition is logged
    /// as irregular.
    pub fn can_transition_to(self, next: PhaseStatus) -> bool {
        use PhaseStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Skipped)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Failed, InProgress)
        )
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Pending => write!(f, "pending"),
            PhaseStatus::InProgress => write!(f, "in_progress"),
            PhaseStatus::Completed => write!(f, "completed"),
            PhaseStatus::Failed => write!(f, "failed"),
            PhaseStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Aggregate status of the whole run. Derived from the phase table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::NotStarted => write!(f, "not_started"),
            RunStatus::InProgress => write!(f, "in_progress"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Persisted status and history of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub status: PhaseStatus,
    pub name: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Last failure message, or the skip reason for skipped phases
    #[serde(default)]
    pub error: Option<String>,
    /// Number of `start` calls ever made for this phase
    #[serde(default)]
    pub attempts: u32,
}

impl PhaseRecord {
    pub fn new(name: &str) -> Self {
        Self {
            status: PhaseStatus::Pending,
            name: name.to_string(),
            started_at: None,
            completed_at: None,
            error: None,
            attempts: 0,
        }
    }
}

/// One entry of the append-only failure log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub phase: u32,
    pub error: String,
    pub timestamp: DateTime<Utc>,
    /// Value of the phase's `attempts` counter when the failure was recorded
    pub attempt: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Milliseconds from the run's start to its completion
    #[serde(default)]
    pub total_duration: Option<i64>,
    /// Milliseconds from a phase's last start to its completion
    #[serde(default)]
    pub phase_durations: BTreeMap<u32, i64>,
    /// Number of recorded phase failures
    #[serde(default)]
    pub retry_count: u32,
}

/// Scaffold options in effect when the state was created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub skip_phases: Vec<u32>,
}

/// Root progress document, one per workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldState {
    pub version: String,
    #[serde(default)]
    pub project_name: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default)]
    pub current_phase: Option<u32>,
    pub phases: BTreeMap<u32, PhaseRecord>,
    #[serde(default)]
    pub config: ConfigSnapshot,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
    #[serde(default)]
    pub metrics: Metrics,
}

impl ScaffoldState {
    /// Fresh state with every registered phase pending.
    pub fn new(project_name: Option<String>, config: ConfigSnapshot, now: DateTime<Utc>) -> Self {
        let phases = get_all_phases()
            .iter()
            .map(|p| (p.number, PhaseRecord::new(p.name)))
            .collect();

        Self {
            version: STATE_VERSION.to_string(),
            project_name,
            started_at: now,
            last_updated: None,
            completed_at: None,
            status: RunStatus::NotStarted,
            current_phase: None,
            phases,
            config,
            errors: Vec::new(),
            metrics: Metrics::default(),
        }
    }

    pub fn phase(&self, number: u32) -> Option<&PhaseRecord> {
        self.phases.get(&number)
    }

    /// Number of phases in a given status.
    pub fn count(&self, status: PhaseStatus) -> usize {
        self.phases.values().filter(|r| r.status == status).count()
    }

    /// Errors recorded for one phase, oldest first.
    pub fn errors_for(&self, phase: u32) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter().filter(move |e| e.phase == phase)
    }
}
