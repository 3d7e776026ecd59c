//! Resume planning: which phase to (re)attempt next and how to tell the agent.
//!
//! Failed phases are always eligible again, so an unattended driver can loop
//! on `resume` → `start` → `complete`/`fail` without operator input. Phases in
//! the skip list are only marked skipped when the planner first walks past
//! them while they are still pending.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

use crate::config::ScaffoldConfig;
use crate::phase::{get_all_phases, get_phase};
use crate::state::machine::CONFIG_SKIP_REASON;
use crate::state::{PhaseStatus, RunStatus, ScaffoldState};

/// Outcome of walking the phase table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPhase {
    /// First pending or failed phase, if any
    pub phase: Option<u32>,
    /// Phases moved to `skipped` during this walk
    pub newly_skipped: Vec<u32>,
}

impl NextPhase {
    /// Whether the walk changed the state and it needs saving.
    pub fn changed(&self) -> bool {
        !self.newly_skipped.is_empty()
    }
}

/// Find the next actionable phase, applying the skip list on the way.
pub fn next_phase(state: &mut ScaffoldState, skip_phases: &[u32], now: DateTime<Utc>) -> NextPhase {
    let mut newly_skipped = Vec::new();

    for phase in get_all_phases() {
        let status = state
            .phase(phase.number)
            .map(|r| r.status)
            .unwrap_or(PhaseStatus::Pending);

        if status == PhaseStatus::Pending
            && skip_phases.contains(&phase.number)
            && state
                .skip_phase(phase.number, CONFIG_SKIP_REASON, now)
                .is_ok()
        {
            newly_skipped.push(phase.number);
            continue;
        }

        if status.is_actionable() {
            return NextPhase {
                phase: Some(phase.number),
                newly_skipped,
            };
        }
    }

    NextPhase {
        phase: None,
        newly_skipped,
    }
}

/// Instructions for the next step of an agent driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeInstructions {
    /// Work remains on a phase.
    Phase(PhaseInstructions),
    /// Nothing is pending; validate the result with the smoke test.
    Complete { message: String, command: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInstructions {
    pub phase: u32,
    pub name: String,
    /// Conventional document name, e.g. `02-CONFIGURATION.md`
    pub instruction_file: String,
    /// Document path relative to the project directory
    pub instruction_path: PathBuf,
    /// Attempt number the agent should expect `start` to record
    pub attempt: u32,
    pub previous_error: Option<String>,
    /// An earlier phase still marked in progress, most likely interrupted
    pub interrupted: Option<u32>,
    pub message: String,
}

impl PhaseInstructions {
    pub fn is_retry(&self) -> bool {
        self.previous_error.is_some()
    }
}

impl ResumeInstructions {
    pub fn message(&self) -> &str {
        match self {
            ResumeInstructions::Phase(p) => &p.message,
            ResumeInstructions::Complete { message, .. } => message,
        }
    }

    /// The action line handed to the agent.
    pub fn command(&self) -> String {
        match self {
            ResumeInstructions::Phase(p) => format!(
                "Execute the instructions in `{}`",
                p.instruction_path.display()
            ),
            ResumeInstructions::Complete { command, .. } => {
                format!("Run the smoke test: `{}`", command)
            }
        }
    }

    pub fn phase(&self) -> Option<u32> {
        match self {
            ResumeInstructions::Phase(p) => Some(p.phase),
            ResumeInstructions::Complete { .. } => None,
        }
    }
}

impl fmt::Display for ResumeInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.message(), self.command())
    }
}

/// Build instructions for `next` (as returned by [`next_phase`]).
pub fn instructions_for(
    state: &ScaffoldState,
    next: Option<u32>,
    config: &ScaffoldConfig,
) -> ResumeInstructions {
    let Some(phase) = next.and_then(get_phase) else {
        let headline = if state.status == RunStatus::Completed {
            "All phases are complete."
        } else {
            "No pending or failed phases remain."
        };
        let mut message = format!(
            "{} Run the smoke test to verify the generated project.",
            headline
        );
        if let Some(n) = first_in_progress(state, u32::MAX) {
            message.push_str(&in_progress_note(n));
        }
        return ResumeInstructions::Complete {
            message,
            command: config.smoke_test_cmd(),
        };
    };

    let record = state.phase(phase.number);
    let attempts = record.map(|r| r.attempts).unwrap_or(0);
    let previous_error = record
        .filter(|r| r.status == PhaseStatus::Failed)
        .map(|r| r.error.clone().unwrap_or_else(|| "unknown error".to_string()));
    let attempt = attempts + 1;

    let interrupted = first_in_progress(state, phase.number);

    let mut message = match &previous_error {
        Some(error) => format!(
            "Retry phase {} ({}), attempt {}. Previous error: {}",
            phase.number, phase.name, attempt, error
        ),
        None => format!(
            "Start phase {} ({}): {}",
            phase.number, phase.name, phase.summary
        ),
    };
    if let Some(n) = interrupted {
        message.push_str(&in_progress_note(n));
    }

    let instruction_file = phase.instruction_file();
    ResumeInstructions::Phase(PhaseInstructions {
        phase: phase.number,
        name: phase.name.to_string(),
        instruction_path: config.instruction_path(&instruction_file),
        instruction_file,
        attempt,
        previous_error,
        interrupted,
        message,
    })
}

/// First phase numbered below `before` that is still marked in progress.
fn first_in_progress(state: &ScaffoldState, before: u32) -> Option<u32> {
    state
        .phases
        .iter()
        .find(|(n, r)| **n < before && r.status == PhaseStatus::InProgress)
        .map(|(n, _)| *n)
}

fn in_progress_note(n: u32) -> String {
    format!(
        "\nNote: phase {} is still marked in progress; finish it with `complete {}` or `fail {}`.",
        n, n, n
    )
}
