//! Phase registry for the scaffold tracker.
//!
//! This module provides:
//! - `Phase` describing a single numbered scaffolding phase
//! - The fixed, ordered phase table the tracker works through
//! - Range validation for phase numbers coming from the CLI
//! - The naming convention for per-phase instruction documents

use crate::errors::UsageError;

/// A single numbered unit of scaffolding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// Phase number, 1-based and contiguous
    pub number: u32,
    /// Stable kebab-case label, also used to derive the instruction file name
    pub name: &'static str,
    /// One-line summary of what the agent produces in this phase
    pub summary: &'static str,
    /// Phases this one builds on. Informational only; execution order is
    /// always the numeric order.
    pub depends_on: &'static [u32],
}

impl Phase {
    const fn new(
        number: u32,
        name: &'static str,
        summary: &'static str,
        depends_on: &'static [u32],
    ) -> Self {
        Self {
            number,
            name,
            summary,
            depends_on,
        }
    }

    /// Instruction document for this phase, e.g. `03-DATABASE-SCHEMA.md`.
    pub fn instruction_file(&self) -> String {
        format!("{:02}-{}.md", self.number, self.name.to_uppercase())
    }
}

static PHASES: [Phase; 10] = [
    Phase::new(
        1,
        "project-setup",
        "Repository layout, build files and tooling",
        &[],
    ),
    Phase::new(
        2,
        "configuration",
        "Environment and application configuration",
        &[1],
    ),
    Phase::new(
        3,
        "database-schema",
        "Schema definitions and migrations",
        &[2],
    ),
    Phase::new(4, "core-models", "Domain models and repositories", &[3]),
    Phase::new(5, "api-layer", "HTTP handlers and routing", &[4]),
    Phase::new(
        6,
        "authentication",
        "Sign-in, sessions and access control",
        &[5],
    ),
    Phase::new(7, "frontend-shell", "Client shell, layout and navigation", &[2]),
    Phase::new(
        8,
        "feature-modules",
        "Feature screens wired to the API",
        &[5, 7],
    ),
    Phase::new(9, "testing", "Unit, integration and end-to-end tests", &[8]),
    Phase::new(10, "deployment", "Containers, CI and release scripts", &[9]),
];

/// All phases in execution order.
pub fn get_all_phases() -> &'static [Phase] {
    &PHASES
}

/// Number of phases in the registry (the `N` in `1..=N`).
pub fn phase_count() -> u32 {
    PHASES.len() as u32
}

/// Look up a phase by number.
pub fn get_phase(number: u32) -> Option<&'static Phase> {
    PHASES.iter().find(|p| p.number == number)
}

/// Check that `number` names a registered phase.
pub fn validate_phase_number(number: u32) -> Result<&'static Phase, UsageError> {
    get_phase(number).ok_or(UsageError::InvalidPhase {
        phase: number,
        max: phase_count(),
    })
}
