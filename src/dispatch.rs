//! Command dispatch, independent of process argv.
//!
//! | Command              | Effect                                          |
//! |----------------------|-------------------------------------------------|
//! | `status`             | print the progress report (read-only)           |
//! | `resume`             | apply configured skips, print the next step     |
//! | `reset`              | delete the state file                           |
//! | `start <n>`          | record a new attempt of phase `n`               |
//! | `complete <n>`       | record phase `n` as completed                   |
//! | `fail <n> <message>` | record a failure of phase `n`                   |
//!
//! Phase numbers are validated before any state is loaded, so a usage error
//! never touches the state file.

use anyhow::Result;
use std::io::Write;

use crate::config::ScaffoldConfig;
use crate::errors::ScaffoldError;
use crate::phase::{get_phase, validate_phase_number};
use crate::resume::ResumeInstructions;
use crate::state::StateStore;
use crate::tracker::PhaseTracker;
use crate::ui::format_duration;
use crate::ui::icons::{CHECK, CROSS, NEXT, RUNNING, SPARKLE};
use crate::ui::render_status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Resume,
    Reset,
    Start { phase: u32 },
    Complete { phase: u32 },
    Fail { phase: u32, message: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Resume => "resume",
            Command::Reset => "reset",
            Command::Start { .. } => "start",
            Command::Complete { .. } => "complete",
            Command::Fail { .. } => "fail",
        }
    }

    /// Phase argument, for commands that take one.
    pub fn phase(&self) -> Option<u32> {
        match self {
            Command::Start { phase }
            | Command::Complete { phase }
            | Command::Fail { phase, .. } => Some(*phase),
            Command::Status | Command::Resume | Command::Reset => None,
        }
    }
}

/// Run `command` against `store`, writing human-readable output to `out`.
pub fn execute<S, W>(
    mut store: S,
    config: ScaffoldConfig,
    command: &Command,
    out: &mut W,
) -> Result<()>
where
    S: StateStore,
    W: Write,
{
    tracing::debug!(command = command.name(), "dispatching");

    if let Some(phase) = command.phase() {
        validate_phase_number(phase).map_err(ScaffoldError::from)?;
    }

    match command {
        Command::Reset => {
            let existed = store.exists();
            store.reset().map_err(ScaffoldError::from)?;
            if existed {
                writeln!(
                    out,
                    "Reset complete: removed {}",
                    config.state_file().display()
                )?;
            } else {
                writeln!(out, "Reset complete: no saved progress to remove")?;
            }
        }
        Command::Status => {
            let persisted = store.exists();
            let tracker = PhaseTracker::open(store, config)?;
            render_status(out, tracker.state(), persisted)?;
        }
        Command::Resume => {
            let mut tracker = PhaseTracker::open(store, config)?;
            let instructions = tracker.resume_instructions()?;
            print_resume(out, &instructions)?;
        }
        Command::Start { phase } => {
            let mut tracker = PhaseTracker::open(store, config)?;
            let record = tracker.start_phase(*phase)?;
            writeln!(
                out,
                "{}Started phase {} ({}), attempt {}",
                RUNNING, phase, record.name, record.attempts
            )?;
        }
        Command::Complete { phase } => {
            let mut tracker = PhaseTracker::open(store, config)?;
            let record = tracker.complete_phase(*phase)?;
            let duration = tracker
                .state()
                .metrics
                .phase_durations
                .get(phase)
                .filter(|_| record.started_at.is_some())
                .map(|ms| format!(" in {}", format_duration(*ms)))
                .unwrap_or_default();
            writeln!(
                out,
                "{}Completed phase {} ({}){}",
                CHECK, phase, record.name, duration
            )?;
        }
        Command::Fail { phase, message } => {
            let mut tracker = PhaseTracker::open(store, config)?;
            let record = tracker.fail_phase(*phase, message)?;
            writeln!(
                out,
                "{}Recorded failure of phase {} ({}) on attempt {}: {}",
                CROSS, phase, record.name, record.attempts, message
            )?;
        }
    }

    Ok(())
}

fn print_resume<W: Write>(out: &mut W, instructions: &ResumeInstructions) -> Result<()> {
    match instructions {
        ResumeInstructions::Phase(p) => {
            let label = get_phase(p.phase).map(|d| d.summary).unwrap_or_default();
            writeln!(out, "{}{}", NEXT, p.message)?;
            if !label.is_empty() && p.is_retry() {
                writeln!(out, "   Phase goal: {}", label)?;
            }
            writeln!(out)?;
            writeln!(out, "{}", instructions.command())?;
            writeln!(
                out,
                "Record attempt {} with `start {}`, then `complete {}` or `fail {} <message>`.",
                p.attempt, p.phase, p.phase, p.phase
            )?;
        }
        ResumeInstructions::Complete { message, .. } => {
            writeln!(out, "{}{}", SPARKLE, message)?;
            writeln!(out)?;
            writeln!(out, "{}", instructions.command())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaffoldToml;
    use crate::errors::UsageError;
    use crate::state::{FileStateStore, MemoryStateStore, PhaseStatus};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config_for(dir: &std::path::Path) -> ScaffoldConfig {
        ScaffoldConfig::from_toml(dir.to_path_buf(), ScaffoldToml::default())
    }

    fn run(dir: &std::path::Path, command: Command) -> Result<String> {
        let config = config_for(dir);
        let store = FileStateStore::for_config(&config);
        let mut out = Vec::new();
        execute(store, config, &command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_command_names_and_phase() {
        assert_eq!(Command::Status.name(), "status");
        assert_eq!(Command::Fail { phase: 3, message: "x".into() }.name(), "fail");
        assert_eq!(Command::Complete { phase: 4 }.phase(), Some(4));
        assert_eq!(Command::Reset.phase(), None);
    }

    #[test]
    fn test_start_prints_confirmation_and_persists() {
        let dir = tempdir().unwrap();
        let text = run(dir.path(), Command::Start { phase: 1 }).unwrap();
        assert!(text.contains("Started phase 1 (project-setup), attempt 1"));

        let store = FileStateStore::for_config(&config_for(dir.path()));
        let state = store.load().unwrap();
        assert_eq!(state.phase(1).unwrap().status, PhaseStatus::InProgress);
    }

    #[test]
    fn test_invalid_phase_is_a_usage_error_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let err = run(dir.path(), Command::Complete { phase: 42 }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScaffoldError>(),
            Some(ScaffoldError::Usage(UsageError::InvalidPhase { phase: 42, .. }))
        ));
        assert!(!config_for(dir.path()).state_file().exists());
    }

    #[test]
    fn test_fail_then_resume_reports_retry() {
        let dir = tempdir().unwrap();
        run(dir.path(), Command::Start { phase: 1 }).unwrap();
        run(dir.path(), Command::Complete { phase: 1 }).unwrap();
        run(dir.path(), Command::Start { phase: 2 }).unwrap();
        let text = run(
            dir.path(),
            Command::Fail {
                phase: 2,
                message: "boom".into(),
            },
        )
        .unwrap();
        assert!(text.contains("Recorded failure of phase 2 (configuration) on attempt 1: boom"));

        let text = run(dir.path(), Command::Resume).unwrap();
        assert!(text.contains("Retry phase 2 (configuration), attempt 2"));
        assert!(text.contains("Previous error: boom"));
        assert!(text.contains("Execute the instructions in `phases/02-CONFIGURATION.md`"));
    }

    #[test]
    fn test_status_on_missing_state_succeeds_without_writing() {
        let dir = tempdir().unwrap();
        let text = run(dir.path(), Command::Status).unwrap();
        assert!(text.contains("Scaffold Status"));
        assert!(text.contains("0/10 phases completed"));
        assert!(!config_for(dir.path()).state_file().exists());
    }

    #[test]
    fn test_status_on_corrupt_state_fails() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        std::fs::create_dir_all(&config.scaffold_dir).unwrap();
        std::fs::write(config.state_file(), "not json").unwrap();

        let err = run(dir.path(), Command::Status).unwrap_err();
        assert!(err.to_string().contains("not valid scaffold state"));
    }

    #[test]
    fn test_reset_removes_state_even_when_corrupt() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        std::fs::create_dir_all(&config.scaffold_dir).unwrap();
        std::fs::write(config.state_file(), "not json").unwrap();

        let text = run(dir.path(), Command::Reset).unwrap();
        assert!(text.contains("Reset complete"));
        assert!(!config.state_file().exists());

        let text = run(dir.path(), Command::Reset).unwrap();
        assert!(text.contains("no saved progress"));
    }

    #[test]
    fn test_resume_with_memory_store() {
        let config = ScaffoldConfig::from_toml(PathBuf::from("/project"), ScaffoldToml::default());
        let mut out = Vec::new();
        execute(
            MemoryStateStore::default(),
            config,
            &Command::Resume,
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Start phase 1 (project-setup)"));
        assert!(text.contains("01-PROJECT-SETUP.md"));
    }
}
