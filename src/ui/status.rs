//! Plain-text rendering of the `status` report.

use console::style;
use std::io::{self, Write};

use super::icons::{PROGRESS, phase_icon, run_icon};
use crate::phase::{get_all_phases, phase_count};
use crate::state::{PhaseStatus, RunStatus, ScaffoldState};

/// Format a millisecond duration as `850ms`, `12.5s`, `4m 05s` or `2h 03m`.
pub fn format_duration(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1_000 {
        return format!("{}ms", ms);
    }
    if ms < 60_000 {
        return format!("{:.1}s", ms as f64 / 1_000.0);
    }
    let secs = ms / 1_000;
    if secs < 3_600 {
        return format!("{}m {:02}s", secs / 60, secs % 60);
    }
    format!("{}h {:02}m", secs / 3_600, (secs % 3_600) / 60)
}

fn styled_run_status(status: RunStatus) -> String {
    let text = status.to_string();
    match status {
        RunStatus::Completed => style(text).green().bold().to_string(),
        RunStatus::Failed => style(text).red().bold().to_string(),
        RunStatus::InProgress => style(text).yellow().to_string(),
        RunStatus::NotStarted => style(text).dim().to_string(),
    }
}

fn styled_phase_status(status: PhaseStatus) -> String {
    let text = format!("{:<12}", status.to_string());
    match status {
        PhaseStatus::Completed => style(text).green().to_string(),
        PhaseStatus::Failed => style(text).red().to_string(),
        PhaseStatus::InProgress => style(text).yellow().to_string(),
        PhaseStatus::Skipped | PhaseStatus::Pending => style(text).dim().to_string(),
    }
}

/// Write the full status report for `state`.
///
/// `persisted` tells whether the state came from disk or is a fresh default.
pub fn render_status<W: Write>(
    out: &mut W,
    state: &ScaffoldState,
    persisted: bool,
) -> io::Result<()> {
    let completed = state.count(PhaseStatus::Completed);
    let skipped = state.count(PhaseStatus::Skipped);
    let total = phase_count();

    writeln!(out)?;
    writeln!(out, "Scaffold Status")?;
    writeln!(out, "===============")?;
    writeln!(out)?;

    if let Some(name) = &state.project_name {
        writeln!(out, "Project:       {}", name)?;
    }
    writeln!(
        out,
        "Status:        {}{}",
        run_icon(state.status),
        styled_run_status(state.status)
    )?;

    let mut progress = format!("{}/{} phases completed", completed, total);
    if skipped > 0 {
        progress.push_str(&format!(" ({} skipped)", skipped));
    }
    writeln!(out, "Progress:      {}{}", PROGRESS, progress)?;

    match state.current_phase.and_then(|n| state.phase(n).map(|r| (n, r))) {
        Some((n, record)) => writeln!(out, "Current phase: {} ({})", n, record.name)?,
        None => writeln!(out, "Current phase: none")?,
    }
    writeln!(out, "Retries:       {}", state.metrics.retry_count)?;

    if persisted {
        writeln!(
            out,
            "Started:       {}",
            state.started_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(updated) = state.last_updated {
            writeln!(out, "Last updated:  {}", updated.format("%Y-%m-%d %H:%M:%S"))?;
        }
    } else {
        writeln!(out, "Started:       not yet (no state file)")?;
    }
    if let Some(completed_at) = state.completed_at {
        let total_duration = state
            .metrics
            .total_duration
            .map(|ms| format!(" after {}", format_duration(ms)))
            .unwrap_or_default();
        writeln!(
            out,
            "Completed:     {}{}",
            completed_at.format("%Y-%m-%d %H:%M:%S"),
            total_duration
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "      {:<4} {:<18} {:<12} {:>8}  {:>9}  Depends on",
        "#", "Phase", "Status", "Attempts", "Duration"
    )?;
    writeln!(
        out,
        "      {:<4} {:<18} {:<12} {:>8}  {:>9}  ----------",
        "----", "------------------", "------------", "--------", "---------"
    )?;

    for phase in get_all_phases() {
        let Some(record) = state.phase(phase.number) else {
            continue;
        };
        let duration = state
            .metrics
            .phase_durations
            .get(&phase.number)
            .filter(|_| record.status == PhaseStatus::Completed)
            .map(|ms| format_duration(*ms))
            .unwrap_or_else(|| "-".to_string());
        let depends_on = if phase.depends_on.is_empty() {
            "-".to_string()
        } else {
            phase
                .depends_on
                .iter()
                .map(|n| format!("{:02}", n))
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(
            out,
            "{} {:<4} {:<18} {} {:>8}  {:>9}  {}",
            phase_icon(record.status),
            format!("{:02}", phase.number),
            record.name,
            styled_phase_status(record.status),
            record.attempts,
            duration,
            depends_on
        )?;

        if let Some(error) = &record.error {
            let label = if record.status == PhaseStatus::Skipped {
                "reason"
            } else if record.status == PhaseStatus::Failed {
                "error"
            } else {
                continue;
            };
            writeln!(out, "           {}: {}", label, style(error).dim())?;
        }
    }

    if !state.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failure history ({}):", state.errors.len())?;
        for entry in state.errors.iter().rev().take(5) {
            writeln!(
                out,
                "  Phase {:02} attempt {}: {} ({})",
                entry.phase,
                entry.attempt,
                entry.error,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
    }
    writeln!(out)?;
    Ok(())
}
