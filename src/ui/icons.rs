//! Status icons shared by the status and resume output.
//!
//! Each icon falls back to an ASCII tag when the terminal does not want emoji
//! (including when output is piped).

use console::Emoji;

use crate::state::{PhaseStatus, RunStatus};

// Phase status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]  ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]   ");
pub static PENDING: Emoji<'_, '_> = Emoji("⏸️  ", "[ ]   ");

// Summary indicators
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "");
pub static NEXT: Emoji<'_, '_> = Emoji("👉 ", "-> ");

pub fn phase_icon(status: PhaseStatus) -> &'static Emoji<'static, 'static> {
    match status {
        PhaseStatus::Completed => &CHECK,
        PhaseStatus::Failed => &CROSS,
        PhaseStatus::Skipped => &SKIP,
        PhaseStatus::InProgress => &RUNNING,
        PhaseStatus::Pending => &PENDING,
    }
}

pub fn run_icon(status: RunStatus) -> &'static Emoji<'static, 'static> {
    match status {
        RunStatus::Completed => &SPARKLE,
        RunStatus::Failed => &CROSS,
        RunStatus::InProgress => &RUNNING,
        RunStatus::NotStarted => &PENDING,
    }
}
