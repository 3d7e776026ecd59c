//! Phase transitions and aggregate bookkeeping.
//!
//! Every operation records what the agent reported, even when it departs from
//! the conventional lifecycle (completing a phase that was never started,
//! restarting a completed one). Irregular transitions are logged, not refused.
//! The root status, completion timestamp and duration metrics are re-derived
//! from the phase table after every change.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{ErrorEntry, PhaseRecord, PhaseStatus, RunStatus, ScaffoldState};
use crate::errors::UsageError;
use crate::phase::validate_phase_number;

/// Reason stored on phases skipped through the skip list.
pub const CONFIG_SKIP_REASON: &str = "Skipped via configuration";

impl ScaffoldState {
    /// Mark phase `n` as started. Each call counts as one attempt.
    ///
    /// The root moves to `in_progress` unless another phase is still failed;
    /// a failed phase keeps the root `failed` until it is retried.
    pub fn start_phase(
        &mut self,
        n: u32,
        now: DateTime<Utc>,
    ) -> Result<&PhaseRecord, UsageError> {
        let record = self.record_mut(n)?;
        note_transition(n, record.status, PhaseStatus::InProgress);

        record.status = PhaseStatus::InProgress;
        record.started_at = Some(now);
        record.attempts += 1;
        let attempts = record.attempts;

        self.current_phase = Some(n);
        self.refresh_aggregate(now);
        info!(phase = n, attempt = attempts, "phase started");

        self.record(n)
    }

    /// Mark phase `n` as completed, clearing its last error.
    pub fn complete_phase(
        &mut self,
        n: u32,
        now: DateTime<Utc>,
    ) -> Result<&PhaseRecord, UsageError> {
        let record = self.record_mut(n)?;
        note_transition(n, record.status, PhaseStatus::Completed);

        record.status = PhaseStatus::Completed;
        record.completed_at = Some(now);
        record.error = None;
        let started_at = record.started_at;

        match started_at {
            Some(started) => {
                let duration = (now - started).num_milliseconds();
                self.metrics.phase_durations.insert(n, duration);
                info!(phase = n, duration_ms = duration, "phase completed");
            }
            None => info!(phase = n, "phase completed without a recorded start"),
        }

        self.refresh_aggregate(now);
        self.record(n)
    }

    /// Mark phase `n` as failed and append the failure to the error log.
    pub fn fail_phase(
        &mut self,
        n: u32,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<&PhaseRecord, UsageError> {
        let record = self.record_mut(n)?;
        note_transition(n, record.status, PhaseStatus::Failed);

        record.status = PhaseStatus::Failed;
        record.error = Some(message.to_string());
        let attempt = record.attempts;

        self.metrics.retry_count += 1;
        self.errors.push(ErrorEntry {
            phase: n,
            error: message.to_string(),
            timestamp: now,
            attempt,
        });
        self.refresh_aggregate(now);
        warn!(phase = n, attempt, error = message, "phase failed");

        self.record(n)
    }

    /// Mark phase `n` as skipped, keeping `reason` in its error field.
    pub fn skip_phase(
        &mut self,
        n: u32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<&PhaseRecord, UsageError> {
        let record = self.record_mut(n)?;
        note_transition(n, record.status, PhaseStatus::Skipped);

        record.status = PhaseStatus::Skipped;
        record.error = Some(reason.to_string());

        self.refresh_aggregate(now);
        info!(phase = n, reason, "phase skipped");

        self.record(n)
    }

    /// Re-derive root status, completion time and total duration.
    pub fn refresh_aggregate(&mut self, now: DateTime<Utc>) {
        let all_done = self
            .phases
            .values()
            .all(|r| r.status.is_terminal());

        if all_done {
            let completed_at = *self.completed_at.get_or_insert(now);
            self.status = RunStatus::Completed;
            self.metrics.total_duration =
                Some((completed_at - self.started_at).num_milliseconds());
            return;
        }

        self.completed_at = None;
        self.metrics.total_duration = None;

        let any = |status: PhaseStatus| self.phases.values().any(|r| r.status == status);
        self.status = if any(PhaseStatus::Failed) {
            RunStatus::Failed
        } else if any(PhaseStatus::InProgress)
            || any(PhaseStatus::Completed)
            || any(PhaseStatus::Skipped)
        {
            RunStatus::InProgress
        } else {
            RunStatus::NotStarted
        };
        debug!(status = %self.status, "aggregate status refreshed");
    }

    fn record_mut(&mut self, n: u32) -> Result<&mut PhaseRecord, UsageError> {
        let phase = validate_phase_number(n)?;
        Ok(self
            .phases
            .entry(n)
            .or_insert_with(|| PhaseRecord::new(phase.name)))
    }

    fn record(&self, n: u32) -> Result<&PhaseRecord, UsageError> {
        validate_phase_number(n)?;
        self.phases.get(&n).ok_or(UsageError::InvalidPhase {
            phase: n,
            max: crate::phase::phase_count(),
        })
    }
}

fn note_transition(n: u32, from: PhaseStatus, to: PhaseStatus) {
    if !from.can_transition_to(to) {
        warn!(phase = n, %from, %to, "recording irregular phase transition");
    }
}
