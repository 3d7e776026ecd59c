//! `PhaseTracker` binds a loaded state to its store and configuration.
//!
//! Every mutating call validates the phase number, applies the transition and
//! saves before returning, so the stored document is authoritative after each
//! call. Nothing is saved when validation fails.

use chrono::Utc;
use tracing::debug;

use crate::config::ScaffoldConfig;
use crate::errors::Result;
use crate::phase::validate_phase_number;
use crate::resume::{ResumeInstructions, instructions_for, next_phase};
use crate::state::{PhaseRecord, ScaffoldState, StateStore};

pub struct PhaseTracker<S: StateStore> {
    store: S,
    state: ScaffoldState,
    config: ScaffoldConfig,
}

impl<S: StateStore> PhaseTracker<S> {
    /// Load state from `store` (or bootstrap a fresh one).
    pub fn open(store: S, config: ScaffoldConfig) -> Result<Self> {
        let state = store.load()?;
        debug!(status = %state.status, phases = state.phases.len(), "state loaded");
        Ok(Self {
            store,
            state,
            config,
        })
    }

    pub fn state(&self) -> &ScaffoldState {
        &self.state
    }

    pub fn config(&self) -> &ScaffoldConfig {
        &self.config
    }

    pub fn start_phase(&mut self, n: u32) -> Result<PhaseRecord> {
        validate_phase_number(n)?;
        let record = self.state.start_phase(n, Utc::now())?.clone();
        self.save()?;
        Ok(record)
    }

    pub fn complete_phase(&mut self, n: u32) -> Result<PhaseRecord> {
        validate_phase_number(n)?;
        let record = self.state.complete_phase(n, Utc::now())?.clone();
        self.save()?;
        Ok(record)
    }

    pub fn fail_phase(&mut self, n: u32, message: &str) -> Result<PhaseRecord> {
        validate_phase_number(n)?;
        let record = self.state.fail_phase(n, message, Utc::now())?.clone();
        self.save()?;
        Ok(record)
    }

    pub fn skip_phase(&mut self, n: u32, reason: &str) -> Result<PhaseRecord> {
        validate_phase_number(n)?;
        let record = self.state.skip_phase(n, reason, Utc::now())?.clone();
        self.save()?;
        Ok(record)
    }

    /// Next pending or failed phase. Skips from configuration are applied
    /// and saved on the way.
    pub fn next_phase(&mut self) -> Result<Option<u32>> {
        let next = next_phase(&mut self.state, &self.config.skip_phases(), Utc::now());
        if next.changed() {
            debug!(skipped = ?next.newly_skipped, "applied configured skips");
            self.save()?;
        }
        Ok(next.phase)
    }

    pub fn resume_instructions(&mut self) -> Result<ResumeInstructions> {
        let next = self.next_phase()?;
        Ok(instructions_for(&self.state, next, &self.config))
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn save(&mut self) -> Result<()> {
        self.store.save(&mut self.state)?;
        Ok(())
    }
}
