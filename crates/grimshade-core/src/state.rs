//! Processing state machine and per-target readiness flags.

use std::collections::HashMap;

use crate::catalog::{self, CUSTOM_TARGET};
use crate::error::EngineError;

/// Lifecycle of the orchestration engine.
///
/// `Ready <-> Processing` is the steady-state interactive cycle. Errors
/// are not a state: a failed job returns to `Ready`, a failed upload to
/// `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No source image bound.
    Idle,
    /// An upload is in flight.
    Uploading,
    /// A session is bound and no job is in flight.
    Ready,
    /// Exactly one job is in flight.
    Processing,
}

impl EngineState {
    /// Check if a job may be started.
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }

    /// Check if a job is currently in flight.
    pub fn is_processing(&self) -> bool {
        matches!(self, EngineState::Processing)
    }
}

/// Gate for every mutating operation: at most one orchestrated job is in
/// flight at any time, and a second start request is rejected, never
/// queued.
#[derive(Debug)]
pub struct StateMachine {
    state: EngineState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Begin an upload. Allowed from `Idle` and from `Ready` (re-upload
    /// discards the previous session handle).
    pub fn upload_started(&mut self) -> Result<EngineState, EngineError> {
        match self.state {
            EngineState::Idle | EngineState::Ready => {
                self.state = EngineState::Uploading;
                Ok(self.state)
            }
            EngineState::Uploading | EngineState::Processing => Err(EngineError::Busy),
        }
    }

    pub fn upload_ok(&mut self) -> EngineState {
        self.state = EngineState::Ready;
        self.state
    }

    pub fn upload_failed(&mut self) -> EngineState {
        self.state = EngineState::Idle;
        self.state
    }

    /// Begin a job. Only allowed from `Ready`; a second start while
    /// `Processing` is rejected with [`EngineError::Busy`].
    pub fn job_started(&mut self) -> Result<EngineState, EngineError> {
        match self.state {
            EngineState::Ready => {
                self.state = EngineState::Processing;
                Ok(self.state)
            }
            EngineState::Processing => Err(EngineError::Busy),
            EngineState::Idle | EngineState::Uploading => {
                Err(EngineError::NotReady("source image".to_string()))
            }
        }
    }

    /// Finish the in-flight job. The machine returns to `Ready` whether
    /// the job succeeded or failed.
    pub fn job_finished(&mut self) -> EngineState {
        self.state = EngineState::Ready;
        self.state
    }

    /// The session was released; back to `Idle`.
    pub fn session_closed(&mut self) -> EngineState {
        self.state = EngineState::Idle;
        self.state
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-target flag: a preview has rendered successfully since the last
/// upload. Targets are the catalog preset names plus [`CUSTOM_TARGET`].
#[derive(Debug, Default)]
pub struct ReadyFlags {
    flags: HashMap<String, bool>,
}

impl ReadyFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, target: &str) {
        self.flags.insert(target.to_string(), true);
    }

    pub fn invalidate(&mut self, target: &str) {
        self.flags.insert(target.to_string(), false);
    }

    /// Drop every flag. Called on each new upload.
    pub fn clear(&mut self) {
        self.flags.clear();
    }

    pub fn is_ready(&self, target: &str) -> bool {
        self.flags.get(target).copied().unwrap_or(false)
    }

    /// Ready targets in catalog order, `custom` last.
    pub fn ready_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = catalog::catalog()
            .iter()
            .filter(|entry| self.is_ready(entry.name))
            .map(|entry| entry.name.to_string())
            .collect();
        if self.is_ready(CUSTOM_TARGET) {
            targets.push(CUSTOM_TARGET.to_string());
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification_flags() {
        assert!(EngineState::Ready.is_ready());
        assert!(!EngineState::Ready.is_processing());
        assert!(EngineState::Processing.is_processing());
        assert!(!EngineState::Idle.is_ready());
        assert!(!EngineState::Uploading.is_ready());
    }

    #[test]
    fn test_upload_cycle_transitions() {
        let mut machine = StateMachine::new();
        assert_eq!(machine.state(), EngineState::Idle);

        machine.upload_started().expect("idle allows upload");
        assert_eq!(machine.state(), EngineState::Uploading);

        machine.upload_ok();
        assert_eq!(machine.state(), EngineState::Ready);

        // Re-upload from Ready is allowed; failure falls back to Idle.
        machine.upload_started().expect("ready allows re-upload");
        machine.upload_failed();
        assert_eq!(machine.state(), EngineState::Idle);
    }

    #[test]
    fn test_job_requires_bound_session() {
        let mut machine = StateMachine::new();
        assert!(matches!(
            machine.job_started(),
            Err(EngineError::NotReady(_))
        ));

        machine.upload_started().unwrap();
        assert!(matches!(
            machine.job_started(),
            Err(EngineError::NotReady(_))
        ));
    }

    #[test]
    fn test_second_job_start_is_rejected_not_queued() {
        let mut machine = StateMachine::new();
        machine.upload_started().unwrap();
        machine.upload_ok();

        machine.job_started().expect("first job starts");
        assert!(matches!(machine.job_started(), Err(EngineError::Busy)));
        assert_eq!(machine.state(), EngineState::Processing);

        // Success and failure both return to Ready.
        machine.job_finished();
        assert_eq!(machine.state(), EngineState::Ready);
        machine.job_started().unwrap();
        machine.job_finished();
        assert_eq!(machine.state(), EngineState::Ready);
    }

    #[test]
    fn test_upload_rejected_while_processing() {
        let mut machine = StateMachine::new();
        machine.upload_started().unwrap();
        machine.upload_ok();
        machine.job_started().unwrap();
        assert!(matches!(machine.upload_started(), Err(EngineError::Busy)));
    }

    #[test]
    fn test_ready_targets_follow_catalog_order() {
        let mut flags = ReadyFlags::new();
        flags.mark("forestMystic");
        flags.mark(CUSTOM_TARGET);
        flags.mark("medieval");
        flags.mark("ghostly");
        flags.invalidate("ghostly");

        assert_eq!(
            flags.ready_targets(),
            vec![
                "medieval".to_string(),
                "forestMystic".to_string(),
                "custom".to_string()
            ]
        );
    }

    #[test]
    fn test_clear_drops_every_flag() {
        let mut flags = ReadyFlags::new();
        flags.mark("medieval");
        flags.mark(CUSTOM_TARGET);
        flags.clear();
        assert!(!flags.is_ready("medieval"));
        assert!(!flags.is_ready(CUSTOM_TARGET));
        assert!(flags.ready_targets().is_empty());
    }
}
