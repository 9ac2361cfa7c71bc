//! Error taxonomy for the orchestration core.

use thiserror::Error;

/// Broad classification of an [`EngineError`], used by UI bindings to
/// pick a notice style without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Service,
    NotReady,
    Busy,
}

/// Errors surfaced by the orchestration engine.
///
/// None of these are fatal to a session: the state machine returns to
/// `Ready` after every failed job, and callers surface the message as a
/// transient notice.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Rejected before any network call (bad file type or size).
    #[error("invalid input: {0}")]
    Validation(String),
    /// The transport itself failed or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service responded but reported its own failure flag.
    #[error("service error: {0}")]
    Service(String),
    /// An operation was attempted before its prerequisite exists.
    #[error("{0} is not ready")]
    NotReady(String),
    /// Another job is already in flight; the request was rejected, not queued.
    #[error("processing in progress, please wait")]
    Busy,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Service(_) => ErrorKind::Service,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::Busy => ErrorKind::Busy,
        }
    }
}
