//! Engine event stream consumed by UI bindings.
//!
//! The core never touches a display surface; it emits these events and a
//! binding layer subscribes (terminal printer, web view, test recorder).

use crate::service::{PreviewArtifact, Session};
use crate::state::EngineState;

/// Severity of a transient user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// State changes and progress emitted by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    StateChanged {
        from: EngineState,
        to: EngineState,
    },
    /// A new source image was bound.
    SourceLoaded {
        session: Session,
        preview: PreviewArtifact,
    },
    /// A preview finished rendering for a target surface.
    PreviewRendered {
        target: String,
        target_id: String,
        artifact: PreviewArtifact,
    },
    /// A target's readiness flag was dropped.
    TargetInvalidated {
        target: String,
    },
    /// Progress indicator update for the active operation.
    Progress {
        message: String,
        percent: u8,
    },
    /// The progress indicator must be hidden. Emitted on every exit path
    /// of an operation, success or failure.
    ProgressCleared,
    /// Transient, dismissible status message.
    Notice {
        level: NoticeLevel,
        message: String,
    },
}
