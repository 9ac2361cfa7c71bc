//! # Grimshade Core
//!
//! Client-side processing orchestration for the grimshade transform
//! service: turns unconstrained, rapid user input (slider drags, preset
//! clicks, tint/aspect toggles) into a disciplined, rate-limited,
//! race-free sequence of requests, and tracks readiness so destructive
//! actions never operate on stale or in-flight state.
//!
//! This crate contains:
//! - ParameterSet / ParameterStore and the preset catalog
//! - The coalescing debounce timer for slider edits
//! - The processing state machine and per-target readiness flags
//! - The engine: upload, gated jobs, catalog sweeps, cascades, two-phase
//!   download
//! - The `TransformService` contract the engine drives
//!
//! This crate does NOT care about:
//! - Pixel transform math (the service's job)
//! - How previews are displayed (bindings subscribe to the event stream)
//! - The wire protocol (see `grimshade-http`)

pub mod batch;
pub mod catalog;
pub mod debounce;
pub mod download;
pub mod engine;
pub mod error;
pub mod events;
pub mod params;
pub mod service;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::BatchReport;
    pub use crate::catalog::{catalog, find, PresetEntry, CUSTOM_TARGET, CUSTOM_TARGET_ID};
    pub use crate::debounce::Debouncer;
    pub use crate::download::Download;
    pub use crate::engine::{Engine, EngineConfig};
    pub use crate::error::{EngineError, ErrorKind};
    pub use crate::events::{EngineEvent, NoticeLevel};
    pub use crate::params::{Method, ParameterPatch, ParameterSet, ParameterStore, TintId};
    pub use crate::service::{
        FullResolutionArtifact, FullResolutionRequest, PreviewArtifact, ProcessRequest, Session,
        SourceId, TintEntry, TransformService, UploadOutcome, UploadRequest,
    };
    pub use crate::state::{EngineState, ReadyFlags, StateMachine};
}

// Re-export key types at crate root
pub use batch::BatchReport;
pub use catalog::{PresetEntry, CUSTOM_TARGET, CUSTOM_TARGET_ID};
pub use debounce::Debouncer;
pub use download::Download;
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, ErrorKind};
pub use events::{EngineEvent, NoticeLevel};
pub use params::{Method, ParameterPatch, ParameterSet, ParameterStore, TintId};
pub use service::{
    FullResolutionArtifact, FullResolutionRequest, PreviewArtifact, ProcessRequest, Session,
    SourceId, TintEntry, TransformService, UploadOutcome, UploadRequest,
};
pub use state::EngineState;
