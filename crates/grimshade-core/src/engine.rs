//! The orchestration engine: a per-session context object that turns
//! unconstrained user input into a disciplined, race-free sequence of
//! transform requests.
//!
//! One [`Engine`] owns the parameter store and readiness flags for the
//! lifetime of one source image. All mutation happens on a single
//! cooperative task: methods take `&self` over interior `RefCell` state,
//! the engine is `!Sync`, and no borrow is held across an `.await`.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::catalog::{self, CUSTOM_TARGET, CUSTOM_TARGET_ID};
use crate::debounce::Debouncer;
use crate::error::EngineError;
use crate::events::{EngineEvent, NoticeLevel};
use crate::params::{Method, ParameterPatch, ParameterSet, ParameterStore, TintId};
use crate::service::{
    validate_upload, PreviewArtifact, ProcessRequest, Session, TintEntry, TransformService,
    UploadRequest,
};
use crate::state::{EngineState, ReadyFlags, StateMachine};

const EVENT_CAPACITY: usize = 256;

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet window for slider-driven edits.
    pub debounce: Duration,
    /// Pause between catalog entries during a full run, so a fresh
    /// upload does not burst the service with full-image requests.
    pub pacing: Duration,
    /// Requested export edge length; `None` leaves it to the service.
    pub output_size: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            pacing: Duration::from_millis(200),
            output_size: None,
        }
    }
}

impl EngineConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_output_size(mut self, output_size: Option<u32>) -> Self {
        self.output_size = output_size;
        self
    }
}

/// Client-side processing orchestration engine.
pub struct Engine {
    service: Arc<dyn TransformService>,
    config: EngineConfig,
    store: RefCell<ParameterStore>,
    readiness: RefCell<ReadyFlags>,
    machine: RefCell<StateMachine>,
    session: RefCell<Option<Session>>,
    tints: RefCell<Vec<TintEntry>>,
    events: broadcast::Sender<EngineEvent>,
    edits: Debouncer<ParameterSet>,
}

impl Engine {
    /// Build an engine plus the receiving end of the debounced edit
    /// stream. Each received snapshot is a coalesced burst of slider
    /// edits; drive [`Engine::debounced_refresh`] with it.
    pub fn new(
        service: Arc<dyn TransformService>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ParameterSet>) {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (edits_tx, edits_rx) = mpsc::unbounded_channel();
        let edits = Debouncer::new(config.debounce, edits_tx);
        let engine = Self {
            service,
            config,
            store: RefCell::new(ParameterStore::new()),
            readiness: RefCell::new(ReadyFlags::new()),
            machine: RefCell::new(StateMachine::new()),
            session: RefCell::new(None),
            tints: RefCell::new(Vec::new()),
            events,
            edits,
        };
        (engine, edits_rx)
    }

    /// Subscribe to the engine event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> EngineState {
        self.machine.borrow().state()
    }

    /// Snapshot of the current parameter set.
    pub fn params(&self) -> ParameterSet {
        self.store.borrow().get()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn is_ready(&self, target: &str) -> bool {
        self.readiness.borrow().is_ready(target)
    }

    /// Ready targets in catalog order, `custom` last.
    pub fn ready_targets(&self) -> Vec<String> {
        self.readiness.borrow().ready_targets()
    }

    /// The tint table, if [`Engine::load_tints`] has run.
    pub fn tints(&self) -> Vec<TintEntry> {
        self.tints.borrow().clone()
    }

    /// Validate and upload a new source image, binding a fresh session.
    ///
    /// Readiness flags reset and any previously bound handle is
    /// discarded; on failure the engine falls back to `Idle`.
    pub async fn upload(&self, request: UploadRequest) -> Result<Session, EngineError> {
        validate_upload(&request)?;
        self.change_state(|m| m.upload_started())?;
        self.progress("uploading image", 10);
        tracing::info!(
            filename = %request.filename,
            bytes = request.bytes.len(),
            "upload started"
        );

        let result = self.service.upload(request).await;
        match result {
            Ok(outcome) => {
                self.change_state_ok(|m| m.upload_ok());
                self.readiness.borrow_mut().clear();
                *self.session.borrow_mut() = Some(outcome.session.clone());
                tracing::info!(
                    source_id = %outcome.session.source_id,
                    width = outcome.session.width,
                    height = outcome.session.height,
                    format = %outcome.session.format,
                    "upload complete"
                );
                self.emit(EngineEvent::SourceLoaded {
                    session: outcome.session.clone(),
                    preview: outcome.preview,
                });
                self.notice(
                    NoticeLevel::Success,
                    format!(
                        "image uploaded ({}x{})",
                        outcome.session.width, outcome.session.height
                    ),
                );
                self.clear_progress();
                Ok(outcome.session)
            }
            Err(err) => {
                self.change_state_ok(|m| m.upload_failed());
                self.readiness.borrow_mut().clear();
                *self.session.borrow_mut() = None;
                tracing::warn!(error = %err, "upload failed");
                self.notice(NoticeLevel::Error, err.to_string());
                self.clear_progress();
                Err(err)
            }
        }
    }

    /// Merge a partial edit into the store and arm the debounce timer.
    ///
    /// Slider-style edits funnel through here. The mutation invalidates
    /// the custom readiness flag; the coalesced snapshot arrives on the
    /// edit receiver after the quiet window.
    pub fn edit_params(&self, patch: ParameterPatch) -> ParameterSet {
        self.store.borrow_mut().apply(patch);
        let snapshot = self.store.borrow().get();
        self.invalidate_custom();
        self.edits.arm(snapshot.clone());
        snapshot
    }

    /// Restore the documented defaults and schedule a refresh, like a
    /// burst of slider edits.
    pub fn reset(&self) -> ParameterSet {
        self.store.borrow_mut().reset();
        let snapshot = self.store.borrow().get();
        self.invalidate_custom();
        self.edits.arm(snapshot.clone());
        snapshot
    }

    /// Handler for coalesced slider edits: refresh the custom preview if
    /// a source is bound and nothing is in flight, otherwise drop the
    /// trigger (never queued).
    pub async fn debounced_refresh(&self) -> Result<Option<PreviewArtifact>, EngineError> {
        if self.session.borrow().is_none() || self.machine.borrow().state().is_processing() {
            return Ok(None);
        }
        self.process_custom().await.map(Some)
    }

    /// Run one gated job against the live parameter set.
    pub async fn process_custom(&self) -> Result<PreviewArtifact, EngineError> {
        let mut params = self.store.borrow().get();
        params.method = Method::Custom;
        self.progress("processing custom settings", 50);
        let result = self.run_job(CUSTOM_TARGET, CUSTOM_TARGET_ID, params).await;
        self.clear_progress();
        result
    }

    /// Apply a named preset: move the store to the preset's canonical
    /// values and render it immediately (no debounce). Unknown names are
    /// a silent no-op since preset triggers come from fixed UI ids.
    ///
    /// A successful render also satisfies the custom preview, which now
    /// matches the preset's values.
    pub async fn apply_preset(&self, name: &str) -> Result<Option<PreviewArtifact>, EngineError> {
        let Some(entry) = catalog::find(name) else {
            tracing::debug!(preset = name, "unknown preset ignored");
            return Ok(None);
        };
        self.require_session()?;
        if self.machine.borrow().state().is_processing() {
            self.notice(NoticeLevel::Error, EngineError::Busy.to_string());
            return Err(EngineError::Busy);
        }

        let params = self.merge_globals(entry.params.clone());
        self.store.borrow_mut().apply(
            ParameterPatch::default()
                .with_contrast(params.contrast)
                .with_brightness(params.brightness)
                .with_threshold(params.threshold)
                .with_noise(params.noise)
                .with_blur_radius(params.blur_radius)
                .with_method(params.method),
        );
        self.invalidate_custom();

        self.progress(format!("applying {} preset", entry.name), 30);
        let result = self.run_job(entry.name, entry.target_id, params).await;
        if let Ok(artifact) = &result {
            self.readiness.borrow_mut().mark(CUSTOM_TARGET);
            self.emit(EngineEvent::PreviewRendered {
                target: CUSTOM_TARGET.to_string(),
                target_id: CUSTOM_TARGET_ID.to_string(),
                artifact: artifact.clone(),
            });
        }
        self.clear_progress();
        result.map(Some)
    }

    /// Select a color tint and re-render every previously ready preview
    /// under the new setting. Immediate dispatch, no debounce.
    pub async fn set_color_tint(
        &self,
        tint: Option<TintId>,
    ) -> Result<crate::batch::BatchReport, EngineError> {
        if self.machine.borrow().state().is_processing() {
            return Err(EngineError::Busy);
        }
        let targets = self.readiness.borrow().ready_targets();
        self.store
            .borrow_mut()
            .apply(ParameterPatch::default().with_color_tint(tint));
        self.invalidate_custom();
        self.cascade(targets).await
    }

    /// Toggle aspect-ratio preservation and re-render every previously
    /// ready preview. Immediate dispatch, no debounce.
    pub async fn set_preserve_aspect(
        &self,
        preserve: bool,
    ) -> Result<crate::batch::BatchReport, EngineError> {
        if self.machine.borrow().state().is_processing() {
            return Err(EngineError::Busy);
        }
        let targets = self.readiness.borrow().ready_targets();
        self.store
            .borrow_mut()
            .apply(ParameterPatch::default().with_preserve_aspect_ratio(preserve));
        self.invalidate_custom();
        self.cascade(targets).await
    }

    /// Fetch the tint table once; later calls return the cached copy.
    pub async fn load_tints(&self) -> Result<Vec<TintEntry>, EngineError> {
        {
            let cached = self.tints.borrow();
            if !cached.is_empty() {
                return Ok(cached.clone());
            }
        }
        let tints = self.service.list_color_tints().await?;
        tracing::debug!(count = tints.len(), "tint table loaded");
        *self.tints.borrow_mut() = tints.clone();
        Ok(tints)
    }

    /// Release the server-side source. Best-effort: failures are logged
    /// and never surfaced to the user.
    pub async fn cleanup(&self) {
        let Some(session) = self.session.borrow_mut().take() else {
            return;
        };
        self.readiness.borrow_mut().clear();
        self.change_state_ok(|m| m.session_closed());
        if let Err(err) = self.service.cleanup(&session.source_id).await {
            tracing::warn!(
                source_id = %session.source_id,
                error = %err,
                "cleanup failed"
            );
        }
    }

    /// The single choke point for `Process` traffic: state gate, service
    /// call, readiness and event bookkeeping.
    pub(crate) async fn run_job(
        &self,
        target: &str,
        target_id: &str,
        params: ParameterSet,
    ) -> Result<PreviewArtifact, EngineError> {
        let session = self.require_session()?;
        self.change_state(|m| m.job_started())?;
        tracing::debug!(job = target, method = params.method.as_str(), "job started");

        let result = self
            .service
            .process(ProcessRequest {
                source_id: session.source_id,
                params,
            })
            .await;
        self.change_state_ok(|m| m.job_finished());

        match result {
            Ok(artifact) => {
                self.readiness.borrow_mut().mark(target);
                tracing::info!(job = target, "preview rendered");
                self.emit(EngineEvent::PreviewRendered {
                    target: target.to_string(),
                    target_id: target_id.to_string(),
                    artifact: artifact.clone(),
                });
                Ok(artifact)
            }
            Err(err) => {
                self.readiness.borrow_mut().invalidate(target);
                tracing::warn!(job = target, error = %err, "job failed");
                self.notice(NoticeLevel::Error, format!("processing failed: {err}"));
                Err(err)
            }
        }
    }

    pub(crate) fn require_session(&self) -> Result<Session, EngineError> {
        self.session
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::NotReady("source image".to_string()))
    }

    /// Overlay the global tint/aspect settings onto a preset's numerics.
    pub(crate) fn merge_globals(&self, mut params: ParameterSet) -> ParameterSet {
        let globals = self.store.borrow().get();
        params.color_tint = globals.color_tint.clone();
        params.preserve_aspect_ratio = globals.preserve_aspect_ratio;
        params
    }

    pub(crate) fn service(&self) -> &Arc<dyn TransformService> {
        &self.service
    }

    pub(crate) fn pacing(&self) -> Duration {
        self.config.pacing
    }

    pub(crate) fn output_size(&self) -> Option<u32> {
        self.config.output_size
    }

    fn invalidate_custom(&self) {
        self.readiness.borrow_mut().invalidate(CUSTOM_TARGET);
        self.emit(EngineEvent::TargetInvalidated {
            target: CUSTOM_TARGET.to_string(),
        });
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(EngineEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub(crate) fn progress(&self, message: impl Into<String>, percent: u8) {
        self.emit(EngineEvent::Progress {
            message: message.into(),
            percent,
        });
    }

    pub(crate) fn clear_progress(&self) {
        self.emit(EngineEvent::ProgressCleared);
    }

    fn change_state(
        &self,
        f: impl FnOnce(&mut StateMachine) -> Result<EngineState, EngineError>,
    ) -> Result<(), EngineError> {
        let from = self.machine.borrow().state();
        let to = f(&mut self.machine.borrow_mut())?;
        if from != to {
            self.emit(EngineEvent::StateChanged { from, to });
        }
        Ok(())
    }

    fn change_state_ok(&self, f: impl FnOnce(&mut StateMachine) -> EngineState) {
        let from = self.machine.borrow().state();
        let to = f(&mut self.machine.borrow_mut());
        if from != to {
            self.emit(EngineEvent::StateChanged { from, to });
        }
    }
}
