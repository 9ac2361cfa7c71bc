//! Test doubles shared by the engine test suites.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::EngineError;
use crate::params::Method;
use crate::service::{
    FullResolutionArtifact, FullResolutionRequest, PreviewArtifact, ProcessRequest, Session,
    TintEntry, TransformService, UploadOutcome, UploadRequest,
};

/// A valid upload request for tests.
pub fn sample_upload() -> UploadRequest {
    UploadRequest {
        bytes: vec![0x89, 0x50, 0x4E, 0x47],
        filename: "castle.png".to_string(),
        content_type: "image/png".to_string(),
    }
}

/// Every call the mock observed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Upload {
        filename: String,
    },
    Process {
        method: Method,
        contrast: f32,
        color_tint: Option<String>,
        preserve_aspect_ratio: bool,
    },
    Fetch {
        preset: String,
        has_params: bool,
        color_tint: Option<String>,
    },
    Tints,
    Cleanup {
        source_id: String,
    },
}

/// Recording mock with scripted failures and concurrency accounting.
pub struct RecordingService {
    calls: Mutex<Vec<ServiceCall>>,
    fail_methods: Mutex<HashSet<Method>>,
    fail_upload: Mutex<bool>,
    fail_cleanup: Mutex<bool>,
    filename_hint: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingService {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_methods: Mutex::new(HashSet::new()),
            fail_upload: Mutex::new(false),
            fail_cleanup: Mutex::new(false),
            filename_hint: Mutex::new(None),
            delay: Mutex::new(None),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Make every call suspend for `delay`, exposing overlap windows.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_fail_upload(&self, fail: bool) {
        *self.fail_upload.lock().unwrap() = fail;
    }

    pub fn set_fail_cleanup(&self, fail: bool) {
        *self.fail_cleanup.lock().unwrap() = fail;
    }

    pub fn set_filename_hint(&self, hint: Option<String>) {
        *self.filename_hint.lock().unwrap() = hint;
    }

    /// Fail every `process` call carrying this method.
    pub fn fail_method(&self, method: Method) {
        self.fail_methods.lock().unwrap().insert(method);
    }

    pub fn clear_fail_methods(&self) {
        self.fail_methods.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn process_calls(&self) -> Vec<ServiceCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ServiceCall::Process { .. }))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Highest number of simultaneously in-flight `process` calls seen.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn enter(&self) {
        let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let mut peak = self.peak.load(Ordering::SeqCst);
        while in_flight > peak {
            match self
                .peak
                .compare_exchange(peak, in_flight, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break,
                Err(actual) => peak = actual,
            }
        }
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }
}

impl Default for RecordingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransformService for RecordingService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, EngineError> {
        self.record(ServiceCall::Upload {
            filename: request.filename.clone(),
        });
        self.pause().await;
        if *self.fail_upload.lock().unwrap() {
            return Err(EngineError::Service("upload rejected".to_string()));
        }
        Ok(UploadOutcome {
            session: Session {
                source_id: "src-1".to_string(),
                width: 800,
                height: 600,
                format: "PNG".to_string(),
            },
            preview: PreviewArtifact {
                data: "preview:original".to_string(),
            },
        })
    }

    async fn process(&self, request: ProcessRequest) -> Result<PreviewArtifact, EngineError> {
        self.record(ServiceCall::Process {
            method: request.params.method,
            contrast: request.params.contrast,
            color_tint: request.params.color_tint.clone(),
            preserve_aspect_ratio: request.params.preserve_aspect_ratio,
        });
        self.enter();
        self.pause().await;
        self.exit();
        if self.fail_methods.lock().unwrap().contains(&request.params.method) {
            return Err(EngineError::Service(format!(
                "transform '{}' rejected",
                request.params.method.as_str()
            )));
        }
        Ok(PreviewArtifact {
            data: format!("preview:{}", request.params.method.as_str()),
        })
    }

    async fn fetch_full_resolution(
        &self,
        request: FullResolutionRequest,
    ) -> Result<FullResolutionArtifact, EngineError> {
        self.record(ServiceCall::Fetch {
            preset: request.preset.clone(),
            has_params: request.params.is_some(),
            color_tint: request.color_tint.clone(),
        });
        self.pause().await;
        Ok(FullResolutionArtifact {
            bytes: vec![0xAB; 64],
            filename_hint: self.filename_hint.lock().unwrap().clone(),
        })
    }

    async fn list_color_tints(&self) -> Result<Vec<TintEntry>, EngineError> {
        self.record(ServiceCall::Tints);
        Ok(vec![
            TintEntry {
                id: "none".to_string(),
                display_name: "No Tinting".to_string(),
                display_color: None,
            },
            TintEntry {
                id: "sepia".to_string(),
                display_name: "Sepia Warmth".to_string(),
                display_color: Some("#8B4513".to_string()),
            },
        ])
    }

    async fn cleanup(&self, source_id: &str) -> Result<(), EngineError> {
        self.record(ServiceCall::Cleanup {
            source_id: source_id.to_string(),
        });
        if *self.fail_cleanup.lock().unwrap() {
            return Err(EngineError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}
