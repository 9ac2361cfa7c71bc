//! Two-phase full-resolution export.
//!
//! Preview generation and full-resolution export are separate service
//! calls, so exporting the live custom parameters first syncs them to
//! the service with a `Process` call; skipping the sync would export
//! stale parameters. Catalog presets are server-known and need no sync.

use crate::catalog::{self, CUSTOM_TARGET, CUSTOM_TARGET_ID};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::NoticeLevel;
use crate::params::Method;
use crate::service::FullResolutionRequest;

/// A downloadable artifact plus the filename it should be saved under.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Engine {
    /// Export a full-resolution artifact for a catalog preset or the
    /// live custom parameters.
    ///
    /// Preconditions are checked before any network traffic: a session
    /// must be bound, and `custom` requires its readiness flag. The
    /// caller saves the returned bytes; orchestration state is not
    /// mutated beyond the custom sync job.
    pub async fn download(&self, target: &str) -> Result<Download, EngineError> {
        let session = self.require_session()?;
        let is_custom = target == CUSTOM_TARGET;
        if is_custom && !self.is_ready(CUSTOM_TARGET) {
            return Err(EngineError::NotReady("custom preview".to_string()));
        }
        if !is_custom && catalog::find(target).is_none() {
            return Err(EngineError::Validation(format!(
                "unknown preset '{target}'"
            )));
        }

        self.progress(format!("preparing {target} export"), 25);
        let result = self.fetch(target, is_custom, session.source_id).await;
        self.clear_progress();

        match &result {
            Ok(download) => {
                tracing::info!(
                    preset = target,
                    filename = %download.filename,
                    bytes = download.bytes.len(),
                    "download complete"
                );
                self.notice(
                    NoticeLevel::Success,
                    format!("download ready: {}", download.filename),
                );
            }
            Err(err) => {
                self.notice(NoticeLevel::Error, format!("download failed: {err}"));
            }
        }
        result
    }

    async fn fetch(
        &self,
        target: &str,
        is_custom: bool,
        source_id: String,
    ) -> Result<Download, EngineError> {
        let globals = self.params();

        let custom_params = if is_custom {
            let mut params = globals.clone();
            params.method = Method::Custom;
            self.progress("syncing custom parameters", 50);
            self.run_job(CUSTOM_TARGET, CUSTOM_TARGET_ID, params.clone())
                .await?;
            Some(params)
        } else {
            None
        };

        self.progress("fetching full-resolution image", 75);
        let artifact = self
            .service()
            .fetch_full_resolution(FullResolutionRequest {
                source_id,
                preset: target.to_string(),
                color_tint: globals.color_tint.clone(),
                output_size: self.output_size(),
                preserve_aspect_ratio: globals.preserve_aspect_ratio,
                params: custom_params,
            })
            .await?;

        let filename = artifact
            .filename_hint
            .clone()
            .unwrap_or_else(|| synthesize_filename(target, globals.color_tint.as_deref()));
        Ok(Download {
            filename,
            bytes: artifact.bytes,
        })
    }
}

/// Deterministic fallback name when the service offers no hint.
pub fn synthesize_filename(target: &str, tint: Option<&str>) -> String {
    match tint {
        Some(tint) if tint != "none" => format!("grimshade_{target}_{tint}.png"),
        _ => format!("grimshade_{target}.png"),
    }
}
