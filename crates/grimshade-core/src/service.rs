//! Transform service boundary: the contract and wire-neutral data model.
//!
//! The service is an external collaborator; this module specifies only
//! what the orchestration core needs from it. `grimshade-http` provides
//! the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::params::{ParameterSet, TintId};

/// Opaque handle for one uploaded source image, minted by the service.
pub type SourceId = String;

/// Upload size cap enforced before any network call.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Content types the service accepts.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/tiff",
    "image/bmp",
    "image/webp",
];

/// Binary payload for an upload, with the metadata the wire needs.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// One bound source image. Immutable once created; re-uploading creates
/// a new session and discards the old handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub source_id: SourceId,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Renderable encoded preview, suitable for on-screen display. Distinct
/// from the full-resolution downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewArtifact {
    pub data: String,
}

/// Successful upload: the new session plus a preview of the original.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub session: Session,
    pub preview: PreviewArtifact,
}

/// One transform job: the session identity plus the full parameter set.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source_id: SourceId,
    pub params: ParameterSet,
}

/// Full-resolution export request.
#[derive(Debug, Clone)]
pub struct FullResolutionRequest {
    pub source_id: SourceId,
    /// Catalog preset name, or the `custom` sentinel.
    pub preset: String,
    pub color_tint: Option<TintId>,
    /// Requested edge length; `None` leaves it to the service default.
    pub output_size: Option<u32>,
    pub preserve_aspect_ratio: bool,
    /// Live numeric parameters; present only for `custom` exports.
    pub params: Option<ParameterSet>,
}

/// Full-resolution binary artifact plus an optional naming hint.
#[derive(Debug, Clone)]
pub struct FullResolutionArtifact {
    pub bytes: Vec<u8>,
    pub filename_hint: Option<String>,
}

/// A color overlay offered by the service. Fetched once, read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TintEntry {
    pub id: TintId,
    pub display_name: String,
    /// CSS-style color for swatch rendering; absent for the no-tint entry.
    pub display_color: Option<String>,
}

/// The stateless external transform service.
///
/// All traffic from the orchestration core funnels through this trait;
/// no other component issues requests directly.
#[async_trait]
pub trait TransformService: Send + Sync {
    /// Store a source image and return its session plus a preview.
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, EngineError>;

    /// Render a preview with the given parameter set.
    async fn process(&self, request: ProcessRequest) -> Result<PreviewArtifact, EngineError>;

    /// Export a full-resolution artifact.
    async fn fetch_full_resolution(
        &self,
        request: FullResolutionRequest,
    ) -> Result<FullResolutionArtifact, EngineError>;

    /// The tint table.
    async fn list_color_tints(&self) -> Result<Vec<TintEntry>, EngineError>;

    /// Release a stored source image. Best-effort: callers log failures
    /// and move on.
    async fn cleanup(&self, source_id: &str) -> Result<(), EngineError>;
}

/// Client-side gate run before any network call: reject files outside
/// the allowed content types or over the size cap.
pub fn validate_upload(request: &UploadRequest) -> Result<(), EngineError> {
    if !ALLOWED_CONTENT_TYPES.contains(&request.content_type.as_str()) {
        return Err(EngineError::Validation(format!(
            "unsupported file type '{}'; use JPEG, PNG, TIFF, BMP or WebP",
            request.content_type
        )));
    }
    if request.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(EngineError::Validation(format!(
            "file too large ({} bytes, maximum is 32MiB)",
            request.bytes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content_type: &str, len: usize) -> UploadRequest {
        UploadRequest {
            bytes: vec![0; len],
            filename: "photo.png".to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_validate_upload_accepts_allowed_types() {
        for content_type in ALLOWED_CONTENT_TYPES {
            assert!(validate_upload(&request(content_type, 16)).is_ok());
        }
    }

    #[test]
    fn test_validate_upload_rejects_unknown_type() {
        let err = validate_upload(&request("image/gif", 16)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_validate_upload_rejects_oversized_file() {
        let err = validate_upload(&request("image/png", MAX_UPLOAD_BYTES + 1)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(validate_upload(&request("image/png", MAX_UPLOAD_BYTES)).is_ok());
    }
}
