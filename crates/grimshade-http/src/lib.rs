//! # Grimshade HTTP
//!
//! `reqwest` implementation of the [`TransformService`] contract against
//! the transform service's wire protocol. A thin adapter: request
//! assembly, envelope decoding and error mapping live here, nothing
//! else.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use grimshade_core::{
    EngineError, FullResolutionArtifact, FullResolutionRequest, PreviewArtifact, ProcessRequest,
    Session, TintEntry, TransformService, UploadOutcome, UploadRequest,
};

/// HTTP client for the transform service.
pub struct HttpTransformService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransformService {
    /// Transport timeouts surface as [`EngineError::Transport`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Transport(format!("failed to build client: {err}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    filename: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    preview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    preview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TintInfo {
    name: String,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

fn transport(err: reqwest::Error) -> EngineError {
    EngineError::Transport(err.to_string())
}

fn malformed(what: &str) -> EngineError {
    EngineError::Transport(format!("malformed {what} response"))
}

/// Decode a JSON body after the status gate. Non-2xx responses map to
/// `Transport`, carrying the service's error text when one is attached.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, EngineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error);
        return Err(match detail {
            Some(message) => EngineError::Transport(format!("HTTP {status}: {message}")),
            None => EngineError::Transport(format!("unexpected status {status}")),
        });
    }
    response.json::<T>().await.map_err(transport)
}

fn process_body(request: &ProcessRequest) -> serde_json::Value {
    let params = &request.params;
    serde_json::json!({
        "filename": request.source_id,
        "contrast": params.contrast,
        "brightness": params.brightness,
        "threshold": params.threshold,
        "noise": params.noise,
        "blur": params.blur_radius,
        "color_tint": params.color_tint.as_deref().unwrap_or("none"),
        "preserve_aspect_ratio": params.preserve_aspect_ratio,
        "method": params.method.as_str(),
    })
}

fn download_query(request: &FullResolutionRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        (
            "tint",
            request
                .color_tint
                .as_deref()
                .unwrap_or("none")
                .to_string(),
        ),
        (
            "preserve_aspect_ratio",
            request.preserve_aspect_ratio.to_string(),
        ),
    ];
    if let Some(size) = request.output_size {
        query.push(("size", size.to_string()));
    }
    if let Some(params) = &request.params {
        query.push(("contrast", params.contrast.to_string()));
        query.push(("brightness", params.brightness.to_string()));
        query.push(("threshold", params.threshold.to_string()));
        query.push(("noise", params.noise.to_string()));
        query.push(("blur", params.blur_radius.to_string()));
        query.push(("method", params.method.as_str().to_string()));
    }
    query
}

/// Pull the filename out of a `Content-Disposition` header, if any.
fn filename_from_content_disposition(header: Option<&str>) -> Option<String> {
    let header = header?;
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let value = part.strip_prefix("filename=")?;
            Some(value.trim_matches('"').to_string())
        })
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl TransformService for HttpTransformService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, EngineError> {
        let part = multipart::Part::bytes(request.bytes)
            .file_name(request.filename.clone())
            .mime_str(&request.content_type)
            .map_err(|err| EngineError::Validation(format!("invalid content type: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        tracing::debug!(filename = %request.filename, "uploading source image");
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let body: UploadResponse = read_json(response).await?;
        if !body.success {
            return Err(EngineError::Service(
                body.error.unwrap_or_else(|| "upload failed".to_string()),
            ));
        }
        Ok(UploadOutcome {
            session: Session {
                source_id: body.filename.ok_or_else(|| malformed("upload"))?,
                width: body.width.ok_or_else(|| malformed("upload"))?,
                height: body.height.ok_or_else(|| malformed("upload"))?,
                format: body.format.unwrap_or_else(|| "Unknown".to_string()),
            },
            preview: PreviewArtifact {
                data: body.preview.ok_or_else(|| malformed("upload"))?,
            },
        })
    }

    async fn process(&self, request: ProcessRequest) -> Result<PreviewArtifact, EngineError> {
        let response = self
            .client
            .post(self.endpoint("process"))
            .json(&process_body(&request))
            .send()
            .await
            .map_err(transport)?;
        let body: ProcessResponse = read_json(response).await?;
        if !body.success {
            return Err(EngineError::Service(
                body.error.unwrap_or_else(|| "processing failed".to_string()),
            ));
        }
        Ok(PreviewArtifact {
            data: body.preview.ok_or_else(|| malformed("process"))?,
        })
    }

    async fn fetch_full_resolution(
        &self,
        request: FullResolutionRequest,
    ) -> Result<FullResolutionArtifact, EngineError> {
        let url = self.endpoint(&format!(
            "download/{}/{}",
            request.preset, request.source_id
        ));
        let response = self
            .client
            .get(url)
            .query(&download_query(&request))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Transport(format!(
                "unexpected status {status}"
            )));
        }
        let filename_hint = filename_from_content_disposition(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = response.bytes().await.map_err(transport)?.to_vec();
        Ok(FullResolutionArtifact {
            bytes,
            filename_hint,
        })
    }

    async fn list_color_tints(&self) -> Result<Vec<TintEntry>, EngineError> {
        let response = self
            .client
            .get(self.endpoint("get_color_tints"))
            .send()
            .await
            .map_err(transport)?;
        let tints: BTreeMap<String, TintInfo> = read_json(response).await?;
        Ok(tints
            .into_iter()
            .map(|(id, info)| TintEntry {
                id,
                display_name: info.name,
                display_color: info.color,
            })
            .collect())
    }

    async fn cleanup(&self, source_id: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .post(self.endpoint(&format!("cleanup/{source_id}")))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Transport(format!(
                "unexpected status {status}"
            )));
        }
        Ok(())
    }
}
