//! CLI configuration (`grimshade.yaml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use grimshade_core::EngineConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Base URL of the transform service.
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Quiet window for slider-style edits in the interactive session.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Pause between catalog entries during a full run.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Requested export edge length; omitted means the service default.
    #[serde(default)]
    pub output_size: Option<u32>,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            request_timeout_ms: default_request_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            pacing_ms: default_pacing_ms(),
            output_size: None,
            download_dir: default_download_dir(),
        }
    }
}

fn default_service_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_pacing_ms() -> u64 {
    200
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

impl CliConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_pacing(Duration::from_millis(self.pacing_ms))
            .with_output_size(self.output_size)
    }
}

/// Load configuration from a YAML file. A missing file yields the
/// defaults so the CLI works out of the box.
pub fn load_config(path: &Path) -> Result<CliConfig, ConfigError> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<CliConfig, ConfigError> {
    let config: CliConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &CliConfig) -> Result<(), ConfigError> {
    if config.service_url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "service_url must not be empty".to_string(),
        ));
    }
    if !config.service_url.starts_with("http://") && !config.service_url.starts_with("https://") {
        return Err(ConfigError::Invalid(format!(
            "service_url '{}' must be an http(s) URL",
            config.service_url
        )));
    }
    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "request_timeout_ms must be > 0".to_string(),
        ));
    }
    if config.debounce_ms == 0 {
        return Err(ConfigError::Invalid(
            "debounce_ms must be > 0".to_string(),
        ));
    }
    Ok(())
}
