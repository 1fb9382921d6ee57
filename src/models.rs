//! Data models and structures
//!
//! Defines the request payloads accepted by the relay, the provider-side file
//! handle, and the environment-driven configuration.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_VIDEO_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Processing state of a provider-side file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    StateUnspecified,
}

/// Reference to an uploaded asset. The provider owns the file; the relay only
/// keeps the handle for the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default = "default_file_state")]
    pub state: FileState,
}

fn default_file_state() -> FileState {
    FileState::StateUnspecified
}

impl FileHandle {
    pub fn is_processing(&self) -> bool {
        self.state == FileState::Processing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: i32,
}

/// Body of `POST /api/image/generate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerateRequest {
    pub image_data_url: Option<String>,
    pub prompt: Option<String>,
    /// Objects to detect; renders the 2D-box prompt when `prompt` is absent.
    pub target: Option<String>,
    pub label: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub thinking_config: Option<ThinkingConfig>,
    /// When set, the parsed output is reshaped into UI coordinates.
    pub detect_type: Option<String>,
}

/// Everything needed to run a function-calling generation against a video.
#[derive(Debug, Clone)]
pub struct VideoGenerateRequest {
    pub text: String,
    pub function_declarations: serde_json::Value,
    pub model: Option<String>,
}

/// A binary payload received from a client upload.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub bytes: Bytes,
    pub mime_type: String,
    pub display_name: Option<String>,
}

/// Where OAuth access tokens come from, if anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    None,
    Static(String),
    MetadataServer,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub default_video_model: String,
    pub default_image_model: String,
    pub poll_interval: Duration,
    pub poll_max_attempts: usize,
    pub max_upload_bytes: usize,
    pub credentials: CredentialSource,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid PORT '{}'", raw)))?,
            None => 8080,
        };

        let poll_interval_ms: u64 = parse_or(&non_empty, "POLL_INTERVAL_MS", 5000)?;
        let poll_max_attempts: usize = parse_or(&non_empty, "POLL_MAX_ATTEMPTS", 24)?;
        let max_upload_bytes: usize = parse_or(&non_empty, "MAX_UPLOAD_BYTES", 100 * 1024 * 1024)?;

        let credentials = if let Some(token) = non_empty("GOOGLE_ACCESS_TOKEN") {
            CredentialSource::Static(token)
        } else if non_empty("USE_METADATA_CREDENTIALS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
        {
            CredentialSource::MetadataServer
        } else {
            CredentialSource::None
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            gemini_base_url: non_empty("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            default_video_model: non_empty("DEFAULT_VIDEO_MODEL")
                .unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            default_image_model: non_empty("DEFAULT_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_max_attempts,
            max_upload_bytes,
            credentials,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> crate::Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| crate::Error::Config(format!("Invalid {} '{}'", key, raw))),
        None => Ok(default),
    }
}
