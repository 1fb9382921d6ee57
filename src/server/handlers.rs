use super::AppState;
use crate::ai::gemini::types::FileData;
use crate::ai::mime::detect_video_mime;
use crate::models::{FileHandle, ImageGenerateRequest, UploadedMedia, VideoGenerateRequest};
use crate::relay::VideoGenerateResponse;
use crate::{Error, Result};
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

type Response = (StatusCode, Json<Value>);

pub async fn healthz() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Ready when the configured credentials work: a token can be minted from the
/// credential provider, or (without one) an API key is present.
pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    match &state.tokens {
        Some(tokens) => match tokens.get_access_token().await {
            Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
            Err(e) => {
                error!("Readiness check failed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "not ready",
                        "error": "authentication check failed"
                    })),
                )
            }
        },
        None if state.api_key_configured => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "error": "missing API key" })),
        ),
    }
}

pub async fn auth_token(State(state): State<Arc<AppState>>) -> Response {
    let token = match &state.tokens {
        Some(tokens) => tokens.get_access_token().await,
        None => Err(Error::Auth("no credential provider configured".to_string())),
    };

    match token {
        Ok(token) => (StatusCode::OK, Json(json!({ "accessToken": token }))),
        Err(e) => {
            error!("Error getting access token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get access token" })),
            )
        }
    }
}

pub async fn image_generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ImageGenerateRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    Ok(Json(state.relay.generate_image(request).await?))
}

pub async fn video_upload(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<FileHandle>> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let media = form.take_video()?;

    info!("Uploading video ({} bytes)", media.bytes.len());
    Ok(Json(state.relay.upload_video(media).await?))
}

pub async fn video_generate(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<VideoGenerateResponse>> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let media = form.take_video()?;
    let request = form.video_request()?;

    Ok(Json(state.relay.generate_video(media, request).await?))
}

pub async fn video_generate_from_uploaded(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<VideoGenerateResponse>> {
    let mut form = read_form(multipart, state.max_upload_bytes).await?;
    let file_uri = form
        .take_field("fileUri")
        .ok_or_else(|| Error::MissingField("fileUri".to_string()))?;
    let mime_type = form.take_field("mimeType");
    let request = form.video_request()?;

    let file_data = FileData {
        mime_type,
        file_uri,
    };
    Ok(Json(state.relay.generate_for_file(file_data, request).await?))
}

/// A drained multipart body: the optional `video` part plus text fields.
#[derive(Debug, Default)]
struct Form {
    video: Option<UploadedMedia>,
    fields: HashMap<String, String>,
}

impl Form {
    fn take_video(&mut self) -> Result<UploadedMedia> {
        self.video
            .take()
            .ok_or_else(|| Error::MissingField("video".to_string()))
    }

    /// Remove a text field, treating blank values as absent.
    fn take_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|v| !v.trim().is_empty())
    }

    fn video_request(&mut self) -> Result<VideoGenerateRequest> {
        let text = self
            .take_field("text")
            .ok_or_else(|| Error::MissingField("text".to_string()))?;
        let raw = self
            .take_field("functionDeclarations")
            .ok_or_else(|| Error::MissingField("functionDeclarations".to_string()))?;

        let function_declarations: Value = serde_json::from_str(&raw).map_err(|_| {
            Error::InvalidRequest(
                "Invalid functionDeclarations format. Must be a valid JSON string.".to_string(),
            )
        })?;
        if !function_declarations.is_array() {
            return Err(Error::InvalidRequest(
                "functionDeclarations must be a JSON array".to_string(),
            ));
        }

        Ok(VideoGenerateRequest {
            text,
            function_declarations,
            model: self.take_field("model"),
        })
    }
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::InvalidRequest(e.body_text())
    }
}

async fn read_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    max_upload_bytes: usize,
) -> Result<Form> {
    let mut multipart = multipart.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let mut form = Form::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "video" {
            let display_name = field.file_name().map(str::to_string);
            let declared_mime = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            if bytes.len() > max_upload_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "video is {} bytes, limit is {}",
                    bytes.len(),
                    max_upload_bytes
                )));
            }
            if bytes.is_empty() {
                return Err(Error::InvalidRequest("video file is empty".to_string()));
            }

            let mime_type = declared_mime
                .filter(|m| m.starts_with("video/"))
                .unwrap_or_else(|| detect_video_mime(&bytes).to_string());

            form.video = Some(UploadedMedia {
                bytes,
                mime_type,
                display_name,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
