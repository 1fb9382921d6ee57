//! Gemini Files API client: upload, status lookup and cleanup.

use super::client::{GeminiAuth, GeminiHttpClient};
use crate::ai::FileService;
use crate::models::{FileHandle, UploadedMedia};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Uploads carry up to 100 MiB of video.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// Status lookups and deletes are small; keep them well under one poll interval.
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Gemini implementation of [`FileService`].
pub struct GeminiFileClient {
    http: GeminiHttpClient,
    status: GeminiHttpClient,
}

impl GeminiFileClient {
    pub fn new(auth: GeminiAuth) -> Self {
        Self::new_with_client(auth, reqwest::Client::new())
    }

    pub fn new_with_client(auth: GeminiAuth, client: reqwest::Client) -> Self {
        let http = GeminiHttpClient::new_with_client(auth, UPLOAD_TIMEOUT, client);
        Self {
            status: http.clone().with_timeout(STATUS_TIMEOUT),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.status = self.status.with_base_url(base_url.clone());
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl FileService for GeminiFileClient {
    async fn upload_file(&self, media: UploadedMedia) -> Result<FileHandle> {
        let UploadedMedia {
            bytes,
            mime_type,
            display_name,
        } = media;
        tracing::info!(
            "Uploading {} ({} bytes) to Gemini",
            display_name.as_deref().unwrap_or("unnamed file"),
            bytes.len()
        );
        let handle = self
            .http
            .upload_file(bytes, &mime_type, display_name.as_deref())
            .await?;
        tracing::info!("Uploaded as {} (state {:?})", handle.name, handle.state);
        Ok(handle)
    }

    async fn get_file(&self, name: &str) -> Result<FileHandle> {
        self.status.get_file(name).await
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        tracing::info!("Deleting Gemini file {}", name);
        self.status.delete_file(name).await
    }
}
