use super::types::{GenerateContentRequest, GenerateContentResponse, UploadFileResponse};
use crate::auth::TokenProvider;
use crate::models::{FileHandle, DEFAULT_GEMINI_BASE_URL};
use crate::{Error, Result};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// How outbound Gemini calls authenticate.
#[derive(Clone)]
pub enum GeminiAuth {
    ApiKey(String),
    Bearer(Arc<dyn TokenProvider>),
    Unconfigured,
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiAuth::ApiKey(_) => f.write_str("ApiKey(..)"),
            GeminiAuth::Bearer(_) => f.write_str("Bearer(..)"),
            GeminiAuth::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

/// Lightweight Gemini REST client shared by the content and file clients.
#[derive(Debug, Clone)]
pub struct GeminiHttpClient {
    pub(crate) client: Client,
    auth: GeminiAuth,
    pub(crate) base_url: String,
    timeout: Duration,
}

/// Strip an optional `models/` prefix so callers may pass either form.
pub fn bare_model_id(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

impl GeminiHttpClient {
    pub fn new(auth: GeminiAuth, timeout: Duration) -> Self {
        Self::new_with_client(auth, timeout, Client::new())
    }

    pub fn new_with_client(auth: GeminiAuth, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            auth,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        match &self.auth {
            GeminiAuth::ApiKey(key) => Ok(builder.header("x-goog-api-key", key)),
            GeminiAuth::Bearer(tokens) => {
                let token = tokens.get_access_token().await?;
                Ok(builder.bearer_auth(token))
            }
            GeminiAuth::Unconfigured => Err(Error::Auth(
                "No Gemini API key or credential provider configured".to_string(),
            )),
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .authorize(builder.timeout(self.timeout))
            .await?
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send {} request to Gemini: {}", what, e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Gemini {} error (status {}): {}", what, status, error_text);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    async fn parse<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Gemini response: {}", e))
        })
    }

    /// Calls Gemini's `generateContent` endpoint for `model`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            bare_model_id(model)
        );
        tracing::debug!("Sending generateContent request for model {}", model);

        let response = self.send(self.client.post(&url).json(request), "generateContent").await?;
        Self::parse(response).await
    }

    /// Uploads `bytes` through the resumable Files API protocol: one call to
    /// open the session, one call carrying the payload that finalizes it.
    pub async fn upload_file(
        &self,
        bytes: Bytes,
        mime_type: &str,
        display_name: Option<&str>,
    ) -> Result<FileHandle> {
        let start_url = format!("{}/upload/v1beta/files", self.base_url);
        let metadata = serde_json::json!({
            "file": { "display_name": display_name }
        });
        tracing::debug!(
            "Opening upload session for {} bytes ({})",
            bytes.len(),
            mime_type
        );

        let start = self
            .send(
                self.client
                    .post(&start_url)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
                    .header("X-Goog-Upload-Header-Content-Type", mime_type)
                    .json(&metadata),
                "upload start",
            )
            .await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::AiProvider("Gemini upload session returned no upload URL".to_string())
            })?;

        let finish = self
            .send(
                self.client
                    .post(&upload_url)
                    .header("X-Goog-Upload-Command", "upload, finalize")
                    .header("X-Goog-Upload-Offset", "0")
                    .header("Content-Type", mime_type)
                    .body(bytes),
                "upload finalize",
            )
            .await?;

        let uploaded: UploadFileResponse = Self::parse(finish).await?;
        Ok(uploaded.file)
    }

    /// Fetches the current state of an uploaded file (`files/{id}`).
    pub async fn get_file(&self, name: &str) -> Result<FileHandle> {
        let url = format!("{}/v1beta/{}", self.base_url, name);
        let response = self.send(self.client.get(&url), "get file").await?;
        Self::parse(response).await
    }

    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let url = format!("{}/v1beta/{}", self.base_url, name);
        self.send(self.client.delete(&url), "delete file").await?;
        Ok(())
    }
}
