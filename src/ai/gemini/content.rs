use super::client::{GeminiAuth, GeminiHttpClient};
use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::ai::ContentService;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiContentClient {
    http: GeminiHttpClient,
}

impl GeminiContentClient {
    pub fn new(auth: GeminiAuth) -> Self {
        Self::new_with_client(auth, reqwest::Client::new())
    }

    pub fn new_with_client(auth: GeminiAuth, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(auth, Duration::from_secs(120), client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ContentService for GeminiContentClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let response = self.http.generate_content(model, request).await?;
        tracing::debug!(
            "Gemini returned {} candidate(s) for model {}",
            response.candidate_count(),
            model
        );
        Ok(response)
    }
}
