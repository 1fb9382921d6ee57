use super::{TokenProvider, CLOUD_PLATFORM_SCOPE};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Workload-identity credentials served by the GCE/GKE/Cloud Run metadata
/// server.
pub struct MetadataTokenProvider {
    client: Client,
    base_url: String,
}

impl MetadataTokenProvider {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_METADATA_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn get_access_token(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        tracing::debug!("Requesting access token from metadata server");

        let response = self
            .client
            .get(&url)
            .query(&[("scopes", CLOUD_PLATFORM_SCOPE)])
            .header("Metadata-Flavor", "Google")
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Metadata server error (status {}): {}", status, error_text);
            return Err(Error::Auth(format!(
                "Metadata server returned status {}",
                status
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Invalid metadata token response: {}", e)))?;
        Ok(token.access_token)
    }
}
