//! Credential providers
//!
//! The Google Cloud authentication flow stays outside the relay; all the relay
//! needs is something that can hand out an OAuth access token.

pub mod metadata;
pub mod mock;

pub use metadata::MetadataTokenProvider;
pub use mock::MockTokenProvider;

use crate::Result;
use async_trait::async_trait;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_access_token(&self) -> Result<String>;
}

/// Hands out a fixed token, e.g. one minted by `gcloud auth print-access-token`.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
