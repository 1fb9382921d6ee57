//! Multimodal provider integration
//!
//! The relay talks to the provider through two narrow seams: a file service
//! for uploaded media (upload, status, delete) and a content service for
//! `generateContent` calls. Gemini implements both; mocks back the tests.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiAuth, GeminiContentClient, GeminiFileClient};
pub use mock::{MockContentClient, MockFileClient};

use crate::ai::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use crate::models::{FileHandle, UploadedMedia};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait FileService: Send + Sync {
    async fn upload_file(&self, media: UploadedMedia) -> Result<FileHandle>;
    async fn get_file(&self, name: &str) -> Result<FileHandle>;
    async fn delete_file(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait ContentService: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}
