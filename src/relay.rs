//! Request orchestration between the demo front ends and the provider.

use crate::ai::gemini::types::{
    Content, FileData, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    Tool,
};
use crate::ai::{mime, ContentService, FileService, GeminiAuth, GeminiContentClient, GeminiFileClient};
use crate::auth::TokenProvider;
use crate::detection::{self, DetectType, Timecode};
use crate::models::{Config, FileHandle, ImageGenerateRequest, UploadedMedia, VideoGenerateRequest};
use crate::poll::{wait_until_ready, PollPolicy};
use crate::{extract, prompts, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed sampling temperature for video function calling.
const VIDEO_TEMPERATURE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub poll: PollPolicy,
    pub default_image_model: String,
    pub default_video_model: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            default_image_model: crate::models::DEFAULT_IMAGE_MODEL.to_string(),
            default_video_model: crate::models::DEFAULT_VIDEO_MODEL.to_string(),
        }
    }
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll: PollPolicy {
                interval: config.poll_interval,
                max_attempts: config.poll_max_attempts,
                ..Default::default()
            },
            default_image_model: config.default_image_model.clone(),
            default_video_model: config.default_video_model.clone(),
        }
    }
}

/// Result of a video generation call: the provider response relayed as sent,
/// plus the decoded timecodes when the model called a timecode function.
#[derive(Debug, Clone, Serialize)]
pub struct VideoGenerateResponse {
    #[serde(flatten)]
    pub response: GenerateContentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timecodes: Option<Vec<Timecode>>,
}

/// Injectable service bundle used to construct [`Relay`] in tests.
pub struct RelayServices {
    pub files: Box<dyn FileService>,
    pub content: Box<dyn ContentService>,
}

pub struct Relay {
    files: Box<dyn FileService>,
    content: Box<dyn ContentService>,
    settings: RelaySettings,
}

impl Relay {
    pub fn with_services(services: RelayServices, settings: RelaySettings) -> Self {
        Self {
            files: services.files,
            content: services.content,
            settings,
        }
    }

    /// Build a relay backed by Gemini. An API key wins over a credential
    /// provider; with neither, provider calls fail with an auth error.
    pub fn from_config(
        config: &Config,
        http_client: reqwest::Client,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        let auth = match (&config.gemini_api_key, tokens) {
            (Some(key), _) => {
                info!("Gemini auth: API key");
                GeminiAuth::ApiKey(key.clone())
            }
            (None, Some(tokens)) => {
                info!("Gemini auth: bearer token from credential provider");
                GeminiAuth::Bearer(tokens)
            }
            (None, None) => {
                warn!("No GEMINI_API_KEY or credentials configured; provider calls will fail");
                GeminiAuth::Unconfigured
            }
        };

        let files = GeminiFileClient::new_with_client(auth.clone(), http_client.clone())
            .with_base_url(config.gemini_base_url.clone());
        let content = GeminiContentClient::new_with_client(auth, http_client)
            .with_base_url(config.gemini_base_url.clone());

        Self::with_services(
            RelayServices {
                files: Box::new(files),
                content: Box::new(content),
            },
            RelaySettings::from_config(config),
        )
    }

    /// Run a prompt against a canvas-rendered image and return the model's
    /// JSON, reshaped into UI coordinates when a detect type is given.
    pub async fn generate_image(&self, request: ImageGenerateRequest) -> Result<Value> {
        let data_url = request
            .image_data_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::MissingField("imageDataUrl".to_string()))?;

        let prompt = match (non_blank(&request.prompt), non_blank(&request.target)) {
            (Some(prompt), _) => prompt.to_string(),
            (None, Some(target)) => prompts::box_2d_detection(target, request.label.as_deref()),
            (None, None) => return Err(Error::MissingField("prompt".to_string())),
        };

        let detect_type = non_blank(&request.detect_type)
            .map(str::parse::<DetectType>)
            .transpose()?;

        let inline_data = mime::inline_data_from_url(data_url)?;
        let model = non_blank(&request.model).unwrap_or(self.settings.default_image_model.as_str());

        info!(
            "Image generation with {} ({}, {} base64 chars)",
            model,
            inline_data.mime_type,
            inline_data.data.len()
        );

        let generation_config = GenerationConfig {
            temperature: request.temperature,
            thinking_config: request.thinking_config.clone(),
            ..Default::default()
        };

        let gemini_request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::user(vec![
                Part::InlineData { inline_data },
                Part::Text { text: prompt },
            ])],
            tools: None,
            generation_config: Some(generation_config),
        };

        let response = self.content.generate_content(model, &gemini_request).await?;
        let parsed = extract::response_json(&response)?;

        match detect_type {
            Some(detect_type) => detection::reshape(detect_type, parsed),
            None => Ok(parsed),
        }
    }

    /// Upload a video and wait until the provider has finished processing it.
    pub async fn upload_video(&self, media: UploadedMedia) -> Result<FileHandle> {
        let uploaded = self.files.upload_file(media).await?;
        info!("Processing video {}", uploaded.name);
        wait_until_ready(self.files.as_ref(), &uploaded.name, &self.settings.poll).await
    }

    /// Upload, wait, then run function calling against the processed video.
    pub async fn generate_video(
        &self,
        media: UploadedMedia,
        request: VideoGenerateRequest,
    ) -> Result<VideoGenerateResponse> {
        let ready = self.upload_video(media).await?;
        let file_data = FileData {
            mime_type: Some(ready.mime_type).filter(|m| !m.is_empty()),
            file_uri: ready.uri,
        };
        self.generate_for_file(file_data, request).await
    }

    /// Run function calling against a file that was uploaded earlier.
    pub async fn generate_for_file(
        &self,
        file_data: FileData,
        request: VideoGenerateRequest,
    ) -> Result<VideoGenerateResponse> {
        if file_data.file_uri.trim().is_empty() {
            return Err(Error::MissingField("fileUri".to_string()));
        }

        let model = non_blank(&request.model).unwrap_or(self.settings.default_video_model.as_str());
        info!("Video generation with {} for {}", model, file_data.file_uri);

        let gemini_request = GenerateContentRequest {
            system_instruction: Some(Content::system(prompts::VIDEO_SYSTEM)),
            contents: vec![Content::user(vec![
                Part::Text { text: request.text },
                Part::FileData { file_data },
            ])],
            tools: Some(vec![Tool {
                function_declarations: request.function_declarations,
            }]),
            generation_config: Some(GenerationConfig {
                temperature: Some(VIDEO_TEMPERATURE),
                ..Default::default()
            }),
        };

        let response = self.content.generate_content(model, &gemini_request).await?;

        let timecodes = match extract::function_call(&response) {
            Some(call) => match extract::timecodes(&call) {
                Ok(timecodes) => {
                    info!("Model called {} with {} timecodes", call.name, timecodes.len());
                    Some(timecodes)
                }
                Err(e) => {
                    warn!("Model called {} with unexpected arguments: {}", call.name, e);
                    None
                }
            },
            None => {
                warn!("Model response contained no function call");
                None
            }
        };

        Ok(VideoGenerateResponse {
            response,
            timecodes,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
