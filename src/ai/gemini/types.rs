//! Shared Gemini payload types used by the content and file clients.

use crate::models::{FileHandle, ThinkingConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

/// Untagged union of the content parts the relay sends or reads back.
///
/// Variant order matters for `#[serde(untagged)]` decoding; `Other` keeps any
/// part kind we do not model so relayed responses stay lossless enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    Other(Value),
}

/// Base64 inline payload used for image requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Reference to a file previously uploaded through the Files API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// `generateContent` response, kept exactly as the provider sent it.
///
/// The video endpoints relay this body untouched, so nothing is decoded into
/// typed structs up front; typed parts are read from it on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct GenerateContentResponse {
    pub body: Value,
}

impl GenerateContentResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn candidate_count(&self) -> usize {
        self.body
            .get("candidates")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Raw parts of the first candidate, empty when the provider returned none.
    pub fn parts(&self) -> &[Value] {
        self.body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Typed view of [`parts`](Self::parts).
    pub fn first_parts(&self) -> Vec<Part> {
        self.parts()
            .iter()
            .filter_map(|p| serde_json::from_value(p.clone()).ok())
            .collect()
    }
}

/// Envelope returned by the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadFileResponse {
    pub file: FileHandle,
}
