use super::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use super::{ContentService, FileService};
use crate::models::{FileHandle, FileState, UploadedMedia};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted [`FileService`]: each status check pops the next state, and the
/// last state repeats once the script runs out.
#[derive(Clone)]
pub struct MockFileClient {
    states: Arc<Mutex<VecDeque<FileState>>>,
    fail_delete: bool,
    upload_count: Arc<Mutex<usize>>,
    get_count: Arc<Mutex<usize>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl MockFileClient {
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(VecDeque::new())),
            fail_delete: false,
            upload_count: Arc::new(Mutex::new(0)),
            get_count: Arc::new(Mutex::new(0)),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_state(self, state: FileState) -> Self {
        self.states.lock().unwrap().push_back(state);
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_status_count(&self) -> usize {
        *self.get_count.lock().unwrap()
    }

    pub fn get_delete_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    pub fn get_deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn handle(name: &str, mime_type: &str, state: FileState) -> FileHandle {
        FileHandle {
            name: name.to_string(),
            display_name: None,
            uri: format!("https://mock-files.example.com/v1beta/{}", name),
            mime_type: mime_type.to_string(),
            state,
        }
    }
}

impl Default for MockFileClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileService for MockFileClient {
    async fn upload_file(&self, media: UploadedMedia) -> Result<FileHandle> {
        let mut count = self.upload_count.lock().unwrap();
        *count += 1;

        let mut handle = Self::handle(
            &format!("files/mock-{}", *count),
            &media.mime_type,
            FileState::Processing,
        );
        handle.display_name = media.display_name;
        Ok(handle)
    }

    async fn get_file(&self, name: &str) -> Result<FileHandle> {
        *self.get_count.lock().unwrap() += 1;

        let mut states = self.states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front().unwrap_or(FileState::Active)
        } else {
            states.front().copied().unwrap_or(FileState::Active)
        };
        Ok(Self::handle(name, "video/mp4", state))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(name.to_string());
        if self.fail_delete {
            return Err(Error::AiProvider(format!("mock delete of {} failed", name)));
        }
        Ok(())
    }
}

/// [`ContentService`] double that records requests and cycles through
/// canned responses.
#[derive(Clone)]
pub struct MockContentClient {
    responses: Arc<Mutex<Vec<GenerateContentResponse>>>,
    requests: Arc<Mutex<Vec<(String, GenerateContentRequest)>>>,
}

impl MockContentClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: GenerateContentResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Queue a response whose first candidate holds a single text part.
    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(Self::text_response(text))
    }

    pub fn text_response(text: &str) -> GenerateContentResponse {
        GenerateContentResponse::new(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }))
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockContentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentService for MockContentClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let mut requests = self.requests.lock().unwrap();
        requests.push((model.to_string(), request.clone()));

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Self::text_response("[]"))
        } else {
            let index = (requests.len() - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}
