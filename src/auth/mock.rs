use super::TokenProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockTokenProvider {
    token: Option<String>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTokenProvider {
    /// A provider that fails until a token is configured.
    pub fn new() -> Self {
        Self {
            token: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_access_token(&self) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;
        self.token
            .clone()
            .ok_or_else(|| Error::Auth("mock credentials unavailable".to_string()))
    }
}
