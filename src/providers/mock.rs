//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::ModelInfo;
use crate::prompt::Prompt;
use crate::providers::{
    Protocol, Provider, ProviderCapabilities, ProviderError, ResolvedCredential,
};

/// Canned outcome of a mock call
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Status(u16),
}

/// A mock provider that returns predefined responses and records prompts.
#[derive(Debug)]
pub struct MockProvider {
    reply: Mutex<MockReply>,
    models: Mutex<Vec<ModelInfo>>,
    prompts: Mutex<Vec<Prompt>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock provider answering every prompt with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            reply: Mutex::new(MockReply::Text(text.into())),
            models: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock provider failing every call with an HTTP status.
    pub fn failing(status: u16) -> Self {
        let provider = Self::new("");
        provider.set_status(status);
        provider
    }

    /// Set the text to return.
    pub fn set_response(&self, text: impl Into<String>) {
        *self.reply.lock().unwrap() = MockReply::Text(text.into());
    }

    /// Make every call fail with an HTTP status.
    pub fn set_status(&self, status: u16) {
        *self.reply.lock().unwrap() = MockReply::Status(status);
    }

    /// Set the models returned by `list_models`.
    pub fn set_models(&self, ids: &[&str]) {
        *self.models.lock().unwrap() = ids.iter().map(|id| ModelInfo::new(*id)).collect();
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    fn protocol(&self) -> Protocol {
        Protocol::ChatCompletion
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    fn default_base_url(&self) -> &str {
        "http://localhost"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GENERATE | ProviderCapabilities::LIST_MODELS
    }

    async fn generate(
        &self,
        _credential: &ResolvedCredential,
        prompt: &Prompt,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        match &*self.reply.lock().unwrap() {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Status(status) => Err(ProviderError::Api {
                status: *status,
                message: "mock failure".to_string(),
            }),
        }
    }

    async fn list_models(
        &self,
        _credential: &ResolvedCredential,
    ) -> Result<Vec<ModelInfo>, ProviderError> {
        if let MockReply::Status(status) = &*self.reply.lock().unwrap() {
            return Err(ProviderError::Api {
                status: *status,
                message: "mock failure".to_string(),
            });
        }
        Ok(self.models.lock().unwrap().clone())
    }
}
