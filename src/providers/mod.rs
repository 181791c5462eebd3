//! Model provider adapters with an extensible trait-based architecture.
//!
//! This module defines the [`Provider`] trait that every large-language-model
//! backend implements. An adapter owns one wire protocol: it builds the
//! request envelope and authentication, issues the HTTP call and pulls the
//! raw text out of the provider's response shape. It never retries and never
//! interprets the text; that is the job of [`crate::normalize`].
//!
//! # Built-in providers
//!
//! | id         | protocol            | default model    |
//! |------------|---------------------|------------------|
//! | `gpt`      | chat completions    | `gpt-5.1`        |
//! | `deepseek` | chat completions    | `deepseek-chat`  |
//! | `gemini`   | generative content  | `gemini-1.5-pro` |
//!
//! Any other provider id is served by a chat-completions adapter using the
//! caller's model and base URL, with the `gpt` preset filling the gaps.
//!
//! # Adding a provider
//!
//! 1. Implement [`Provider`] for a new struct
//! 2. Register it with [`ProviderRegistry::register`] or add it to
//!    [`ProviderRegistry::new`]

mod chat;
mod gemini;
pub mod mock;
mod registry;

pub use chat::ChatCompletionProvider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use registry::{normalize_id, ProviderCapabilities, ProviderRegistry, DEFAULT_PROVIDER};

use async_trait::async_trait;
use url::Url;

use crate::models::ModelInfo;
use crate::prompt::Prompt;

/// Characters of an error response body kept in error messages
const ERROR_BODY_CHARS: usize = 200;

/// Wire protocol family spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// `POST <base>/chat/completions` with a message list and bearer auth
    ChatCompletion,
    /// `POST <base>/models/<model>:generateContent?key=<key>` with content parts
    GenerativeContent,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::ChatCompletion => f.write_str("chat-completion"),
            Protocol::GenerativeContent => f.write_str("generative-content"),
        }
    }
}

/// Sampling parameters sent with every generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 1200,
        }
    }
}

/// A credential with provider defaults applied
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    /// Normalized provider id
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
}

impl ResolvedCredential {
    /// Name of the first missing part, if any
    pub fn missing_part(&self) -> Option<&'static str> {
        if self.api_key.trim().is_empty() {
            Some("API key")
        } else if self.model.trim().is_empty() {
            Some("model id")
        } else {
            None
        }
    }
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// The Provider trait defines the interface for all model backends.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Unique identifier (e.g., "gpt", "gemini")
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Wire protocol family
    fn protocol(&self) -> Protocol;

    /// Model used when the credential names none
    fn default_model(&self) -> &str;

    /// Base URL used when the credential names none
    fn default_base_url(&self) -> &str;

    /// Describe the capabilities of this provider
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GENERATE
    }

    /// Whether this provider can list its models
    fn supports_model_listing(&self) -> bool {
        self.capabilities()
            .contains(ProviderCapabilities::LIST_MODELS)
    }

    /// Send one prompt and return the raw text of the answer
    async fn generate(
        &self,
        credential: &ResolvedCredential,
        prompt: &Prompt,
    ) -> Result<String, ProviderError>;

    /// List the models available to the credential
    async fn list_models(
        &self,
        _credential: &ResolvedCredential,
    ) -> Result<Vec<ModelInfo>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

/// Errors that can occur when talking to a provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The requested operation is not implemented for this provider
    #[error("Operation not implemented for this provider")]
    NotImplemented,

    /// Connection or protocol failure
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response envelope did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unusable base URL or similar
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            // The URL may carry the API key as a query parameter
            ProviderError::Network(err.without_url().to_string())
        }
    }
}

/// Join a relative path onto a base URL, treating the base as a directory
/// whether or not it ends with `/`.
pub fn endpoint(base_url: &str, path: &str) -> Result<Url, ProviderError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base)
        .map_err(|e| ProviderError::InvalidConfig(format!("Invalid base URL '{}': {}", base_url, e)))?;
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ProviderError::InvalidConfig(format!("Invalid endpoint path '{}': {}", path, e)))
}

/// Turn a non-2xx response into an error, passing 2xx responses through
pub(crate) async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(ERROR_BODY_CHARS).collect();
    tracing::warn!(provider, status = status.as_u16(), "Provider returned an error status");
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_is_separator_agnostic() {
        let with = endpoint("https://api.openai.com/v1/", "chat/completions").unwrap();
        let without = endpoint("https://api.openai.com/v1", "chat/completions").unwrap();
        assert_eq!(with, without);
        assert_eq!(with.as_str(), "https://api.openai.com/v1/chat/completions");

        let leading = endpoint("https://api.openai.com/v1", "/chat/completions").unwrap();
        assert_eq!(leading, with);
    }

    #[test]
    fn test_endpoint_rejects_invalid_base() {
        assert!(matches!(
            endpoint("not a url", "models"),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_resolved_credential_missing_part() {
        let mut credential = ResolvedCredential {
            provider: "gpt".into(),
            model: "gpt-5.1".into(),
            api_key: "sk-test".into(),
            base_url: "https://api.openai.com/v1".into(),
        };
        assert_eq!(credential.missing_part(), None);
        assert!(!format!("{:?}", credential).contains("sk-test"));

        credential.api_key = "  ".into();
        assert_eq!(credential.missing_part(), Some("API key"));

        credential.api_key = "sk-test".into();
        credential.model = String::new();
        assert_eq!(credential.missing_part(), Some("model id"));
    }
}
