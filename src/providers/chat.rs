//! Chat-completions provider (OpenAI, DeepSeek and compatible APIs).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::ModelInfo;
use crate::prompt::Prompt;
use crate::providers::{
    check_status, endpoint, GenerationSettings, Protocol, Provider, ProviderCapabilities,
    ProviderError, ResolvedCredential,
};
use crate::utils::HttpClient;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";

/// Provider speaking the chat-completions protocol
///
/// Posts `{model, messages, temperature, max_tokens}` to
/// `<base>/chat/completions` with bearer authentication and reads
/// `choices[0].message.content`.
#[derive(Debug, Clone)]
pub struct ChatCompletionProvider {
    id: String,
    name: String,
    default_model: String,
    default_base_url: String,
    settings: GenerationSettings,
    client: Arc<HttpClient>,
}

impl ChatCompletionProvider {
    /// Create a provider with explicit defaults
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        default_model: impl Into<String>,
        default_base_url: impl Into<String>,
        settings: GenerationSettings,
        client: Arc<HttpClient>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_model: default_model.into(),
            default_base_url: default_base_url.into(),
            settings,
            client,
        }
    }

    /// The OpenAI GPT preset
    pub fn openai(settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        Self::new("gpt", "GPT 5.1", "gpt-5.1", OPENAI_API_BASE, settings, client)
    }

    /// The DeepSeek preset
    pub fn deepseek(settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        Self::new(
            "deepseek",
            "DeepSeek",
            "deepseek-chat",
            DEEPSEEK_API_BASE,
            settings,
            client,
        )
    }

    /// An OpenAI-compatible endpoint under a custom provider id, with the
    /// OpenAI preset as defaults
    pub fn custom(id: &str, settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        Self::new(id, id, "gpt-5.1", OPENAI_API_BASE, settings, client)
    }
}

#[async_trait]
impl Provider for ChatCompletionProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> Protocol {
        Protocol::ChatCompletion
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_base_url(&self) -> &str {
        &self.default_base_url
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GENERATE
            | ProviderCapabilities::LIST_MODELS
            | ProviderCapabilities::SYSTEM_ROLE
    }

    async fn generate(
        &self,
        credential: &ResolvedCredential,
        prompt: &Prompt,
    ) -> Result<String, ProviderError> {
        let url = endpoint(&credential.base_url, "chat/completions")?;
        let request = ChatRequest {
            model: &credential.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        tracing::debug!(provider = %self.id, model = %credential.model, %url, "Sending chat completion request");

        let response = self
            .client
            .client()
            .post(url)
            .bearer_auth(&credential.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, &self.id).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse chat response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;
        let message = choice
            .message
            .ok_or_else(|| ProviderError::Parse("Choice has no message".to_string()))?;

        Ok(message.content.unwrap_or_default())
    }

    async fn list_models(
        &self,
        credential: &ResolvedCredential,
    ) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = endpoint(&credential.base_url, "models")?;
        let response = self
            .client
            .client()
            .get(url)
            .bearer_auth(&credential.api_key)
            .send()
            .await?;
        let response = check_status(response, &self.id).await?;

        let body: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse model list: {}", e)))?;

        let ids: BTreeSet<String> = body
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| !id.is_empty())
            .collect();
        Ok(ids.into_iter().map(ModelInfo::new).collect())
    }
}

// ===== Chat Completions API Types =====

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn provider() -> ChatCompletionProvider {
        let client = Arc::new(HttpClient::new().unwrap());
        ChatCompletionProvider::openai(GenerationSettings::default(), client)
    }

    fn credential(base_url: &str) -> ResolvedCredential {
        ResolvedCredential {
            provider: "gpt".into(),
            model: "gpt-5.1".into(),
            api_key: "sk-test".into(),
            base_url: base_url.into(),
        }
    }

    #[tokio::test]
    async fn test_generate_sends_chat_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-5.1",
                "messages": [
                    {"role": "system", "content": "system text"},
                    {"role": "user", "content": "user text"}
                ],
                "max_tokens": 1200
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"{\"draft\":\"Paragraph text.\"}"}}]}"#)
            .create_async()
            .await;

        let text = provider()
            .generate(
                &credential(&server.url()),
                &Prompt::new("system text", "user text"),
            )
            .await
            .unwrap();

        assert_eq!(text, r#"{"draft":"Paragraph text."}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_base_url_with_trailing_slash() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = provider();
        let prompt = Prompt::new("s", "u");
        for base in [format!("{}/v1", server.url()), format!("{}/v1/", server.url())] {
            let text = provider.generate(&credential(&base), &prompt).await.unwrap();
            assert_eq!(text, "ok");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = provider()
            .generate(&credential(&server.url()), &Prompt::new("s", "u"))
            .await
            .unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_malformed_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = provider()
            .generate(&credential(&server.url()), &Prompt::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[tokio::test]
    async fn test_list_models_sorted_unique() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/models")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"gpt-5.1"},{"id":"gpt-4o"},{"id":"gpt-5.1"},{"id":""}]}"#)
            .create_async()
            .await;

        let models = provider()
            .list_models(&credential(&server.url()))
            .await
            .unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-4o", "gpt-5.1"]);
    }
}
