//! Gemini generative-content provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::models::ModelInfo;
use crate::prompt::Prompt;
use crate::providers::{
    check_status, endpoint, GenerationSettings, Protocol, Provider, ProviderCapabilities,
    ProviderError, ResolvedCredential,
};
use crate::utils::HttpClient;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
///
/// Sends the system instruction and the prompt as one text part to
/// `<base>/models/<model>:generateContent`, authenticated with the API key
/// as a query parameter, and reads `candidates[0].content.parts[*].text`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    settings: GenerationSettings,
    client: Arc<HttpClient>,
}

impl GeminiProvider {
    pub fn new(settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        Self { settings, client }
    }

    /// Append the key as the `key` query parameter
    fn with_key(mut url: Url, api_key: &str) -> Url {
        url.set_query(Some(&format!("key={}", urlencoding::encode(api_key))));
        url
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn protocol(&self) -> Protocol {
        Protocol::GenerativeContent
    }

    fn default_model(&self) -> &str {
        "gemini-1.5-pro"
    }

    fn default_base_url(&self) -> &str {
        GEMINI_API_BASE
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::GENERATE | ProviderCapabilities::LIST_MODELS
    }

    async fn generate(
        &self,
        credential: &ResolvedCredential,
        prompt: &Prompt,
    ) -> Result<String, ProviderError> {
        let model = credential.model.trim_start_matches("models/");
        let path = format!("models/{}:generateContent", model);
        let url = Self::with_key(endpoint(&credential.base_url, &path)?, &credential.api_key);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.combined(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        // The URL carries the key, so only the model is logged
        tracing::debug!(provider = "gemini", model, "Sending generateContent request");

        let response = self.client.client().post(url).json(&request).send().await?;
        let response = check_status(response, "gemini").await?;

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;
        let content = candidate
            .content
            .ok_or_else(|| ProviderError::Parse("Candidate has no content".to_string()))?;

        Ok(content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn list_models(
        &self,
        credential: &ResolvedCredential,
    ) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = Self::with_key(endpoint(&credential.base_url, "models")?, &credential.api_key);
        let response = self.client.client().get(url).send().await?;
        let response = check_status(response, "gemini").await?;

        let body: GeminiModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse model list: {}", e)))?;

        let mut models: Vec<ModelInfo> = body
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .filter_map(|m| {
                let id = m.name.rsplit('/').next().unwrap_or_default().to_string();
                (!id.is_empty()).then(|| ModelInfo::new(id))
            })
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }
}

// ===== Gemini API Types =====

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
struct GeminiModel {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "supportedGenerationMethods")]
    supported_generation_methods: Vec<String>,
}
