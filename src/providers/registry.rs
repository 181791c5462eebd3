//! Registry for managing model providers.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ChatCompletionProvider, GeminiProvider, GenerationSettings, Provider, ResolvedCredential};
use crate::models::ModelCredential;
use crate::utils::HttpClient;

/// Provider id used when a credential names none
pub const DEFAULT_PROVIDER: &str = "gpt";

bitflags::bitflags! {
    /// Capabilities that a provider can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCapabilities: u32 {
        const GENERATE = 1 << 0;
        const LIST_MODELS = 1 << 1;
        const SYSTEM_ROLE = 1 << 2;
    }
}

/// Registry for all available providers
///
/// Maps normalized provider ids to adapters and turns caller credentials
/// into [`ResolvedCredential`]s with the provider's defaults applied.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    settings: GenerationSettings,
    client: Arc<HttpClient>,
}

impl ProviderRegistry {
    /// Create a registry with the built-in providers
    pub fn new(settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        let mut registry = Self::empty(settings, client.clone());

        registry.register(Arc::new(ChatCompletionProvider::openai(settings, client.clone())));
        registry.register(Arc::new(ChatCompletionProvider::deepseek(settings, client.clone())));
        registry.register(Arc::new(GeminiProvider::new(settings, client)));

        registry
    }

    /// Create a registry with no providers registered
    pub fn empty(settings: GenerationSettings, client: Arc<HttpClient>) -> Self {
        Self {
            providers: HashMap::new(),
            settings,
            client,
        }
    }

    /// Register a provider, replacing any with the same id
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    /// Get a provider by normalized id
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(id)
    }

    /// Check if a provider exists
    pub fn has(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Get all registered providers, sorted by id
    pub fn all(&self) -> Vec<&Arc<dyn Provider>> {
        let mut providers: Vec<_> = self.providers.values().collect();
        providers.sort_by(|a, b| a.id().cmp(b.id()));
        providers
    }

    /// Get providers that support a specific capability
    pub fn with_capability(&self, capability: ProviderCapabilities) -> Vec<&Arc<dyn Provider>> {
        self.all()
            .into_iter()
            .filter(|p| p.capabilities().contains(capability))
            .collect()
    }

    /// Sampling parameters shared by the providers
    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Get the number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Pick the adapter for a credential and fill in defaults
    ///
    /// Provider ids are matched case-insensitively; an empty id selects
    /// `gpt` and `openai` is an alias for it. An unknown id gets a
    /// chat-completions adapter under that id.
    pub fn resolve(&self, credential: &ModelCredential) -> (Arc<dyn Provider>, ResolvedCredential) {
        let id = normalize_id(&credential.provider);

        let provider = match self.providers.get(&id) {
            Some(provider) => provider.clone(),
            None => {
                tracing::debug!(provider = %id, "Unknown provider id, using chat-completions protocol");
                Arc::new(ChatCompletionProvider::custom(
                    &id,
                    self.settings,
                    self.client.clone(),
                )) as Arc<dyn Provider>
            }
        };

        let model = non_blank(&credential.model).unwrap_or_else(|| provider.default_model().to_string());
        let base_url =
            non_blank(&credential.base_url).unwrap_or_else(|| provider.default_base_url().to_string());

        let resolved = ResolvedCredential {
            provider: id,
            model,
            api_key: credential.api_key.trim().to_string(),
            base_url,
        };
        (provider, resolved)
    }
}

/// Lower-cased, trimmed provider id with aliases applied
pub fn normalize_id(provider: &str) -> String {
    let id = provider.trim().to_lowercase();
    match id.as_str() {
        "" | "openai" => DEFAULT_PROVIDER.to_string(),
        _ => id,
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Protocol;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(
            GenerationSettings::default(),
            Arc::new(HttpClient::new().unwrap()),
        )
    }

    #[test]
    fn test_registry_basic() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());

        for id in ["gpt", "deepseek", "gemini"] {
            assert!(registry.has(id), "Provider '{}' should be registered", id);
        }
        assert!(registry.get("nonexistent").is_none());

        let ids: Vec<&str> = registry.all().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["deepseek", "gemini", "gpt"]);
    }

    #[test]
    fn test_capabilities() {
        let registry = registry();
        let system_role = registry.with_capability(ProviderCapabilities::SYSTEM_ROLE);
        assert_eq!(system_role.len(), 2);
        assert!(registry.all().iter().all(|p| p.supports_model_listing()));
    }

    #[test]
    fn test_resolve_presets() {
        let registry = registry();

        let (provider, resolved) = registry.resolve(&ModelCredential::new("", "sk"));
        assert_eq!(provider.id(), "gpt");
        assert_eq!(resolved.model, "gpt-5.1");
        assert_eq!(resolved.base_url, "https://api.openai.com/v1");

        let (provider, resolved) = registry.resolve(&ModelCredential::new("DeepSeek", "sk"));
        assert_eq!(provider.id(), "deepseek");
        assert_eq!(resolved.provider, "deepseek");
        assert_eq!(resolved.model, "deepseek-chat");
        assert_eq!(resolved.base_url, "https://api.deepseek.com/v1");

        let (provider, resolved) = registry.resolve(&ModelCredential::new("gemini", "g"));
        assert_eq!(provider.protocol(), Protocol::GenerativeContent);
        assert_eq!(resolved.model, "gemini-1.5-pro");
        assert_eq!(
            resolved.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );

        let (provider, _) = registry.resolve(&ModelCredential::new(" OpenAI ", "sk"));
        assert_eq!(provider.id(), "gpt");
    }

    #[test]
    fn test_resolve_keeps_caller_values() {
        let registry = registry();
        let credential = ModelCredential::new("gpt", " sk-test ")
            .model("gpt-4o")
            .base_url("http://localhost:8080/v1");
        let (_, resolved) = registry.resolve(&credential);
        assert_eq!(resolved.model, "gpt-4o");
        assert_eq!(resolved.base_url, "http://localhost:8080/v1");
        assert_eq!(resolved.api_key, "sk-test");
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let registry = registry();
        let credential = ModelCredential::new("Qwen", "sk").model("qwen-max");
        let (provider, resolved) = registry.resolve(&credential);
        assert_eq!(provider.id(), "qwen");
        assert_eq!(provider.protocol(), Protocol::ChatCompletion);
        assert_eq!(resolved.model, "qwen-max");
        assert_eq!(resolved.base_url, "https://api.openai.com/v1");
        assert!(!registry.has("qwen"));
    }
}
