//! Request-side models: the project profile, reference library and model
//! credential the browser sends with every generation action.

use serde::{Deserialize, Deserializer, Serialize};

/// Writing language chosen in the project profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingLanguage {
    /// Chinese (the primary language of the assistant)
    Zh,
    /// English
    En,
    /// Chinese prose with English terminology, or vice versa
    Mixed,
}

impl WritingLanguage {
    /// Parse a profile language tag. Unknown tags yield `None` so that
    /// script detection takes over.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "primary" => Some(Self::Zh),
            "en" | "en-us" | "secondary" => Some(Self::En),
            "mixed" | "mix" => Some(Self::Mixed),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for WritingLanguage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Self::parse(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown writing language: {}", tag)))
    }
}

/// Project profile filled in on the project page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProfile {
    /// Research field, e.g. "education technology"
    #[serde(default, deserialize_with = "lenient_string")]
    pub field: String,

    /// Research method(s), comma separated
    #[serde(default, deserialize_with = "lenient_string")]
    pub method: String,

    /// Keywords, comma separated
    #[serde(default, deserialize_with = "lenient_string")]
    pub keywords: String,

    /// Writing language; unknown tags are treated as unset
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Option<WritingLanguage>,

    /// Core research question
    #[serde(default, deserialize_with = "lenient_string")]
    pub research: String,

    /// Target audience or venue
    #[serde(default, deserialize_with = "lenient_string")]
    pub audience: String,
}

/// A reference document uploaded to the library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    /// File name as uploaded
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    /// Size in bytes
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: u64,

    /// Extracted text excerpt, when the file could be read
    #[serde(
        default,
        alias = "snippet",
        deserialize_with = "lenient_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,
}

impl ReferenceItem {
    /// Create a reference with a name and optional excerpt
    pub fn new(name: impl Into<String>, content: Option<String>) -> Self {
        let content = content.filter(|c| !c.is_empty());
        Self {
            name: name.into(),
            size: content.as_ref().map(|c| c.len() as u64).unwrap_or(0),
            content,
        }
    }
}

/// Model configuration supplied with each request.
///
/// The key is never persisted and never logged: `Debug` redacts it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCredential {
    /// Provider identifier (`gpt`, `deepseek`, `gemini`, or a custom id)
    #[serde(default, deserialize_with = "lenient_string")]
    pub provider: String,

    /// Model identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,

    /// Secret API key
    #[serde(default, rename = "apiKey", alias = "api_key", deserialize_with = "lenient_string")]
    pub api_key: String,

    /// API base URL
    #[serde(default, rename = "baseUrl", alias = "base_url", deserialize_with = "lenient_string")]
    pub base_url: String,
}

impl ModelCredential {
    /// Create a credential for a provider with a key
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for ModelCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("ModelCredential")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A single generation request as posted by the browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text input typed on the module page
    #[serde(default, deserialize_with = "lenient_string")]
    pub input: String,

    /// Draft text kept in the library
    #[serde(default, rename = "draftText", alias = "draft_text", deserialize_with = "lenient_string")]
    pub draft_text: String,

    /// Project profile snapshot
    #[serde(default, deserialize_with = "lenient_default")]
    pub project: ProjectProfile,

    /// Reference library, most recent first
    #[serde(default, deserialize_with = "lenient_references")]
    pub references: Vec<ReferenceItem>,

    /// Model configuration
    #[serde(default, deserialize_with = "lenient_default")]
    pub model: ModelCredential,
}

impl GenerationRequest {
    /// Create a request with only free-text input
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn project(mut self, project: ProjectProfile) -> Self {
        self.project = project;
        self
    }

    pub fn draft_text(mut self, draft_text: impl Into<String>) -> Self {
        self.draft_text = draft_text.into();
        self
    }

    pub fn references(mut self, references: Vec<ReferenceItem>) -> Self {
        self.references = references;
        self
    }

    pub fn model(mut self, model: ModelCredential) -> Self {
        self.model = model;
        self
    }
}

// The browser sends whatever local storage holds, so every field tolerates
// nulls and wrong JSON types instead of rejecting the whole request.

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_content<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_language<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<WritingLanguage>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(WritingLanguage::parse))
}

fn lenient_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_references<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ReferenceItem>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_browser_payload() {
        let json = r#"{
            "input": "adaptive learning",
            "draftText": "",
            "project": {"field": "education technology", "method": "", "keywords": "", "language": "en"},
            "references": [{"name": "a.txt", "size": 12, "snippet": "hello world"}],
            "model": {"provider": "gpt", "model": "gpt-5.1", "apiKey": "sk-test", "baseUrl": ""}
        }"#;

        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.input, "adaptive learning");
        assert_eq!(request.project.language, Some(WritingLanguage::En));
        assert_eq!(request.references.len(), 1);
        assert_eq!(request.references[0].content.as_deref(), Some("hello world"));
        assert_eq!(request.model.api_key, "sk-test");
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!(WritingLanguage::parse("secondary"), Some(WritingLanguage::En));
        assert_eq!(WritingLanguage::parse("primary"), Some(WritingLanguage::Zh));
        assert_eq!(WritingLanguage::parse("mix"), Some(WritingLanguage::Mixed));
        assert_eq!(WritingLanguage::parse("fr"), None);
    }

    #[test]
    fn test_tolerates_wrong_types() {
        let json = r#"{
            "input": null,
            "project": {"field": 42, "language": "klingon"},
            "references": "not a list",
            "model": []
        }"#;

        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.input, "");
        assert_eq!(request.project.field, "42");
        assert_eq!(request.project.language, None);
        assert!(request.references.is_empty());
        assert_eq!(request.model, ModelCredential::default());
    }

    #[test]
    fn test_reference_keeps_record_with_odd_size() {
        let json = r#"{"references": [
            {"name": "a.pdf", "size": null, "content": "Real extracted text"},
            {"name": "b.pdf", "size": 12.0, "content": "More text"},
            {"name": "c.pdf", "size": -1, "content": 7},
            {"name": "d.pdf", "size": "2048"}
        ]}"#;

        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.references.len(), 4);
        assert_eq!(request.references[0].size, 0);
        assert_eq!(request.references[0].content.as_deref(), Some("Real extracted text"));
        assert_eq!(request.references[1].size, 12);
        assert_eq!(request.references[1].content.as_deref(), Some("More text"));
        assert_eq!(request.references[2].size, 0);
        assert_eq!(request.references[2].content, None);
        assert_eq!(request.references[3].size, 2048);
        assert_eq!(request.references[3].name, "d.pdf");
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let credential = ModelCredential::new("gpt", "sk-very-secret");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
