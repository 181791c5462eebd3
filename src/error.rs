//! Generation failures and their user-facing form.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderError;

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Credential missing or incomplete
    Configuration,
    /// Required contextual input missing
    Precondition,
    /// Network failure, non-2xx status or timeout
    Transport,
    /// Provider output unusable for the module
    Format,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Transport => "transport",
            ErrorKind::Format => "format",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can go wrong on the provider path of a generation request
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No API key or no model id
    #[error("Model credential incomplete: {0}")]
    Configuration(String),

    /// No extracted reference text to ground the request in
    #[error("No reference text available")]
    MissingReferenceText,

    /// The prompt could not be composed for the module
    #[error("Prompt could not be composed for module '{0}'")]
    PromptUnavailable(String),

    /// The provider call failed
    #[error("Provider call failed: {0}")]
    Transport(#[from] ProviderError),

    /// The provider answered but nothing usable could be extracted
    #[error("Provider returned unusable output for module '{0}'")]
    Unusable(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Configuration(_) => ErrorKind::Configuration,
            GenerationError::MissingReferenceText => ErrorKind::Precondition,
            GenerationError::Transport(_) => ErrorKind::Transport,
            GenerationError::PromptUnavailable(_) | GenerationError::Unusable(_) => {
                ErrorKind::Format
            }
        }
    }

    /// Convert into the message shown to the user, in the request's language
    pub fn localize(&self, zh: bool) -> StructuredError {
        let (zh_message, en_message) = match self {
            GenerationError::Configuration(_) => (
                "请先在首页配置 API Key 与模型 ID。",
                "Please configure the API key and model ID on the home page.",
            ),
            GenerationError::MissingReferenceText => (
                "未检测到参考论文文本，请在资料库上传并完成文本提取。",
                "No reference text detected. Upload and extract reference papers in the Library.",
            ),
            GenerationError::PromptUnavailable(_) => {
                ("提示词生成失败。", "Failed to build the prompt.")
            }
            GenerationError::Transport(_) => (
                "模型调用失败，请检查 API Key。",
                "Model call failed. Check your API key.",
            ),
            GenerationError::Unusable(_) => {
                ("模型返回格式不正确。", "The model returned invalid JSON.")
            }
        };

        StructuredError {
            message: if zh { zh_message } else { en_message }.to_string(),
            kind: self.kind(),
        }
    }
}

/// The error object returned to the caller instead of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct StructuredError {
    #[serde(rename = "error")]
    pub message: String,

    pub kind: ErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kinds() {
        assert_eq!(
            GenerationError::Configuration("no key".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            GenerationError::MissingReferenceText.kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            GenerationError::Transport(ProviderError::Timeout).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            GenerationError::Unusable("topic".into()).kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn test_localized_wire_shape() {
        let error = GenerationError::MissingReferenceText.localize(false);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "error": "No reference text detected. Upload and extract reference papers in the Library.",
                "kind": "precondition"
            })
        );

        let zh = GenerationError::Transport(ProviderError::Timeout).localize(true);
        assert_eq!(zh.message, "模型调用失败，请检查 API Key。");
    }
}
