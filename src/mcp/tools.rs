//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::dispatch::Dispatcher;
use crate::models::{GenerationRequest, ModelCredential, Module};

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "generate_topic")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Runs one module through the dispatcher
#[derive(Debug)]
pub struct GenerateHandler {
    pub dispatcher: Arc<Dispatcher>,
    pub module: Module,
}

#[async_trait::async_trait]
impl ToolHandler for GenerateHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let request: GenerationRequest = if args.is_null() {
            GenerationRequest::default()
        } else {
            serde_json::from_value(args).map_err(|e| format!("Invalid request: {}", e))?
        };

        let value = match self.dispatcher.generate(self.module, &request).await {
            Ok(result) => serde_json::to_value(result),
            Err(err) => serde_json::to_value(err),
        };
        value.map_err(|e| e.to_string())
    }
}

/// Lists the models available to a credential
#[derive(Debug)]
pub struct ListModelsHandler {
    pub dispatcher: Arc<Dispatcher>,
}

#[async_trait::async_trait]
impl ToolHandler for ListModelsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let credential: ModelCredential = if args.is_null() {
            ModelCredential::default()
        } else {
            serde_json::from_value(args).map_err(|e| format!("Invalid credential: {}", e))?
        };
        let listing = self.dispatcher.list_models(&credential).await;
        serde_json::to_value(listing).map_err(|e| e.to_string())
    }
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with one tool per module plus `list_models`
    pub fn from_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        for module in Module::ALL {
            let (name, description) = tool_info(module);
            registry.register(Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema: request_schema(),
                handler: Arc::new(GenerateHandler {
                    dispatcher: dispatcher.clone(),
                    module,
                }),
            });
        }

        registry.register(Tool {
            name: "list_models".to_string(),
            description: "List the models a provider offers for an API key.".to_string(),
            input_schema: credential_schema(),
            handler: Arc::new(ListModelsHandler { dispatcher }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}

fn tool_info(module: Module) -> (&'static str, &'static str) {
    match module {
        Module::Topic => (
            "generate_topic",
            "Suggest dissertation titles for the project.",
        ),
        Module::Outline => (
            "generate_outline",
            "Draft a chapter outline with the argument's logic chain.",
        ),
        Module::Draft => (
            "generate_draft",
            "Write draft paragraphs grounded in the reference excerpts.",
        ),
        Module::Polish => (
            "polish_text",
            "Polish a paragraph for academic tone and flow.",
        ),
        Module::Search => (
            "search_references",
            "Suggest literature records (title, year, source) for the project.",
        ),
        Module::Citations => (
            "suggest_citations",
            "Suggest where and what to cite from the reference library.",
        ),
    }
}

fn credential_properties() -> Value {
    json!({
        "provider": {
            "type": "string",
            "description": "Provider id: 'gpt', 'deepseek', 'gemini' or any chat-completions compatible id"
        },
        "model": {
            "type": "string",
            "description": "Model id (provider default when empty)"
        },
        "apiKey": {
            "type": "string",
            "description": "Provider API key"
        },
        "baseUrl": {
            "type": "string",
            "description": "API base URL (provider default when empty)"
        }
    })
}

fn credential_schema() -> Value {
    json!({
        "type": "object",
        "properties": credential_properties(),
        "required": ["apiKey"]
    })
}

fn request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "input": {
                "type": "string",
                "description": "Text typed for this module (topic idea, paragraph to polish, ...)"
            },
            "draftText": {
                "type": "string",
                "description": "Current draft text"
            },
            "project": {
                "type": "object",
                "description": "Project profile",
                "properties": {
                    "field": {"type": "string"},
                    "method": {"type": "string"},
                    "keywords": {"type": "string", "description": "Comma separated keywords"},
                    "language": {"type": "string", "enum": ["zh", "en", "mixed"]},
                    "research": {"type": "string", "description": "Core research question"},
                    "audience": {"type": "string"}
                }
            },
            "references": {
                "type": "array",
                "description": "Reference library with extracted text",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "size": {"type": "integer"},
                        "content": {"type": "string"}
                    }
                }
            },
            "model": {
                "type": "object",
                "description": "Model credential; fallback templates are used when absent",
                "properties": credential_properties()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FailurePolicy;
    use crate::providers::{GenerationSettings, ProviderRegistry};
    use crate::utils::HttpClient;

    fn registry() -> ToolRegistry {
        let providers = ProviderRegistry::new(
            GenerationSettings::default(),
            Arc::new(HttpClient::new().unwrap()),
        );
        let dispatcher = Dispatcher::new(Arc::new(providers), FailurePolicy::Lenient);
        ToolRegistry::from_dispatcher(Arc::new(dispatcher))
    }

    #[test]
    fn test_tool_names() {
        let registry = registry();
        let names: Vec<&str> = registry.all().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "generate_draft",
                "generate_outline",
                "generate_topic",
                "list_models",
                "polish_text",
                "search_references",
                "suggest_citations",
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_tool_without_credential() {
        let result = registry()
            .execute("polish_text", json!({"input": "Rough paragraph."}))
            .await
            .unwrap();
        assert_eq!(
            result["polished"],
            "Polished draft: Rough paragraph. (terminology aligned, flow improved, academic tone enhanced)"
        );
    }

    #[tokio::test]
    async fn test_list_models_tool_without_key() {
        let result = registry()
            .execute("list_models", json!({"provider": "gemini"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"models": [], "error": "Missing API key"}));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry().execute("read_paper", json!({})).await.unwrap_err();
        assert!(err.contains("not found"));
    }
}
