//! # Dissertation Assistant
//!
//! Model-request orchestration for a dissertation writing aid: title
//! suggestions, outlines, draft paragraphs, polishing, literature search
//! and citation suggestions, each answered by a large-language-model
//! provider or by deterministic templates.
//!
//! ## Architecture
//!
//! - [`models`]: Request and result data structures
//! - [`context`]: Derives the generation context from a request
//! - [`prompt`]: Composes module prompts
//! - [`providers`]: Provider adapters with an extensible trait-based architecture
//! - [`normalize`]: Turns free-form model output into canonical results
//! - [`fallback`]: Template results used when no model answer is available
//! - [`dispatch`]: Runs a request through the stages under a failure policy
//! - [`api`]: JSON HTTP API for the browser front end
//! - [`mcp`]: MCP protocol implementation and server
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod providers;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use dispatch::{Dispatcher, FailurePolicy};
pub use error::{ErrorKind, GenerationError, StructuredError};
pub use models::{CanonicalResult, GenerationRequest, ModelCredential, Module};
pub use providers::{Provider, ProviderRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
