//! MCP (Model Context Protocol) surface: one tool per generation module.

pub mod server;
mod tools;

pub use server::McpServer;
pub use tools::{GenerateHandler, ListModelsHandler, Tool, ToolHandler, ToolRegistry};
