//! MCP tool implementations.
//!
//! # Module Structure
//!
//! - [`definitions`]: tool schema definitions (JSON Schema for input validation)
//! - [`handlers`]: tool execution logic
//!
//! Every call produces exactly one text content item holding JSON: the
//! success payload, or `{"error": "..."}` with `isError` set.

mod definitions;
mod handlers;

use crate::Error;
use crate::services::KnowledgeService;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry of MCP tools bound to a knowledge service.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    service: KnowledgeService,
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Creates a registry with every hindsight tool.
    #[must_use]
    pub fn new(service: KnowledgeService) -> Self {
        Self {
            service,
            tools: definitions::all(),
        }
    }

    /// Returns all tool definitions, in listing order.
    #[must_use]
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Executes a tool with the given arguments.
    ///
    /// Failures, including unknown tool names, come back as error results
    /// rather than `Err`.
    pub async fn execute(&self, name: &str, arguments: Value) -> ToolResult {
        let service = &self.service;
        let outcome = match name {
            "query_knowledge" => handlers::execute_query_knowledge(service, arguments).await,
            "search_errors" => handlers::execute_search_errors(service, arguments).await,
            "get_swift_patterns" => handlers::execute_get_swift_patterns(service, arguments).await,
            "list_technologies" => handlers::execute_list_technologies(service, arguments).await,
            "list_tags" => handlers::execute_list_tags(service, arguments).await,
            "get_statistics" => handlers::execute_get_statistics(service, arguments).await,
            "export_knowledge" => handlers::execute_export_knowledge(service, arguments).await,
            "add_lesson" => handlers::execute_add_lesson(service, arguments).await,
            "add_common_error" => handlers::execute_add_common_error(service, arguments).await,
            "add_swift_pattern" => handlers::execute_add_swift_pattern(service, arguments).await,
            "add_session_context" => {
                handlers::execute_add_session_context(service, arguments).await
            },
            "update_lesson" => handlers::execute_update_lesson(service, arguments).await,
            "increment_error_count" => {
                handlers::execute_increment_error_count(service, arguments).await
            },
            _ => Err(Error::InvalidInput(format!("Unknown tool: {name}"))),
        };

        match outcome {
            Ok(payload) => ToolResult::json(&payload),
            Err(err) => {
                match &err {
                    Error::OperationFailed { .. } => {
                        tracing::error!(tool = name, error = %err, "Tool call failed");
                    },
                    Error::InvalidInput(_) | Error::NotFound { .. } => {
                        tracing::debug!(tool = name, error = %err, "Tool call rejected");
                    },
                }
                ToolResult::error(&err)
            },
        }
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    /// Wraps a success payload as pretty-printed JSON text.
    #[must_use]
    pub fn json(payload: &Value) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: pretty(payload),
            }],
            is_error: false,
        }
    }

    /// Wraps an error as `{"error": "..."}`.
    #[must_use]
    pub fn error(err: &Error) -> Self {
        let message = match err {
            Error::InvalidInput(message) => message.clone(),
            other => other.to_string(),
        };
        Self {
            content: vec![ToolContent::Text {
                text: pretty(&serde_json::json!({ "error": message })),
            }],
            is_error: true,
        }
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(|ToolContent::Text { text }| text.as_str())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}
