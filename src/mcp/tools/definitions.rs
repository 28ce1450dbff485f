//! Tool definitions for MCP tools.
//!
//! Contains the JSON Schema definitions for all hindsight tools.

use super::ToolDefinition;
use serde_json::json;

const LIMIT_DESCRIPTION: &str = "Maximum number of results (default: 10, max: 100)";
const LESSON_CATEGORIES: [&str; 4] = ["pattern", "practice", "gotcha", "decision"];
const SEARCH_CATEGORIES: [&str; 4] = ["lesson", "error", "pattern", "all"];

/// Returns every tool, in listing order.
pub fn all() -> Vec<ToolDefinition> {
    vec![
        query_knowledge_tool(),
        add_lesson_tool(),
        search_errors_tool(),
        get_swift_patterns_tool(),
        list_technologies_tool(),
        list_tags_tool(),
        add_common_error_tool(),
        add_swift_pattern_tool(),
        add_session_context_tool(),
        update_lesson_tool(),
        increment_error_count_tool(),
        get_statistics_tool(),
        export_knowledge_tool(),
    ]
}

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_arguments() -> serde_json::Value {
    json!({ "type": "object", "properties": {} })
}

/// Defines the cross-category search tool.
pub fn query_knowledge_tool() -> ToolDefinition {
    tool(
        "query_knowledge",
        "Search the knowledge base for relevant learnings, errors, and patterns. \
         Use this to find solutions to problems, best practices, and coding patterns.",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search terms to find relevant knowledge" },
                "category": {
                    "type": "string",
                    "enum": SEARCH_CATEGORIES,
                    "description": "Filter by category: lesson, error, pattern, or all",
                    "default": "all"
                },
                "technology": {
                    "type": "string",
                    "description": "Filter by technology (e.g., swift, xcode, bitbucket)"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Filter lessons by tags (any match)"
                },
                "limit": { "type": "integer", "description": LIMIT_DESCRIPTION, "default": 10 }
            },
            "required": ["query"]
        }),
    )
}

/// Defines the lesson insert tool.
pub fn add_lesson_tool() -> ToolDefinition {
    tool(
        "add_lesson",
        "Add a new lesson or learning to the knowledge base. \
         Use this to record insights, patterns, practices, gotchas, or decisions.",
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Brief title for the lesson" },
                "content": { "type": "string", "description": "Detailed description of the lesson or learning" },
                "category": {
                    "type": "string",
                    "enum": LESSON_CATEGORIES,
                    "description": "Category: pattern (code pattern), practice (best practice), gotcha (common pitfall), decision (architectural decision)"
                },
                "technology": { "type": "string", "description": "Technology this applies to (e.g., swift, xcode, bitbucket)" },
                "tags": { "type": "array", "items": { "type": "string" }, "description": "Tags for categorization" },
                "project_context": { "type": "string", "description": "Optional project this lesson came from" },
                "source_session": { "type": "string", "description": "Optional path to the session log where this was learned" }
            },
            "required": ["title", "content", "category"]
        }),
    )
}

/// Defines the error search tool.
pub fn search_errors_tool() -> ToolDefinition {
    tool(
        "search_errors",
        "Search for common errors and their solutions. \
         Use this to find fixes for error messages or known issues.",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Error message or description to search for" },
                "technology": { "type": "string", "description": "Filter by technology (e.g., swift, xcode, python)" },
                "limit": { "type": "integer", "description": LIMIT_DESCRIPTION, "default": 10 }
            }
        }),
    )
}

/// Defines the pattern search tool.
pub fn get_swift_patterns_tool() -> ToolDefinition {
    tool(
        "get_swift_patterns",
        "Retrieve Swift coding patterns with code examples. \
         Use this to find idiomatic Swift patterns for common tasks.",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Pattern name or description to search for" },
                "ios_version": { "type": "string", "description": "Only patterns available on this iOS version (e.g., '17.0')" },
                "swift_version": { "type": "string", "description": "Only patterns available on this Swift version (e.g., '5.9')" },
                "limit": { "type": "integer", "description": LIMIT_DESCRIPTION, "default": 10 }
            }
        }),
    )
}

/// Defines the technology listing tool.
pub fn list_technologies_tool() -> ToolDefinition {
    tool(
        "list_technologies",
        "List all technologies in the knowledge base with entry counts. \
         Use this to see what technologies have documented knowledge.",
        no_arguments(),
    )
}

/// Defines the tag listing tool.
pub fn list_tags_tool() -> ToolDefinition {
    tool(
        "list_tags",
        "List all tags in the knowledge base with usage counts. \
         Use this to browse available categories and find related lessons.",
        no_arguments(),
    )
}

/// Defines the error insert tool.
pub fn add_common_error_tool() -> ToolDefinition {
    tool(
        "add_common_error",
        "Add a common error and its solution to the knowledge base. \
         Use this to record error patterns you've encountered and how to fix them.",
        json!({
            "type": "object",
            "properties": {
                "technology": { "type": "string", "description": "Technology this error applies to (e.g., swift, xcode, python)" },
                "error_pattern": { "type": "string", "description": "The error message or pattern to match" },
                "solution": { "type": "string", "description": "How to fix this error" },
                "root_cause": { "type": "string", "description": "What causes this error (optional)" },
                "code_example": { "type": "string", "description": "Code example showing the fix (optional)" }
            },
            "required": ["technology", "error_pattern", "solution"]
        }),
    )
}

/// Defines the pattern insert tool.
pub fn add_swift_pattern_tool() -> ToolDefinition {
    tool(
        "add_swift_pattern",
        "Add a Swift coding pattern to the knowledge base. \
         Use this to record reusable Swift patterns with code examples.",
        json!({
            "type": "object",
            "properties": {
                "pattern_name": { "type": "string", "description": "Name of the pattern" },
                "description": { "type": "string", "description": "What this pattern does" },
                "code_example": { "type": "string", "description": "Code example demonstrating the pattern" },
                "when_to_use": { "type": "string", "description": "When to use this pattern (optional)" },
                "when_not_to_use": { "type": "string", "description": "When NOT to use this pattern (optional)" },
                "related_apis": { "type": "array", "items": { "type": "string" }, "description": "Related API names (optional)" },
                "ios_version": { "type": "string", "description": "Minimum iOS version required (e.g., '17.0')" },
                "swift_version": { "type": "string", "description": "Minimum Swift version required (e.g., '5.9')" }
            },
            "required": ["pattern_name", "description", "code_example"]
        }),
    )
}

/// Defines the session insert tool.
pub fn add_session_context_tool() -> ToolDefinition {
    tool(
        "add_session_context",
        "Add a development session context to the knowledge base. \
         Use this to record session metadata and link to session logs.",
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "description": "Session date in YYYY-MM-DD format" },
                "project_name": { "type": "string", "description": "Name of the project (optional)" },
                "session_log_path": { "type": "string", "description": "Path to the session log file (optional)" },
                "summary": { "type": "string", "description": "Brief summary of what was accomplished (optional)" }
            },
            "required": ["date"]
        }),
    )
}

/// Defines the lesson update tool.
pub fn update_lesson_tool() -> ToolDefinition {
    tool(
        "update_lesson",
        "Update an existing lesson in the knowledge base. \
         Use this to modify lesson content, tags, or metadata.",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer", "description": "Lesson ID to update" },
                "title": { "type": "string", "description": "New title (optional)" },
                "content": { "type": "string", "description": "New content (optional)" },
                "category": { "type": "string", "enum": LESSON_CATEGORIES, "description": "New category (optional)" },
                "technology": { "type": ["string", "null"], "description": "New technology, or null to clear (optional)" },
                "tags": { "type": "array", "items": { "type": "string" }, "description": "New tags - replaces existing tags (optional)" },
                "project_context": { "type": ["string", "null"], "description": "New project context, or null to clear (optional)" }
            },
            "required": ["id"]
        }),
    )
}

/// Defines the occurrence counter tool.
pub fn increment_error_count_tool() -> ToolDefinition {
    tool(
        "increment_error_count",
        "Increment the occurrence count for a common error. \
         Use this when you encounter a known error again.",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer", "description": "Error ID to increment" }
            },
            "required": ["id"]
        }),
    )
}

/// Defines the statistics tool.
pub fn get_statistics_tool() -> ToolDefinition {
    tool(
        "get_statistics",
        "Get dashboard-style statistics about the knowledge base. \
         Use this to see an overview of stored knowledge.",
        no_arguments(),
    )
}

/// Defines the export tool.
pub fn export_knowledge_tool() -> ToolDefinition {
    tool(
        "export_knowledge",
        "Export knowledge base entries as JSON. \
         Use this to backup or transfer knowledge data.",
        json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "enum": SEARCH_CATEGORIES, "description": "Filter by category (default: all)" },
                "technology": { "type": "string", "description": "Filter lessons and errors by technology (optional)" },
                "include_sessions": { "type": "boolean", "description": "Include session data (default: false)" }
            }
        }),
    )
}
