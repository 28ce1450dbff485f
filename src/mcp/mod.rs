//! MCP server implementation.
//!
//! Exposes the knowledge service as Model Context Protocol tools over a
//! line-delimited JSON-RPC 2.0 stdio transport.
//!
//! ## Tools
//!
//! `query_knowledge`, `search_errors`, `get_swift_patterns`,
//! `list_technologies`, `list_tags`, `add_lesson`, `add_common_error`,
//! `add_swift_pattern`, `add_session_context`, `update_lesson`,
//! `increment_error_count`, `get_statistics`, `export_knowledge`
//!
//! ## Client Configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "hindsight": {
//!       "command": "hindsight",
//!       "args": ["serve"]
//!     }
//!   }
//! }
//! ```

mod dispatch;
mod server;
mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use server::McpServer;
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
