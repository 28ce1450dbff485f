//! MCP server setup and lifecycle.
//!
//! Implements a line-delimited JSON-RPC 2.0 server over stdio. Stdout carries
//! protocol messages only; logs go to stderr.

use super::dispatch::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, McpMethod, PARSE_ERROR,
};
use super::tools::ToolRegistry;
use crate::services::KnowledgeService;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::Instrument;

/// MCP protocol version.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
const SERVER_NAME: &str = "hindsight";

/// Maximum accepted request line, in bytes.
const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// MCP server for hindsight.
#[derive(Debug, Clone)]
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    /// Creates a server exposing the knowledge tools.
    #[must_use]
    pub fn new(service: KnowledgeService) -> Self {
        Self {
            tools: ToolRegistry::new(service),
        }
    }

    /// Serves requests on stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn run_stdio(&self) -> Result<()> {
        tracing::info!(server = SERVER_NAME, "Starting MCP server on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serves line-delimited requests from `reader`, writing one response
    /// line per request to `writer`.
    ///
    /// A line is read at most [`MAX_REQUEST_BODY_SIZE`] bytes at a time; an
    /// oversized line is skipped and answered with an error, as is a line
    /// that is not valid UTF-8. Only I/O failures end the loop.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = (&mut reader)
                .take(MAX_REQUEST_BODY_SIZE as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| Error::operation("read_stdin", e))?;
            if read == 0 {
                break;
            }

            let response = if buf.len() > MAX_REQUEST_BODY_SIZE && !buf.ends_with(b"\n") {
                skip_rest_of_line(&mut reader)
                    .await
                    .map_err(|e| Error::operation("read_stdin", e))?;
                tracing::warn!(
                    max_size = MAX_REQUEST_BODY_SIZE,
                    "Request exceeds maximum size limit"
                );
                Some(format_error(
                    None,
                    INVALID_REQUEST,
                    &format!("Request too large (max: {MAX_REQUEST_BODY_SIZE} bytes)"),
                ))
            } else {
                match std::str::from_utf8(trim_line_ending(&buf)) {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => self.handle_request(line).await,
                    Err(e) => {
                        tracing::debug!(error = %e, "Request is not valid UTF-8");
                        record_request("parse_error", "error", Instant::now());
                        Some(format_error(None, PARSE_ERROR, &format!("Parse error: {e}")))
                    },
                }
            };

            if let Some(response) = response {
                write_line(&mut writer, &response).await?;
            }
        }

        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handles one JSON-RPC message.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_request(&self, request: &str) -> Option<String> {
        if request.len() > MAX_REQUEST_BODY_SIZE {
            tracing::warn!(
                request_size = request.len(),
                max_size = MAX_REQUEST_BODY_SIZE,
                "Request exceeds maximum size limit"
            );
            return Some(format_error(
                None,
                INVALID_REQUEST,
                &format!(
                    "Request too large: {} bytes (max: {MAX_REQUEST_BODY_SIZE} bytes)",
                    request.len()
                ),
            ));
        }

        let value: Value = match serde_json::from_str(request) {
            Ok(value) => value,
            Err(e) => {
                record_request("parse_error", "error", Instant::now());
                return Some(format_error(None, PARSE_ERROR, &format!("Parse error: {e}")));
            },
        };
        let req = match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) if req.jsonrpc == "2.0" => req,
            Ok(_) => {
                return Some(format_error(None, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
            },
            Err(e) => {
                return Some(format_error(None, INVALID_REQUEST, &format!("Invalid request: {e}")));
            },
        };

        let start = Instant::now();
        let span = tracing::info_span!(
            "mcp.request",
            rpc.method = %req.method,
            rpc.id = tracing::field::Empty,
        );
        if let Some(id) = &req.id {
            span.record("rpc.id", tracing::field::display(id));
        }

        let Some(id) = req.id else {
            tracing::debug!(method = %req.method, "Notification received");
            return None;
        };

        let result = self
            .dispatch_method(&req.method, req.params)
            .instrument(span)
            .await;
        record_request(
            &req.method,
            if result.is_ok() { "success" } else { "error" },
            start,
        );
        Some(format_response(Some(id), result))
    }

    async fn dispatch_method(&self, method: &str, params: Option<Value>) -> DispatchResult {
        match McpMethod::from(method) {
            McpMethod::Initialize => Ok(handle_initialize()),
            McpMethod::ListTools => Ok(self.handle_list_tools()),
            McpMethod::CallTool => self.handle_call_tool(params).await,
            McpMethod::Ping => Ok(serde_json::json!({})),
            McpMethod::Unknown(name) => Err((METHOD_NOT_FOUND, format!("Method not found: {name}"))),
        }
    }

    fn handle_list_tools(&self) -> Value {
        serde_json::json!({ "tools": self.tools.list_tools() })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or((INVALID_PARAMS, "Missing params".to_string()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or((INVALID_PARAMS, "Missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let start = Instant::now();
        let result = self
            .tools
            .execute(name, arguments)
            .instrument(tracing::info_span!("mcp.tool.call", tool.name = name))
            .await;

        let status = if result.is_error { "error" } else { "success" };
        metrics::counter!("mcp_tool_calls_total", "tool" => name.to_string(), "status" => status)
            .increment(1);
        metrics::histogram!("mcp_tool_duration_ms", "tool" => name.to_string())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        serde_json::to_value(&result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }
}

/// Discards input up to and including the next newline, or to EOF.
async fn skip_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, response: &str) -> Result<()> {
    writer
        .write_all(response.as_bytes())
        .await
        .map_err(|e| Error::operation("write_stdout", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| Error::operation("write_stdout", e))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::operation("flush_stdout", e))
}

fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn record_request(method: &str, status: &'static str, start: Instant) {
    metrics::counter!("mcp_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    metrics::histogram!("mcp_request_duration_ms", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64() * 1000.0);
}

fn format_response(id: Option<Value>, result: DispatchResult) -> String {
    match result {
        Ok(value) => {
            let response = JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(value),
                error: None,
            };
            serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
        },
        Err((code, message)) => format_error(id, code, &message),
    }
}

fn format_error(id: Option<Value>, code: i32, message: &str) -> String {
    let response = JsonRpcResponse {
        jsonrpc: "2.0",
        id: Some(id.unwrap_or(Value::Null)),
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
        }),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}

/// Result type for method dispatch.
type DispatchResult = std::result::Result<Value, (i32, String)>;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}
