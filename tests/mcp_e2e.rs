//! MCP server end-to-end tests.
//!
//! Drives the JSON-RPC server the way a client would: newline-delimited
//! requests in, one response line per request out, against a throwaway
//! database.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::too_many_lines
)]

use hindsight::config::{DatabaseConfig, SearchConfig};
use hindsight::mcp::McpServer;
use hindsight::{KnowledgeService, KnowledgeStore};
use serde_json::{Value, json};
use tempfile::TempDir;

fn server() -> (TempDir, McpServer) {
    let dir = TempDir::new().unwrap();
    let store = KnowledgeStore::open(&DatabaseConfig::at(dir.path().join("k.db"))).unwrap();
    (
        dir,
        McpServer::new(KnowledgeService::new(store, SearchConfig::default())),
    )
}

/// Calls a tool and returns `(is_error, parsed payload)`.
async fn call_tool(server: &McpServer, id: i64, name: &str, arguments: Value) -> (bool, Value) {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    });
    let response = server.handle_request(&request.to_string()).await.unwrap();
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["id"], id, "response id mismatch: {response}");

    let result = &response["result"];
    let content = result["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    let payload = serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
    (result["isError"].as_bool().unwrap_or(false), payload)
}

mod protocol {
    use super::*;

    #[tokio::test]
    async fn test_stdio_session() {
        let (_dir, server) = server();
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "get_statistics", "arguments": {}}}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "hindsight");

        let names: Vec<&str> = responses[1]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "query_knowledge",
                "add_lesson",
                "search_errors",
                "get_swift_patterns",
                "list_technologies",
                "list_tags",
                "add_common_error",
                "add_swift_pattern",
                "add_session_context",
                "update_lesson",
                "increment_error_count",
                "get_statistics",
                "export_knowledge",
            ]
        );
        assert_eq!(responses[2]["id"], 3);
    }

    fn read_responses(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_server() {
        let (_dir, server) = server();
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n{\"jsonrpc\":\"2.0\",\xff\xfe}\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        server.serve(&input[..], &mut output).await.unwrap();

        let responses = read_responses(output);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], -32700);
        assert_eq!(responses[2]["id"], 2);
        assert_eq!(responses[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped() {
        let (_dir, server) = server();
        let mut input = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{}"}}}}"#,
            "x".repeat(2 * 1024 * 1024)
        )
        .into_bytes();
        input.push(b'\n');
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        server.serve(&input[..], &mut output).await.unwrap();

        let responses = read_responses(output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_invalid_version_field() {
        let (_dir, server) = server();
        let response = server
            .handle_request(r#"{"jsonrpc":"1.0","id":9,"method":"ping"}"#)
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_oversized_request_rejected() {
        let (_dir, server) = server();
        let huge = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{}"}}}}"#,
            "x".repeat(1024 * 1024)
        );
        let response: Value =
            serde_json::from_str(&server.handle_request(&huge).await.unwrap()).unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }
}

mod tools {
    use super::*;

    #[tokio::test]
    async fn test_lesson_workflow() {
        let (_dir, server) = server();

        let (is_error, added) = call_tool(
            &server,
            1,
            "add_lesson",
            json!({
                "title": "SwiftUI State Management",
                "content": "Use @StateObject for owned observable objects",
                "category": "practice",
                "technology": "swiftui",
                "tags": ["state", "swiftui"]
            }),
        )
        .await;
        assert!(!is_error);
        assert_eq!(added["message"], "Lesson 'SwiftUI State Management' added successfully");
        let id = added["id"].as_i64().unwrap();

        let (_, hits) = call_tool(
            &server,
            2,
            "query_knowledge",
            json!({"query": "StateObject", "category": "lesson"}),
        )
        .await;
        assert_eq!(hits[0]["id"], id);
        assert_eq!(hits[0]["type"], "lesson");
        assert!(hits[0]["relevance"].as_f64().unwrap() > 0.0);

        let (is_error, _) = call_tool(
            &server,
            3,
            "update_lesson",
            json!({"id": id, "technology": null, "tags": ["observation"]}),
        )
        .await;
        assert!(!is_error);

        let (_, technologies) = call_tool(&server, 4, "list_technologies", json!({})).await;
        assert_eq!(technologies, json!([]));

        let (_, tags) = call_tool(&server, 5, "list_tags", json!({})).await;
        let tags = tags.as_array().unwrap();
        assert!(
            tags.iter()
                .any(|t| t["tag"] == "observation" && t["usage_count"] == 1)
        );
    }

    #[tokio::test]
    async fn test_error_workflow() {
        let (_dir, server) = server();

        let (_, added) = call_tool(
            &server,
            1,
            "add_common_error",
            json!({
                "technology": "swift",
                "error_pattern": "Publishing changes from background threads is not allowed",
                "solution": "Hop to the main actor before mutating published state",
                "root_cause": "Combine publisher delivered on a background queue"
            }),
        )
        .await;
        let id = added["id"].as_i64().unwrap();

        let (_, incremented) =
            call_tool(&server, 2, "increment_error_count", json!({"id": id})).await;
        assert_eq!(incremented["occurrence_count"], 2);

        let (_, hits) = call_tool(
            &server,
            3,
            "search_errors",
            json!({"query": "background threads", "technology": "swift"}),
        )
        .await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["occurrence_count"], 2);

        let (_, stats) = call_tool(&server, 4, "get_statistics", Value::Null).await;
        assert_eq!(stats["total_errors"], 1);
        assert_eq!(stats["total_error_occurrences"], 2);
    }

    #[tokio::test]
    async fn test_patterns_and_export() {
        let (_dir, server) = server();

        for (name, ios) in [("Task groups", "15.0"), ("Observation", "17.0")] {
            let (is_error, _) = call_tool(
                &server,
                1,
                "add_swift_pattern",
                json!({
                    "pattern_name": name,
                    "description": "concurrency building block",
                    "code_example": "// example",
                    "ios_version": ios,
                    "related_apis": ["Task", " withTaskGroup "]
                }),
            )
            .await;
            assert!(!is_error);
        }

        let (_, hits) = call_tool(
            &server,
            2,
            "get_swift_patterns",
            json!({"query": "concurrency", "ios_version": "16"}),
        )
        .await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["pattern_name"], "Task groups");
        assert_eq!(hits[0]["related_apis"], json!(["Task", "withTaskGroup"]));

        let (_, session) = call_tool(
            &server,
            3,
            "add_session_context",
            json!({"date": "2025-01-15", "project_name": "demo"}),
        )
        .await;
        assert_eq!(session["message"], "Session for 2025-01-15 added successfully");

        let (_, export) = call_tool(
            &server,
            4,
            "export_knowledge",
            json!({"category": "pattern", "include_sessions": true}),
        )
        .await;
        assert_eq!(export["patterns"].as_array().unwrap().len(), 2);
        assert_eq!(export["sessions"].as_array().unwrap().len(), 1);
        assert!(export.get("lessons").is_none());
        assert!(export["version"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (_dir, server) = server();

        let cases = [
            (
                "add_lesson",
                json!({"title": "t", "content": "c", "category": "tip"}),
            ),
            ("add_session_context", json!({"date": "15/01/2025"})),
            ("increment_error_count", json!({})),
            ("query_knowledge", json!({"query": "x", "colour": "red"})),
            ("query_knowledge", json!({"query": "x".repeat(10_241)})),
            ("get_swift_patterns", json!({"swift_version": "5.x"})),
            ("update_lesson", json!({"id": 77, "title": "missing"})),
        ];

        for (i, (tool, arguments)) in cases.into_iter().enumerate() {
            let (is_error, payload) = call_tool(&server, i as i64, tool, arguments).await;
            assert!(is_error, "{tool} should fail");
            let object = payload.as_object().unwrap();
            assert_eq!(object.len(), 1, "{tool}: {payload}");
            assert!(object["error"].is_string());
        }

        let (_, payload) = call_tool(&server, 99, "add_session_context", json!({})).await;
        assert_eq!(payload["error"], "date is required (YYYY-MM-DD format)");

        let (_, payload) = call_tool(&server, 100, "update_lesson", json!({"id": 77})).await;
        assert_eq!(payload["error"], "Lesson with id 77 not found");
    }
}
