//! Tool execution handlers.
//!
//! Each handler parses its argument bag, calls the knowledge service, and
//! returns the success payload as JSON. Errors are turned into tool results
//! by the registry.

use crate::mcp::tool_types::{
    AddCommonErrorArgs, AddLessonArgs, AddSessionContextArgs, AddSwiftPatternArgs,
    ExportKnowledgeArgs, GetSwiftPatternsArgs, IncrementErrorCountArgs, NoArgs,
    QueryKnowledgeArgs, SearchErrorsArgs, UpdateLessonArgs, parse_args,
};
use crate::services::KnowledgeService;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Maximum accepted length of a search query, in bytes.
const MAX_QUERY_LENGTH: usize = 10_240;

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::operation("serialize_tool_result", e))
}

fn validate_query_length(query: Option<&str>) -> Result<()> {
    match query {
        Some(q) if q.len() > MAX_QUERY_LENGTH => Err(Error::InvalidInput(format!(
            "query exceeds maximum length ({} > {MAX_QUERY_LENGTH} bytes)",
            q.len()
        ))),
        _ => Ok(()),
    }
}

/// Executes `query_knowledge`.
pub async fn execute_query_knowledge(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    let args: QueryKnowledgeArgs = parse_args(arguments)?;
    validate_query_length(args.query.as_deref())?;
    let hits = service.query(args.into_request()?).await?;
    to_json(&hits)
}

/// Executes `search_errors`.
pub async fn execute_search_errors(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    let args: SearchErrorsArgs = parse_args(arguments)?;
    validate_query_length(args.query.as_deref())?;
    let hits = service.search_errors(args.into()).await?;
    to_json(&hits)
}

/// Executes `get_swift_patterns`.
pub async fn execute_get_swift_patterns(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: GetSwiftPatternsArgs = parse_args(arguments)?;
    validate_query_length(args.query.as_deref())?;
    let hits = service.get_patterns(args.into()).await?;
    to_json(&hits)
}

/// Executes `list_technologies`.
pub async fn execute_list_technologies(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    parse_args::<NoArgs>(arguments)?;
    to_json(&service.list_technologies().await?)
}

/// Executes `list_tags`.
pub async fn execute_list_tags(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    parse_args::<NoArgs>(arguments)?;
    to_json(&service.list_tags().await?)
}

/// Executes `get_statistics`.
pub async fn execute_get_statistics(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    parse_args::<NoArgs>(arguments)?;
    to_json(&service.get_statistics().await?)
}

/// Executes `export_knowledge`.
pub async fn execute_export_knowledge(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: ExportKnowledgeArgs = parse_args(arguments)?;
    to_json(&service.export(args.into_request()?).await?)
}

/// Executes `add_lesson`.
pub async fn execute_add_lesson(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    let args: AddLessonArgs = parse_args(arguments)?;
    to_json(&service.add_lesson(args.into_request()?).await?)
}

/// Executes `add_common_error`.
pub async fn execute_add_common_error(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: AddCommonErrorArgs = parse_args(arguments)?;
    to_json(&service.add_common_error(args.into()).await?)
}

/// Executes `add_swift_pattern`.
pub async fn execute_add_swift_pattern(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: AddSwiftPatternArgs = parse_args(arguments)?;
    to_json(&service.add_swift_pattern(args.into()).await?)
}

/// Executes `add_session_context`.
pub async fn execute_add_session_context(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: AddSessionContextArgs = parse_args(arguments)?;
    to_json(&service.add_session_context(args.into()).await?)
}

/// Executes `update_lesson`.
pub async fn execute_update_lesson(service: &KnowledgeService, arguments: Value) -> Result<Value> {
    let args: UpdateLessonArgs = parse_args(arguments)?;
    let (id, patch) = args.into_patch()?;
    to_json(&service.update_lesson(id, patch).await?)
}

/// Executes `increment_error_count`.
pub async fn execute_increment_error_count(
    service: &KnowledgeService,
    arguments: Value,
) -> Result<Value> {
    let args: IncrementErrorCountArgs = parse_args(arguments)?;
    to_json(&service.increment_error_count(args.id()?).await?)
}
