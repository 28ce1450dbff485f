//! Argument types for MCP tools.
//!
//! Every argument struct uses `#[serde(deny_unknown_fields)]` so a misspelled
//! field is reported instead of silently ignored. Required fields are still
//! `Option` here: a missing field reaches the mutation API as blank and gets
//! the same "is required" message as an empty one.

use crate::models::{
    Category, ErrorQuery, ExportRequest, LessonCategory, LessonPatch, NewCommonError, NewLesson,
    NewSession, NewSwiftPattern, PatternQuery, QueryRequest,
};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes tool arguments, treating `null` as an empty object.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the arguments do not match `T`.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_category(category: Option<&str>) -> Result<Category> {
    category.map_or(Ok(Category::All), str::parse)
}

/// Arguments for `query_knowledge`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryKnowledgeArgs {
    /// Search terms.
    pub query: Option<String>,
    /// `lesson`, `error`, `pattern`, or `all`.
    pub category: Option<String>,
    /// Technology filter.
    pub technology: Option<String>,
    /// Tag filter.
    pub tags: Option<Vec<String>>,
    /// Maximum results.
    pub limit: Option<i64>,
}

impl QueryKnowledgeArgs {
    /// Builds the query request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown category.
    pub fn into_request(self) -> Result<QueryRequest> {
        Ok(QueryRequest {
            category: parse_category(self.category.as_deref())?,
            query: self.query.unwrap_or_default(),
            technology: self.technology,
            tags: self.tags.unwrap_or_default(),
            limit: self.limit,
        })
    }
}

/// Arguments for `search_errors`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchErrorsArgs {
    /// Error text to search for.
    pub query: Option<String>,
    /// Technology filter.
    pub technology: Option<String>,
    /// Maximum results.
    pub limit: Option<i64>,
}

impl From<SearchErrorsArgs> for ErrorQuery {
    fn from(args: SearchErrorsArgs) -> Self {
        Self {
            query: args.query.unwrap_or_default(),
            technology: args.technology,
            limit: args.limit,
        }
    }
}

/// Arguments for `get_swift_patterns`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetSwiftPatternsArgs {
    /// Pattern name or description to search for.
    pub query: Option<String>,
    /// Maximum iOS version.
    pub ios_version: Option<String>,
    /// Maximum Swift version.
    pub swift_version: Option<String>,
    /// Maximum results.
    pub limit: Option<i64>,
}

impl From<GetSwiftPatternsArgs> for PatternQuery {
    fn from(args: GetSwiftPatternsArgs) -> Self {
        Self {
            query: args.query.unwrap_or_default(),
            ios_version: args.ios_version,
            swift_version: args.swift_version,
            limit: args.limit,
        }
    }
}

/// Arguments for tools that take none.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// Arguments for `add_lesson`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddLessonArgs {
    /// Short title.
    pub title: Option<String>,
    /// Body text.
    pub content: Option<String>,
    /// `pattern`, `practice`, `gotcha`, or `decision`.
    pub category: Option<String>,
    /// Technology.
    pub technology: Option<String>,
    /// Tag names.
    pub tags: Option<Vec<String>>,
    /// Originating project.
    pub project_context: Option<String>,
    /// Originating session log.
    pub source_session: Option<String>,
}

impl AddLessonArgs {
    /// Builds the lesson request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the category is missing or
    /// unknown.
    pub fn into_request(self) -> Result<NewLesson> {
        let category = self
            .category
            .as_deref()
            .ok_or_else(|| Error::InvalidInput(LessonCategory::invalid_message()))?
            .parse::<LessonCategory>()?;
        Ok(NewLesson {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            category,
            technology: self.technology,
            tags: self.tags.unwrap_or_default(),
            project_context: self.project_context,
            source_session: self.source_session,
        })
    }
}

/// Arguments for `add_common_error`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommonErrorArgs {
    /// Technology.
    pub technology: Option<String>,
    /// Error message or fragment.
    pub error_pattern: Option<String>,
    /// Fix.
    pub solution: Option<String>,
    /// Cause.
    pub root_cause: Option<String>,
    /// Code showing the fix.
    pub code_example: Option<String>,
}

impl From<AddCommonErrorArgs> for NewCommonError {
    fn from(args: AddCommonErrorArgs) -> Self {
        Self {
            technology: args.technology.unwrap_or_default(),
            error_pattern: args.error_pattern.unwrap_or_default(),
            solution: args.solution.unwrap_or_default(),
            root_cause: args.root_cause,
            code_example: args.code_example,
        }
    }
}

/// Arguments for `add_swift_pattern`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSwiftPatternArgs {
    /// Pattern name.
    pub pattern_name: Option<String>,
    /// What the pattern does.
    pub description: Option<String>,
    /// Example code.
    pub code_example: Option<String>,
    /// When the pattern fits.
    pub when_to_use: Option<String>,
    /// When to avoid it.
    pub when_not_to_use: Option<String>,
    /// Related API names.
    pub related_apis: Option<Vec<String>>,
    /// Minimum iOS version.
    pub ios_version: Option<String>,
    /// Minimum Swift version.
    pub swift_version: Option<String>,
}

impl From<AddSwiftPatternArgs> for NewSwiftPattern {
    fn from(args: AddSwiftPatternArgs) -> Self {
        Self {
            pattern_name: args.pattern_name.unwrap_or_default(),
            description: args.description.unwrap_or_default(),
            code_example: args.code_example.unwrap_or_default(),
            when_to_use: args.when_to_use,
            when_not_to_use: args.when_not_to_use,
            related_apis: args.related_apis.unwrap_or_default(),
            ios_version: args.ios_version,
            swift_version: args.swift_version,
        }
    }
}

/// Arguments for `add_session_context`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSessionContextArgs {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Project worked on.
    pub project_name: Option<String>,
    /// Session log location.
    pub session_log_path: Option<String>,
    /// What was accomplished.
    pub summary: Option<String>,
}

impl From<AddSessionContextArgs> for NewSession {
    fn from(args: AddSessionContextArgs) -> Self {
        Self {
            date: args.date.unwrap_or_default(),
            project_name: args.project_name,
            session_log_path: args.session_log_path,
            summary: args.summary,
        }
    }
}

/// Arguments for `update_lesson`.
///
/// `technology` and `project_context` accept an explicit `null` to clear
/// the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLessonArgs {
    /// Lesson id.
    pub id: Option<i64>,
    /// New title.
    pub title: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New technology.
    #[serde(default, deserialize_with = "double_option")]
    pub technology: Option<Option<String>>,
    /// New project context.
    #[serde(default, deserialize_with = "double_option")]
    pub project_context: Option<Option<String>>,
    /// Replacement tags.
    pub tags: Option<Vec<String>>,
}

impl UpdateLessonArgs {
    /// Splits into the lesson id and the patch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `id` is missing or the category
    /// is unknown.
    pub fn into_patch(self) -> Result<(i64, LessonPatch)> {
        let id = require_id(self.id)?;
        let category = self
            .category
            .as_deref()
            .map(str::parse::<LessonCategory>)
            .transpose()?;
        Ok((
            id,
            LessonPatch {
                title: self.title,
                content: self.content,
                category,
                technology: self.technology,
                project_context: self.project_context,
                tags: self.tags,
            },
        ))
    }
}

/// Arguments for `increment_error_count`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncrementErrorCountArgs {
    /// Error id.
    pub id: Option<i64>,
}

impl IncrementErrorCountArgs {
    /// Returns the error id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `id` is missing.
    pub fn id(&self) -> Result<i64> {
        require_id(self.id)
    }
}

/// Arguments for `export_knowledge`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportKnowledgeArgs {
    /// Kinds to include.
    pub category: Option<String>,
    /// Technology filter.
    pub technology: Option<String>,
    /// Whether to include sessions.
    pub include_sessions: Option<bool>,
}

impl ExportKnowledgeArgs {
    /// Builds the export request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown category.
    pub fn into_request(self) -> Result<ExportRequest> {
        Ok(ExportRequest {
            category: parse_category(self.category.as_deref())?,
            technology: self.technology,
            include_sessions: self.include_sessions.unwrap_or(false),
        })
    }
}

fn require_id(id: Option<i64>) -> Result<i64> {
    id.ok_or_else(|| Error::InvalidInput("id is required".to_string()))
}
