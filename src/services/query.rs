//! Query engine.
//!
//! Fans a search out over the enabled record kinds, merges the hits into one
//! relevance-sorted list, and serves the aggregate views and export.
//!
//! Read paths degrade: once a connection is held, a failing ranked search is
//! logged and answered with an empty list. Failing to connect is an error.

use crate::config::SearchConfig;
use crate::models::{
    Category, DottedVersion, EXPORT_VERSION, ErrorQuery, ExportDocument, ExportRequest,
    PatternQuery, QueryRequest, SearchHit, Statistics, TagUsage, TechnologyCount,
};
use crate::storage::{
    ErrorSearch, IdOrder, KnowledgeStore, LessonSearch, MatchQuery, PatternSearch, StoreReader,
};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Read-side operations over the knowledge store.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<KnowledgeStore>,
    search: SearchConfig,
}

impl QueryEngine {
    /// Creates an engine over a shared store.
    #[must_use]
    pub const fn new(store: Arc<KnowledgeStore>, search: SearchConfig) -> Self {
        Self { store, search }
    }

    /// Searches lessons, errors, and patterns and merges the results.
    ///
    /// Hits from every enabled kind are concatenated, stable-sorted by
    /// relevance (highest first), and cut to the resolved limit.
    ///
    /// # Errors
    ///
    /// Returns an error only when no connection can be acquired.
    #[instrument(skip(self, request), fields(operation = "query", category = %request.category, query_length = request.query.len()))]
    pub fn query(&self, request: &QueryRequest) -> Result<Vec<SearchHit>> {
        let limit = self.search.resolve_limit(request.limit);
        let query = MatchQuery::parse(&request.query);
        let technology = non_blank(request.technology.as_deref());
        let tags = normalize_tags(&request.tags);

        let reader = self.store.reader()?;
        let hits = (|| {
            let mut hits = Vec::new();
            if request.category.includes(Category::Lesson) {
                let lessons = reader.search_lessons(&LessonSearch {
                    query: &query,
                    technology,
                    tags: &tags,
                    limit,
                })?;
                hits.extend(
                    lessons
                        .into_iter()
                        .map(|(lesson, relevance)| SearchHit::Lesson { lesson, relevance }),
                );
            }
            if request.category.includes(Category::Error) {
                let errors = reader.search_errors(&ErrorSearch {
                    query: &query,
                    technology,
                    limit,
                    id_order: IdOrder::Descending,
                })?;
                hits.extend(
                    errors
                        .into_iter()
                        .map(|(error, relevance)| SearchHit::Error { error, relevance }),
                );
            }
            if request.category.includes(Category::Pattern) {
                let patterns = reader.search_patterns(&PatternSearch {
                    query: &query,
                    ios_version: None,
                    swift_version: None,
                    limit,
                })?;
                hits.extend(
                    patterns
                        .into_iter()
                        .map(|(pattern, relevance)| SearchHit::Pattern { pattern, relevance }),
                );
            }
            Ok(merge(hits, limit))
        })();

        Ok(degrade("query", hits))
    }

    /// Searches common errors.
    ///
    /// Hits order by relevance, then occurrence count, then oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error only when no connection can be acquired.
    #[instrument(skip(self, request), fields(operation = "search_errors", query_length = request.query.len()))]
    pub fn search_errors(&self, request: &ErrorQuery) -> Result<Vec<SearchHit>> {
        let limit = self.search.resolve_limit(request.limit);
        let query = MatchQuery::parse(&request.query);

        let reader = self.store.reader()?;
        let hits = reader
            .search_errors(&ErrorSearch {
                query: &query,
                technology: non_blank(request.technology.as_deref()),
                limit,
                id_order: IdOrder::Ascending,
            })
            .map(|errors| {
                errors
                    .into_iter()
                    .map(|(error, relevance)| SearchHit::Error { error, relevance })
                    .collect()
            });

        Ok(degrade("search_errors", hits))
    }

    /// Searches Swift patterns, optionally capped by iOS and Swift version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a malformed version, or an
    /// error when no connection can be acquired.
    #[instrument(skip(self, request), fields(operation = "get_patterns", query_length = request.query.len()))]
    pub fn get_patterns(&self, request: &PatternQuery) -> Result<Vec<SearchHit>> {
        let limit = self.search.resolve_limit(request.limit);
        let query = MatchQuery::parse(&request.query);
        let ios_version = checked_version(request.ios_version.as_deref())?;
        let swift_version = checked_version(request.swift_version.as_deref())?;

        let reader = self.store.reader()?;
        let hits = reader
            .search_patterns(&PatternSearch {
                query: &query,
                ios_version,
                swift_version,
                limit,
            })
            .map(|patterns| {
                patterns
                    .into_iter()
                    .map(|(pattern, relevance)| SearchHit::Pattern { pattern, relevance })
                    .collect()
            });

        Ok(degrade("get_patterns", hits))
    }

    /// Lesson and error counts per technology.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_technologies(&self) -> Result<Vec<TechnologyCount>> {
        self.store.read(StoreReader::list_technologies)
    }

    /// Tags with their usage counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_tags(&self) -> Result<Vec<TagUsage>> {
        self.store.read(StoreReader::list_tags)
    }

    /// Dashboard statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn statistics(&self) -> Result<Statistics> {
        self.store.read(StoreReader::statistics)
    }

    /// Dumps the requested record kinds.
    ///
    /// The technology filter applies to lessons and errors. Sessions are
    /// included only when asked for.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self, request), fields(operation = "export", category = %request.category))]
    pub fn export(&self, request: &ExportRequest) -> Result<ExportDocument> {
        let technology = non_blank(request.technology.as_deref());
        let category = request.category;

        self.store.read(|reader| {
            Ok(ExportDocument {
                exported_at: Utc::now(),
                version: EXPORT_VERSION,
                lessons: category
                    .includes(Category::Lesson)
                    .then(|| reader.list_lessons(technology))
                    .transpose()?,
                errors: category
                    .includes(Category::Error)
                    .then(|| reader.list_common_errors(technology))
                    .transpose()?,
                patterns: category
                    .includes(Category::Pattern)
                    .then(|| reader.list_swift_patterns())
                    .transpose()?,
                sessions: request
                    .include_sessions
                    .then(|| reader.list_sessions())
                    .transpose()?,
            })
        })
    }
}

/// Stable-sorts hits by relevance, highest first, and truncates.
#[must_use]
pub fn merge(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.relevance().total_cmp(&a.relevance()));
    hits.truncate(limit);
    hits
}

fn degrade<T>(operation: &'static str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        tracing::error!(operation, error = %err, "Search failed, returning no results");
        metrics::counter!("query_degraded_total", "operation" => operation).increment(1);
        Vec::new()
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn checked_version(version: Option<&str>) -> Result<Option<&str>> {
    match non_blank(version) {
        Some(v) => {
            v.parse::<DottedVersion>()?;
            Ok(Some(v))
        },
        None => Ok(None),
    }
}
