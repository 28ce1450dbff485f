//! Business logic services.
//!
//! [`QueryEngine`] and [`MutationApi`] are synchronous and talk to the store
//! directly. [`KnowledgeService`] wraps both for async callers, running each
//! call on tokio's blocking pool so `SQLite` work never stalls the runtime.

mod mutation;
mod query;

pub use mutation::{MutationApi, parse_session_date};
pub use query::{QueryEngine, merge};

use crate::config::SearchConfig;
use crate::models::{
    ErrorQuery, ExportDocument, ExportRequest, LessonPatch, MutationOutcome, NewCommonError,
    NewLesson, NewSession, NewSwiftPattern, PatternQuery, QueryRequest, SearchHit, Statistics,
    TagUsage, TechnologyCount,
};
use crate::storage::KnowledgeStore;
use crate::{Error, Result};
use std::sync::Arc;

/// Async entry point for every knowledge operation.
///
/// Cloning is cheap; clones share the store handle.
#[derive(Debug, Clone)]
pub struct KnowledgeService {
    store: Arc<KnowledgeStore>,
    queries: Arc<QueryEngine>,
    mutations: Arc<MutationApi>,
}

impl KnowledgeService {
    /// Creates a service over an opened store.
    #[must_use]
    pub fn new(store: KnowledgeStore, search: SearchConfig) -> Self {
        let store = Arc::new(store);
        Self {
            queries: Arc::new(QueryEngine::new(Arc::clone(&store), search)),
            mutations: Arc::new(MutationApi::new(Arc::clone(&store))),
            store,
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Cross-category search.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::query`].
    pub async fn query(&self, request: QueryRequest) -> Result<Vec<SearchHit>> {
        let engine = Arc::clone(&self.queries);
        blocking("query", move || engine.query(&request)).await
    }

    /// Error search.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::search_errors`].
    pub async fn search_errors(&self, request: ErrorQuery) -> Result<Vec<SearchHit>> {
        let engine = Arc::clone(&self.queries);
        blocking("search_errors", move || engine.search_errors(&request)).await
    }

    /// Pattern search with version maxima.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::get_patterns`].
    pub async fn get_patterns(&self, request: PatternQuery) -> Result<Vec<SearchHit>> {
        let engine = Arc::clone(&self.queries);
        blocking("get_patterns", move || engine.get_patterns(&request)).await
    }

    /// Per-technology counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_technologies(&self) -> Result<Vec<TechnologyCount>> {
        let engine = Arc::clone(&self.queries);
        blocking("list_technologies", move || engine.list_technologies()).await
    }

    /// Tag usage counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_tags(&self) -> Result<Vec<TagUsage>> {
        let engine = Arc::clone(&self.queries);
        blocking("list_tags", move || engine.list_tags()).await
    }

    /// Dashboard statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get_statistics(&self) -> Result<Statistics> {
        let engine = Arc::clone(&self.queries);
        blocking("get_statistics", move || engine.statistics()).await
    }

    /// Export.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportDocument> {
        let engine = Arc::clone(&self.queries);
        blocking("export", move || engine.export(&request)).await
    }

    /// Adds a lesson.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::add_lesson`].
    pub async fn add_lesson(&self, lesson: NewLesson) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("add_lesson", move || api.add_lesson(&lesson)).await
    }

    /// Adds a common error.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::add_common_error`].
    pub async fn add_common_error(&self, error: NewCommonError) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("add_common_error", move || api.add_common_error(&error)).await
    }

    /// Adds a Swift pattern.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::add_swift_pattern`].
    pub async fn add_swift_pattern(&self, pattern: NewSwiftPattern) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("add_swift_pattern", move || api.add_swift_pattern(&pattern)).await
    }

    /// Records a session.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::add_session_context`].
    pub async fn add_session_context(&self, session: NewSession) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("add_session_context", move || api.add_session_context(&session)).await
    }

    /// Updates a lesson.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::update_lesson`].
    pub async fn update_lesson(&self, id: i64, patch: LessonPatch) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("update_lesson", move || api.update_lesson(id, &patch)).await
    }

    /// Increments an error's occurrence count.
    ///
    /// # Errors
    ///
    /// See [`MutationApi::increment_error_count`].
    pub async fn increment_error_count(&self, id: i64) -> Result<MutationOutcome> {
        let api = Arc::clone(&self.mutations);
        blocking("increment_error_count", move || api.increment_error_count(id)).await
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::operation(operation, format!("blocking task failed: {e}")))?
}
