//! # Hindsight
//!
//! A searchable knowledge base of development learnings.
//!
//! Hindsight records lessons, recurring errors, and reusable Swift patterns in
//! a single `SQLite` file and serves BM25-ranked full-text search over them
//! through FTS5 indexes kept in lockstep with the entity tables.
//!
//! ## Layers
//!
//! - [`storage`]: record store, FTS5 index mirror, connection retry
//! - [`services`]: query engine, mutation API, and the async facade
//! - [`mcp`]: JSON-RPC tool dispatch over stdio
//!
//! ## Example
//!
//! ```rust,ignore
//! use hindsight::{HindsightConfig, KnowledgeService, KnowledgeStore, QueryRequest};
//!
//! let config = HindsightConfig::load_default();
//! let store = KnowledgeStore::open(&config.database)?;
//! let service = KnowledgeService::new(store, config.search);
//!
//! let hits = service
//!     .query(QueryRequest::new("SwiftUI state"))
//!     .await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::HindsightConfig;
pub use models::{
    Category, CommonError, ExportDocument, ExportRequest, Lesson, LessonCategory, LessonPatch,
    MutationOutcome, NewCommonError, NewLesson, NewSession, NewSwiftPattern, PatternQuery,
    QueryRequest, SearchHit, Session, Statistics, SwiftPattern, TagUsage, TechnologyCount,
};
pub use services::KnowledgeService;
pub use storage::KnowledgeStore;

/// Error type for hindsight operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A required field is missing or a value is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced record does not exist.
    #[error("{kind} with id {id} not found")]
    NotFound {
        /// Record kind, as shown to callers ("Lesson", "Error").
        kind: &'static str,
        /// The id that was looked up.
        id: i64,
    },

    /// A storage, I/O, or serialization step failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The cause of the failure.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for validation failures.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns true when a referenced record was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for hindsight operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// # Example
///
/// ```
/// use hindsight::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
