//! Storage layer.
//!
//! - [`sqlite`]: the record store, one `SQLite` file holding every entity table
//! - [`fts`]: the FTS5 index mirror and query sanitizing
//! - [`migrations`]: the versioned schema
//! - [`resilience`]: bounded connection retry with exponential backoff

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod fts;
pub mod migrations;
pub mod resilience;
pub mod sqlite;

pub use fts::{FtsTable, MatchQuery};
pub use resilience::{RetryPolicy, retry_connection};
pub use sqlite::{
    ConnectionManager, ErrorSearch, IdOrder, KnowledgeStore, LessonSearch, PatternSearch,
    StoreReader,
};
