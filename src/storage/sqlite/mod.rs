//! `SQLite` record store.
//!
//! [`KnowledgeStore`] owns the database location and opens a fresh
//! connection per operation. Writes run in an immediate transaction that
//! covers the entity row, its tag links, and its FTS mirror. Reads go
//! through a [`StoreReader`], which holds one connection for the duration
//! of a request.
//!
//! ## Module Structure
//!
//! - [`connection`]: connection acquisition, pragmas, SQL functions
//! - `sql`: filter builder with numbered parameters
//! - `rows`: row mappers and storage-edge encodings
//! - `lessons`, `errors`, `patterns`, `sessions`: per-entity reads and writes
//! - `aggregates`: technology/tag listings and dashboard statistics
//! - `metrics`: operation counters and latency histograms

mod aggregates;
pub mod connection;
mod errors;
mod lessons;
mod metrics;
mod patterns;
mod rows;
mod sessions;
mod sql;

pub use connection::ConnectionManager;
pub use errors::{ErrorSearch, IdOrder};
pub use lessons::LessonSearch;
pub use patterns::PatternSearch;

use self::metrics::{record_operation_metrics, status_label};

use crate::config::DatabaseConfig;
use crate::storage::migrations::{MIGRATIONS, run_migrations};
use crate::{Error, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Instant;

const BACKEND: &str = "sqlite";

/// Handle to the knowledge database.
///
/// Cheap to share behind an `Arc`; it holds no open connection.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    connections: ConnectionManager,
}

impl KnowledgeStore {
    /// Opens the store, creating the file and schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, no
    /// connection can be acquired, or a migration fails.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let store = Self {
            connections: ConnectionManager::new(config),
        };

        measured("migrate", || {
            let mut conn = store.connections.acquire()?;
            run_migrations(&mut conn, MIGRATIONS)
        })?;

        tracing::info!(path = %config.path.display(), "Opened knowledge store");
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.connections.path()
    }

    /// Acquires a connection for a read request.
    ///
    /// # Errors
    ///
    /// Returns an error once connection retries are exhausted.
    pub fn reader(&self) -> Result<StoreReader> {
        Ok(StoreReader {
            conn: self.connections.acquire()?,
        })
    }

    /// Runs `f` with a reader; the connection is closed afterwards.
    ///
    /// # Errors
    ///
    /// Propagates connection failures and errors from `f`.
    pub fn read<T>(&self, f: impl FnOnce(&StoreReader) -> Result<T>) -> Result<T> {
        let reader = self.reader()?;
        f(&reader)
    }

    /// Runs `f` on a fresh connection that is dropped on every exit path.
    ///
    /// # Errors
    ///
    /// Propagates connection failures and errors from `f`.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.connections.acquire()?;
        f(&mut conn)
    }

    /// Runs `f` inside an immediate transaction and commits on success.
    ///
    /// Dropping the transaction on the error path rolls it back.
    fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        measured(operation, || {
            self.with_connection(|conn| {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(|e| Error::operation("begin_transaction", e))?;
                let value = f(&tx)?;
                tx.commit()
                    .map_err(|e| Error::operation("commit_transaction", e))?;
                Ok(value)
            })
        })
    }
}

/// One open connection serving read operations.
#[derive(Debug)]
pub struct StoreReader {
    conn: Connection,
}

impl StoreReader {
    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Times `f`, records its metrics, and logs storage faults.
fn measured<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    record_operation_metrics(BACKEND, operation, start, status_label(&result));
    if let Err(err @ Error::OperationFailed { .. }) = &result {
        tracing::error!(operation, error = %err, "Storage operation failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directory_and_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("knowledge.db");

        let store = KnowledgeStore::open(&DatabaseConfig::at(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path);

        let version: i32 = store
            .read(|r| {
                r.connection()
                    .pragma_query_value(None, "user_version", |row| row.get(0))
                    .map_err(|e| Error::operation("read_version", e))
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::at(dir.path().join("knowledge.db"));

        let store = KnowledgeStore::open(&config).unwrap();
        store
            .write("seed", |tx| {
                tx.execute("INSERT INTO tags (name) VALUES ('kept')", [])
                    .map_err(|e| Error::operation("seed", e))
            })
            .unwrap();
        drop(store);

        let store = KnowledgeStore::open(&config).unwrap();
        let count: i64 = store
            .with_connection(|conn| {
                conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
                    .map_err(|e| Error::operation("count", e))
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = KnowledgeStore::open(&DatabaseConfig::at(dir.path().join("k.db"))).unwrap();

        let result: Result<()> = store.write("partial", |tx| {
            tx.execute("INSERT INTO tags (name) VALUES ('ghost')", [])
                .map_err(|e| Error::operation("insert", e))?;
            Err(Error::operation("partial", "forced"))
        });
        assert!(result.is_err());

        let count: i64 = store
            .with_connection(|conn| {
                conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
                    .map_err(|e| Error::operation("count", e))
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
