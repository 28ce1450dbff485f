//! Connection acquisition and per-connection configuration.
//!
//! Every store operation opens its own connection through
//! [`ConnectionManager::acquire`] and drops it when done, so the database
//! file is only held open while work is in flight.

use crate::config::DatabaseConfig;
use crate::models::version_at_most;
use crate::storage::resilience::{RetryPolicy, retry_connection};
use crate::{Error, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the SQL function comparing dotted version strings.
pub const VERSION_LE_FUNCTION: &str = "version_le";

/// Opens configured connections to the knowledge database.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    path: PathBuf,
    busy_timeout: Duration,
    policy: RetryPolicy,
}

impl ConnectionManager {
    /// Creates a manager for the configured database file.
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            path: config.path.clone(),
            busy_timeout: config.busy_timeout,
            policy: RetryPolicy::from_config(config),
        }
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the retry policy used by [`Self::acquire`].
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Opens and configures a connection, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] with the last failure once the
    /// retry policy is exhausted.
    pub fn acquire(&self) -> Result<Connection> {
        retry_connection(&self.policy, "sqlite", "connect", || self.open_once())
    }

    fn open_once(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;

        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            Error::OperationFailed {
                operation: "open_database".to_string(),
                cause: format!("{}: {e}", self.path.display()),
            }
        })?;

        configure_connection(&conn, self.busy_timeout)?;
        register_functions(&conn)?;
        Ok(conn)
    }
}

/// Applies the pragmas every connection needs.
///
/// - **`busy_timeout`**: waits for competing writers instead of failing
/// - **`foreign_keys`**: enables the cascading tag-link deletes
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: durable at checkpoints
///
/// A database that refuses WAL (in-memory, some network filesystems) is
/// logged and used in its current journal mode.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if `busy_timeout` or `foreign_keys`
/// cannot be set.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| Error::operation("set_busy_timeout", e))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::operation("enable_foreign_keys", e))?;

    match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    }) {
        Ok(mode) if mode.eq_ignore_ascii_case("wal") => {},
        Ok(mode) => tracing::debug!(journal_mode = %mode, "WAL not available, keeping journal mode"),
        Err(e) => tracing::warn!(error = %e, "Failed to enable WAL mode"),
    }

    if let Err(e) = conn.pragma_update(None, "synchronous", "NORMAL") {
        tracing::warn!(error = %e, "Failed to set synchronous mode");
    }

    Ok(())
}

/// Registers the custom SQL functions used by pattern queries.
///
/// `version_le(recorded, requested)` is true when the recorded dotted
/// version is at most the requested one. A NULL argument yields NULL.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if registration fails.
pub fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        VERSION_LE_FUNCTION,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let recorded = ctx.get::<Option<String>>(0)?;
            let requested = ctx.get::<Option<String>>(1)?;
            Ok(match (recorded, requested) {
                (Some(recorded), Some(requested)) => {
                    Some(version_at_most(&recorded, &requested))
                },
                _ => None,
            })
        },
    )
    .map_err(|e| Error::operation("register_version_le", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> ConnectionManager {
        let config = DatabaseConfig::at(dir.path().join("knowledge.db"))
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(1));
        ConnectionManager::new(&config)
    }

    #[test]
    fn test_acquire_configures_connection() {
        let dir = TempDir::new().unwrap();
        let conn = manager(&dir).acquire().unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        let foreign_keys: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);

        // NORMAL = 1
        let synchronous: i32 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .unwrap();
        assert_eq!(synchronous, 1);

        let busy_timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 5000);
    }

    #[test]
    fn test_in_memory_keeps_memory_journal() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, Duration::from_millis(100)).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "memory");
    }

    #[test]
    fn test_version_le_function() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();

        let check = |a: &str, b: &str| -> bool {
            conn.query_row("SELECT version_le(?1, ?2)", [a, b], |row| row.get(0))
                .unwrap()
        };
        assert!(check("15.0", "16"));
        assert!(check("9.1", "10"));
        assert!(!check("17.2", "17.1"));

        let null: Option<bool> = conn
            .query_row("SELECT version_le(NULL, '1.0')", [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn test_unopenable_path_fails_after_retries() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::at(dir.path().join("missing").join("knowledge.db"))
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(1));

        let err = ConnectionManager::new(&config).acquire().unwrap_err();
        assert!(matches!(err, Error::OperationFailed { ref operation, .. } if operation == "open_database"));
    }
}
