//! Embedded schema migrations.
//!
//! The schema is a list of numbered migrations compiled into the binary. The
//! applied version lives in `PRAGMA user_version`; [`run_migrations`] applies
//! every migration above it, each in its own transaction together with the
//! version bump.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hindsight::storage::migrations::{MIGRATIONS, run_migrations};
//!
//! let mut conn = rusqlite::Connection::open("knowledge.db")?;
//! run_migrations(&mut conn, MIGRATIONS)?;
//! ```

use crate::{Error, Result};
use rusqlite::{Connection, TransactionBehavior};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// The knowledge base schema.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "knowledge tables and full-text indexes",
    sql: r"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL
                CHECK (category IN ('pattern', 'practice', 'gotcha', 'decision')),
            technology TEXT,
            project_context TEXT,
            source_session TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS common_errors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            technology TEXT NOT NULL,
            error_pattern TEXT NOT NULL,
            root_cause TEXT,
            solution TEXT NOT NULL,
            code_example TEXT,
            occurrence_count INTEGER NOT NULL DEFAULT 1 CHECK (occurrence_count >= 1),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS swift_patterns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pattern_name TEXT NOT NULL,
            description TEXT NOT NULL,
            code_example TEXT NOT NULL,
            when_to_use TEXT,
            when_not_to_use TEXT,
            related_apis TEXT,
            ios_version TEXT,
            swift_version TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            project_name TEXT,
            session_log_path TEXT,
            summary TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS lesson_tags (
            lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (lesson_id, tag_id)
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS lessons_fts USING fts5(
            title, content,
            tokenize = 'porter unicode61'
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS errors_fts USING fts5(
            error_pattern, root_cause, solution,
            tokenize = 'porter unicode61'
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS patterns_fts USING fts5(
            pattern_name, description, when_to_use,
            tokenize = 'porter unicode61'
        );

        CREATE INDEX IF NOT EXISTS idx_lessons_technology ON lessons(technology);
        CREATE INDEX IF NOT EXISTS idx_lessons_category ON lessons(category);
        CREATE INDEX IF NOT EXISTS idx_lessons_created_at ON lessons(created_at);
        CREATE INDEX IF NOT EXISTS idx_errors_technology ON common_errors(technology);
        CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
        CREATE INDEX IF NOT EXISTS idx_lesson_tags_tag ON lesson_tags(tag_id);
    ",
}];

/// Maximum version across a set of migrations.
#[must_use]
pub const fn max_version(migrations: &[Migration]) -> i32 {
    let mut max = 0;
    let mut i = 0;
    while i < migrations.len() {
        if migrations[i].version > max {
            max = migrations[i].version;
        }
        i += 1;
    }
    max
}

/// Returns the schema version recorded in the database.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read.
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| Error::OperationFailed {
            operation: "read_schema_version".to_string(),
            cause: e.to_string(),
        })
}

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails; that migration is rolled back and
/// later ones are not attempted.
pub fn run_migrations(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
    let current = current_version(conn)?;

    for migration in migrations.iter().filter(|m| m.version > current) {
        apply_migration(conn, migration)?;
    }

    Ok(())
}

/// Applies a single migration within a transaction.
fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| Error::OperationFailed {
            operation: format!("migration_v{}_begin_tx", migration.version),
            cause: e.to_string(),
        })?;

    tx.execute_batch(migration.sql)
        .map_err(|e| Error::OperationFailed {
            operation: format!(
                "migration_v{}: {}",
                migration.version, migration.description
            ),
            cause: e.to_string(),
        })?;

    tx.pragma_update(None, "user_version", migration.version)
        .map_err(|e| Error::OperationFailed {
            operation: "record_migration".to_string(),
            cause: e.to_string(),
        })?;

    tx.commit().map_err(|e| Error::OperationFailed {
        operation: format!("migration_v{}_commit", migration.version),
        cause: e.to_string(),
    })?;

    tracing::info!(
        version = migration.version,
        description = migration.description,
        "Applied migration"
    );

    Ok(())
}
