//! Session rows. Sessions are not indexed for search.

use super::rows::{SESSION_COLUMNS, session_from_row};
use super::{KnowledgeStore, StoreReader, measured};
use crate::models::{SESSION_DATE_FORMAT, Session};
use crate::{Error, Result, current_timestamp};
use chrono::NaiveDate;
use rusqlite::params;
use tracing::instrument;

impl KnowledgeStore {
    /// Records a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip_all, fields(operation = "add_session", backend = "sqlite", date = %date))]
    pub fn add_session(
        &self,
        date: NaiveDate,
        project_name: Option<&str>,
        session_log_path: Option<&str>,
        summary: Option<&str>,
    ) -> Result<i64> {
        self.write("add_session", |tx| {
            tx.execute(
                "INSERT INTO sessions (date, project_name, session_log_path, summary, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    date.format(SESSION_DATE_FORMAT).to_string(),
                    project_name,
                    session_log_path,
                    summary,
                    current_timestamp()
                ],
            )
            .map_err(|e| Error::operation("insert_session", e))?;
            Ok(tx.last_insert_rowid())
        })
    }
}

impl StoreReader {
    /// Lists sessions, most recent date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        measured("list_sessions", || {
            let mut stmt = self
                .conn
                .prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions s ORDER BY s.date DESC, s.id DESC"
                ))
                .map_err(|e| Error::operation("prepare_list_sessions", e))?;
            let rows = stmt
                .query_map([], session_from_row)
                .map_err(|e| Error::operation("list_sessions", e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("read_session_row", e))
        })
    }
}
