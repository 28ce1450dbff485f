//! Common error rows and their index mirror.

use super::rows::{ERROR_COLUMNS, error_from_row};
use super::sql::{FilterBuilder, sql_limit};
use super::{KnowledgeStore, StoreReader, measured};
use crate::models::{CommonError, NewCommonError};
use crate::storage::fts::{FtsTable, MatchQuery};
use crate::{Error, Result, current_timestamp};
use rusqlite::{OptionalExtension, params};
use tracing::instrument;

/// Direction of the final id tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl IdOrder {
    const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Parameters of an error search.
#[derive(Debug, Clone, Copy)]
pub struct ErrorSearch<'a> {
    /// Sanitized search text.
    pub query: &'a MatchQuery,
    /// Technology equality filter.
    pub technology: Option<&'a str>,
    /// Maximum rows.
    pub limit: usize,
    /// Tie-break after relevance and occurrence count.
    pub id_order: IdOrder,
}

impl KnowledgeStore {
    /// Records a new error with an occurrence count of 1.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    #[instrument(skip(self, error), fields(operation = "add_common_error", backend = "sqlite", technology = %error.technology))]
    pub fn add_common_error(&self, error: &NewCommonError) -> Result<i64> {
        self.write("add_common_error", |tx| {
            let now = current_timestamp();
            tx.execute(
                "INSERT INTO common_errors
                    (technology, error_pattern, root_cause, solution, code_example,
                     occurrence_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                params![
                    error.technology,
                    error.error_pattern,
                    error.root_cause,
                    error.solution,
                    error.code_example,
                    now
                ],
            )
            .map_err(|e| Error::operation("insert_common_error", e))?;

            let id = tx.last_insert_rowid();
            FtsTable::Errors.upsert(
                tx,
                id,
                &[
                    Some(error.error_pattern.as_str()),
                    error.root_cause.as_deref(),
                    Some(error.solution.as_str()),
                ],
            )?;
            Ok(id)
        })
    }

    /// Bumps an error's occurrence count and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the error does not exist.
    #[instrument(skip(self), fields(operation = "increment_error_count", backend = "sqlite", error.id = id))]
    pub fn increment_error_count(&self, id: i64) -> Result<i64> {
        self.write("increment_error_count", |tx| {
            tx.query_row(
                "UPDATE common_errors
                 SET occurrence_count = occurrence_count + 1, updated_at = ?2
                 WHERE id = ?1
                 RETURNING occurrence_count",
                params![id, current_timestamp()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::operation("increment_error_count", e))?
            .ok_or(Error::NotFound { kind: "Error", id })
        })
    }
}

impl StoreReader {
    /// Fetches one error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the error does not exist.
    pub fn get_common_error(&self, id: i64) -> Result<CommonError> {
        measured("get_common_error", || {
            self.conn
                .query_row(
                    &format!("SELECT {ERROR_COLUMNS} FROM common_errors e WHERE e.id = ?1"),
                    [id],
                    error_from_row,
                )
                .optional()
                .map_err(|e| Error::operation("get_common_error", e))?
                .ok_or(Error::NotFound { kind: "Error", id })
        })
    }

    /// Searches errors; returns each hit with its relevance.
    ///
    /// Hits order by relevance, then occurrence count (highest first), then
    /// id in the requested direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self, search), fields(operation = "search_errors", backend = "sqlite", limit = search.limit))]
    pub fn search_errors(&self, search: &ErrorSearch<'_>) -> Result<Vec<(CommonError, f64)>> {
        measured("search_errors", || {
            let mut filter = FilterBuilder::new();
            let (from, relevance) = match search.query {
                MatchQuery::Nothing => return Ok(Vec::new()),
                MatchQuery::All => ("common_errors e", "1.0"),
                MatchQuery::Terms(expr) => {
                    let p = filter.bind(expr.clone());
                    filter.push(format!("errors_fts MATCH {p}"));
                    (
                        "errors_fts JOIN common_errors e ON e.id = errors_fts.rowid",
                        FtsTable::Errors.relevance_expr(),
                    )
                },
            };
            if let Some(technology) = search.technology {
                filter.eq("e.technology", technology.to_string());
            }

            let clause = filter.where_clause();
            let limit = filter.bind(sql_limit(search.limit));
            let sql = format!(
                "SELECT {ERROR_COLUMNS}, {relevance} AS relevance
                 FROM {from}{clause}
                 ORDER BY relevance DESC, e.occurrence_count DESC, e.id {}
                 LIMIT {limit}",
                search.id_order.sql()
            );

            let mut stmt = self
                .conn
                .prepare(&sql)
                .map_err(|e| Error::operation("prepare_search_errors", e))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(filter.into_params()), |row| {
                    Ok((error_from_row(row)?, row.get::<_, f64>(9)?))
                })
                .map_err(|e| Error::operation("execute_search_errors", e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("read_error_row", e))
        })
    }

    /// Lists errors in id order, optionally for one technology.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_common_errors(&self, technology: Option<&str>) -> Result<Vec<CommonError>> {
        measured("list_common_errors", || {
            let mut filter = FilterBuilder::new();
            if let Some(technology) = technology {
                filter.eq("e.technology", technology.to_string());
            }
            let sql = format!(
                "SELECT {ERROR_COLUMNS} FROM common_errors e{} ORDER BY e.id",
                filter.where_clause()
            );

            let mut stmt = self
                .conn
                .prepare(&sql)
                .map_err(|e| Error::operation("prepare_list_errors", e))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(filter.into_params()), error_from_row)
                .map_err(|e| Error::operation("list_errors", e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("read_error_row", e))
        })
    }
}
