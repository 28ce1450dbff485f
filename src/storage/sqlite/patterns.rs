//! Swift pattern rows and their index mirror.

use super::connection::VERSION_LE_FUNCTION;
use super::rows::{PATTERN_COLUMNS, encode_related_apis, pattern_from_row};
use super::sql::{FilterBuilder, sql_limit};
use super::{KnowledgeStore, StoreReader, measured};
use crate::models::{NewSwiftPattern, SwiftPattern};
use crate::storage::fts::{FtsTable, MatchQuery};
use crate::{Error, Result, current_timestamp};
use rusqlite::{OptionalExtension, params};
use tracing::instrument;

/// Parameters of a pattern search.
#[derive(Debug, Clone, Copy)]
pub struct PatternSearch<'a> {
    /// Sanitized search text.
    pub query: &'a MatchQuery,
    /// Keep patterns whose iOS minimum is unset or at most this.
    pub ios_version: Option<&'a str>,
    /// Keep patterns whose Swift minimum is unset or at most this.
    pub swift_version: Option<&'a str>,
    /// Maximum rows.
    pub limit: usize,
}

impl KnowledgeStore {
    /// Records a new pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    #[instrument(skip(self, pattern), fields(operation = "add_swift_pattern", backend = "sqlite", pattern = %pattern.pattern_name))]
    pub fn add_swift_pattern(&self, pattern: &NewSwiftPattern) -> Result<i64> {
        let related_apis = encode_related_apis(&pattern.related_apis)?;
        self.write("add_swift_pattern", |tx| {
            let now = current_timestamp();
            tx.execute(
                "INSERT INTO swift_patterns
                    (pattern_name, description, code_example, when_to_use, when_not_to_use,
                     related_apis, ios_version, swift_version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    pattern.pattern_name,
                    pattern.description,
                    pattern.code_example,
                    pattern.when_to_use,
                    pattern.when_not_to_use,
                    related_apis,
                    pattern.ios_version,
                    pattern.swift_version,
                    now
                ],
            )
            .map_err(|e| Error::operation("insert_swift_pattern", e))?;

            let id = tx.last_insert_rowid();
            FtsTable::Patterns.upsert(
                tx,
                id,
                &[
                    Some(pattern.pattern_name.as_str()),
                    Some(pattern.description.as_str()),
                    pattern.when_to_use.as_deref(),
                ],
            )?;
            Ok(id)
        })
    }
}

impl StoreReader {
    /// Fetches one pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the pattern does not exist.
    pub fn get_swift_pattern(&self, id: i64) -> Result<SwiftPattern> {
        measured("get_swift_pattern", || {
            self.conn
                .query_row(
                    &format!("SELECT {PATTERN_COLUMNS} FROM swift_patterns p WHERE p.id = ?1"),
                    [id],
                    pattern_from_row,
                )
                .optional()
                .map_err(|e| Error::operation("get_swift_pattern", e))?
                .ok_or(Error::NotFound { kind: "Pattern", id })
        })
    }

    /// Searches patterns; returns each hit with its relevance.
    ///
    /// Hits order by relevance, then newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self, search), fields(operation = "search_patterns", backend = "sqlite", limit = search.limit))]
    pub fn search_patterns(&self, search: &PatternSearch<'_>) -> Result<Vec<(SwiftPattern, f64)>> {
        measured("search_patterns", || {
            let mut filter = FilterBuilder::new();
            let (from, relevance) = match search.query {
                MatchQuery::Nothing => return Ok(Vec::new()),
                MatchQuery::All => ("swift_patterns p", "1.0"),
                MatchQuery::Terms(expr) => {
                    let p = filter.bind(expr.clone());
                    filter.push(format!("patterns_fts MATCH {p}"));
                    (
                        "patterns_fts JOIN swift_patterns p ON p.id = patterns_fts.rowid",
                        FtsTable::Patterns.relevance_expr(),
                    )
                },
            };
            for (column, version) in [
                ("p.ios_version", search.ios_version),
                ("p.swift_version", search.swift_version),
            ] {
                if let Some(version) = version {
                    let p = filter.bind(version.to_string());
                    filter.push(format!(
                        "({column} IS NULL OR {VERSION_LE_FUNCTION}({column}, {p}))"
                    ));
                }
            }

            let clause = filter.where_clause();
            let limit = filter.bind(sql_limit(search.limit));
            let sql = format!(
                "SELECT {PATTERN_COLUMNS}, {relevance} AS relevance
                 FROM {from}{clause}
                 ORDER BY relevance DESC, p.id DESC
                 LIMIT {limit}"
            );

            let mut stmt = self
                .conn
                .prepare(&sql)
                .map_err(|e| Error::operation("prepare_search_patterns", e))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(filter.into_params()), |row| {
                    Ok((pattern_from_row(row)?, row.get::<_, f64>(11)?))
                })
                .map_err(|e| Error::operation("execute_search_patterns", e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("read_pattern_row", e))
        })
    }

    /// Lists every pattern in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_swift_patterns(&self) -> Result<Vec<SwiftPattern>> {
        measured("list_swift_patterns", || {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {PATTERN_COLUMNS} FROM swift_patterns p ORDER BY p.id"))
                .map_err(|e| Error::operation("prepare_list_patterns", e))?;
            let rows = stmt
                .query_map([], pattern_from_row)
                .map_err(|e| Error::operation("list_patterns", e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("read_pattern_row", e))
        })
    }
}
