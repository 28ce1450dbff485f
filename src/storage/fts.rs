//! FTS5 search index mirror.
//!
//! Each searchable entity table has a standalone FTS5 table keyed by
//! `rowid = entity id`. Writes to an entity go through [`FtsTable::upsert`]
//! and [`FtsTable::remove`] inside the same transaction, so the index never
//! disagrees with the rows it mirrors.
//!
//! User text reaches `MATCH` only through [`MatchQuery::parse`], which turns
//! every whitespace-separated term into a quoted FTS5 string. Operators,
//! column filters, and prefix stars in the input are therefore literal.

use crate::{Error, Result};
use rusqlite::Connection;
use rusqlite::types::Value;

/// The full-text tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtsTable {
    /// `lessons_fts(title, content)`.
    Lessons,
    /// `errors_fts(error_pattern, root_cause, solution)`.
    Errors,
    /// `patterns_fts(pattern_name, description, when_to_use)`.
    Patterns,
}

impl FtsTable {
    /// Table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lessons => "lessons_fts",
            Self::Errors => "errors_fts",
            Self::Patterns => "patterns_fts",
        }
    }

    /// Indexed columns, in declaration order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Lessons => &["title", "content"],
            Self::Errors => &["error_pattern", "root_cause", "solution"],
            Self::Patterns => &["pattern_name", "description", "when_to_use"],
        }
    }

    /// Relevance expression for a `MATCH` query; higher is better.
    ///
    /// The first column (title, error pattern, pattern name) weighs double.
    #[must_use]
    pub const fn relevance_expr(self) -> &'static str {
        match self {
            Self::Lessons => "-bm25(lessons_fts, 2.0, 1.0)",
            Self::Errors => "-bm25(errors_fts, 2.0, 1.0, 1.0)",
            Self::Patterns => "-bm25(patterns_fts, 2.0, 1.0, 1.0)",
        }
    }

    /// Replaces the index row for `id`.
    ///
    /// `fields` line up with [`Self::columns`]; `None` indexes as NULL.
    ///
    /// # Errors
    ///
    /// Returns an error if the field count is wrong or a statement fails.
    pub fn upsert(self, conn: &Connection, id: i64, fields: &[Option<&str>]) -> Result<()> {
        let columns = self.columns();
        if fields.len() != columns.len() {
            return Err(Error::operation(
                "index_upsert",
                format!(
                    "{} expects {} fields, got {}",
                    self.name(),
                    columns.len(),
                    fields.len()
                ),
            ));
        }

        self.remove(conn, id)?;

        let placeholders: Vec<String> = (2..=fields.len() + 1).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} (rowid, {}) VALUES (?1, {})",
            self.name(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let params = std::iter::once(Value::Integer(id)).chain(fields.iter().map(|f| {
            f.map_or(Value::Null, |s| Value::Text(s.to_string()))
        }));

        conn.execute(&sql, rusqlite::params_from_iter(params))
            .map_err(|e| Error::operation("index_upsert", e))?;
        Ok(())
    }

    /// Removes the index row for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(self, conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE rowid = ?1", self.name()),
            [id],
        )
        .map_err(|e| Error::operation("index_remove", e))?;
        Ok(())
    }
}

/// A sanitized search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchQuery {
    /// Blank input: list everything, unranked.
    All,
    /// An FTS5 expression of quoted terms, implicitly AND-ed.
    Terms(String),
    /// Input with no searchable term; matches nothing.
    Nothing,
}

impl MatchQuery {
    /// Sanitizes raw search text.
    ///
    /// Terms without any alphanumeric character are dropped, since the
    /// tokenizer would reduce them to nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use hindsight::storage::MatchQuery;
    ///
    /// assert_eq!(MatchQuery::parse("  "), MatchQuery::All);
    /// assert_eq!(
    ///     MatchQuery::parse("async -await"),
    ///     MatchQuery::Terms(r#""async" "-await""#.to_string())
    /// );
    /// assert_eq!(MatchQuery::parse("*** ()"), MatchQuery::Nothing);
    /// ```
    #[must_use]
    pub fn parse(query: &str) -> Self {
        if query.trim().is_empty() {
            return Self::All;
        }

        let terms: Vec<String> = query
            .split_whitespace()
            .filter(|term| term.chars().any(char::is_alphanumeric))
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect();

        if terms.is_empty() {
            Self::Nothing
        } else {
            Self::Terms(terms.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::{MIGRATIONS, run_migrations};

    fn indexed_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn, MIGRATIONS).unwrap();
        conn
    }

    fn try_matches(conn: &Connection, table: FtsTable, query: &str) -> rusqlite::Result<Vec<i64>> {
        let MatchQuery::Terms(expr) = MatchQuery::parse(query) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT rowid FROM {name} WHERE {name} MATCH ?1 ORDER BY {rel} DESC",
            name = table.name(),
            rel = table.relevance_expr()
        );
        let mut stmt = conn.prepare(&sql)?;
        stmt.query_map([expr], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()
    }

    fn matches(conn: &Connection, table: FtsTable, query: &str) -> Vec<i64> {
        try_matches(conn, table, query).unwrap()
    }

    #[test]
    fn test_parse_quotes_and_escapes() {
        assert_eq!(
            MatchQuery::parse(r#"say "hi" NOT"#),
            MatchQuery::Terms(r#""say" """hi""" "NOT""#.to_string())
        );
        assert_eq!(MatchQuery::parse("\t\n"), MatchQuery::All);
        assert_eq!(MatchQuery::parse("- * :"), MatchQuery::Nothing);
    }

    #[test]
    fn test_special_characters_do_not_error() {
        let conn = indexed_conn();
        FtsTable::Lessons
            .upsert(
                &conn,
                1,
                &[
                    Some("Optional chaining"),
                    Some("Error: unexpected 'syntax' in /path/to/file.swift:42"),
                ],
            )
            .unwrap();

        for query in [
            "file.swift",
            "\"unbalanced",
            "title:chaining",
            "syntax*",
            "(error) AND OR NOT",
            "NEAR(a b)",
            "^start",
        ] {
            let result = try_matches(&conn, FtsTable::Lessons, query);
            assert!(result.is_ok(), "{query:?}: {result:?}");
        }

        assert_eq!(matches(&conn, FtsTable::Lessons, "file.swift"), vec![1]);
    }

    #[test]
    fn test_terms_are_and_ed() {
        let conn = indexed_conn();
        FtsTable::Lessons
            .upsert(&conn, 1, &[Some("SwiftUI state"), Some("Use @State for local values")])
            .unwrap();
        FtsTable::Lessons
            .upsert(&conn, 2, &[Some("Combine"), Some("Publishers and state")])
            .unwrap();

        assert_eq!(matches(&conn, FtsTable::Lessons, "state").len(), 2);
        assert_eq!(matches(&conn, FtsTable::Lessons, "swiftui state"), vec![1]);
    }

    #[test]
    fn test_porter_stemming() {
        let conn = indexed_conn();
        FtsTable::Errors
            .upsert(
                &conn,
                7,
                &[Some("Thread crashes on launch"), None, Some("Move work off main")],
            )
            .unwrap();

        assert_eq!(matches(&conn, FtsTable::Errors, "crashing"), vec![7]);
    }

    #[test]
    fn test_upsert_replaces_and_remove_deletes() {
        let conn = indexed_conn();
        FtsTable::Patterns
            .upsert(&conn, 3, &[Some("Actor"), Some("old text"), None])
            .unwrap();
        FtsTable::Patterns
            .upsert(&conn, 3, &[Some("Actor"), Some("isolation"), None])
            .unwrap();

        assert!(matches(&conn, FtsTable::Patterns, "old").is_empty());
        assert_eq!(matches(&conn, FtsTable::Patterns, "isolation"), vec![3]);

        FtsTable::Patterns.remove(&conn, 3).unwrap();
        assert!(matches(&conn, FtsTable::Patterns, "actor").is_empty());
    }

    #[test]
    fn test_title_weighs_more_than_content() {
        let conn = indexed_conn();
        FtsTable::Lessons
            .upsert(&conn, 1, &[Some("Networking"), Some("retain cycles in closures")])
            .unwrap();
        FtsTable::Lessons
            .upsert(&conn, 2, &[Some("Retain cycles"), Some("networking closures")])
            .unwrap();

        assert_eq!(matches(&conn, FtsTable::Lessons, "retain"), vec![2, 1]);
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        let conn = indexed_conn();
        let err = FtsTable::Lessons.upsert(&conn, 1, &[Some("only one")]).unwrap_err();
        assert!(err.to_string().contains("expects 2 fields"));
    }
}
