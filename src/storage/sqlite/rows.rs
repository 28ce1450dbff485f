//! Row conversion between `SQLite` rows and model records.
//!
//! Column lists and the mappers that read them live side by side so a
//! `SELECT` and its mapper cannot drift apart. Mappers return
//! [`rusqlite::Result`] so they plug straight into `query_map`.
//!
//! Storage-edge encodings handled here:
//! - timestamps are Unix seconds
//! - session dates are `YYYY-MM-DD` text
//! - `related_apis` is a JSON array, or NULL when empty

use crate::models::{
    CommonError, Lesson, LessonCategory, SESSION_DATE_FORMAT, Session, SwiftPattern,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::collections::HashMap;

/// Lesson columns, aliased `l`. Tags are resolved separately.
pub const LESSON_COLUMNS: &str = "l.id, l.title, l.content, l.category, l.technology, \
     l.project_context, l.source_session, l.created_at, l.updated_at";

/// Error columns, aliased `e`.
pub const ERROR_COLUMNS: &str = "e.id, e.technology, e.error_pattern, e.root_cause, \
     e.solution, e.code_example, e.occurrence_count, e.created_at, e.updated_at";

/// Pattern columns, aliased `p`.
pub const PATTERN_COLUMNS: &str = "p.id, p.pattern_name, p.description, p.code_example, \
     p.when_to_use, p.when_not_to_use, p.related_apis, p.ios_version, p.swift_version, \
     p.created_at, p.updated_at";

/// Session columns, aliased `s`.
pub const SESSION_COLUMNS: &str =
    "s.id, s.date, s.project_name, s.session_log_path, s.summary, s.created_at";

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Reads a Unix-seconds column as a UTC timestamp.
pub fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

/// Maps a row selected with [`LESSON_COLUMNS`]; `tags` starts empty.
pub fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    let category: String = row.get(3)?;
    let category = category
        .parse::<LessonCategory>()
        .map_err(|e| conversion_error(3, Type::Text, e))?;

    Ok(Lesson {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category,
        technology: row.get(4)?,
        project_context: row.get(5)?,
        source_session: row.get(6)?,
        tags: Vec::new(),
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

/// Maps a row selected with [`ERROR_COLUMNS`].
pub fn error_from_row(row: &Row<'_>) -> rusqlite::Result<CommonError> {
    Ok(CommonError {
        id: row.get(0)?,
        technology: row.get(1)?,
        error_pattern: row.get(2)?,
        root_cause: row.get(3)?,
        solution: row.get(4)?,
        code_example: row.get(5)?,
        occurrence_count: row.get(6)?,
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

/// Maps a row selected with [`PATTERN_COLUMNS`].
pub fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<SwiftPattern> {
    let related_apis = match row.get::<_, Option<String>>(6)? {
        Some(json) => {
            serde_json::from_str(&json).map_err(|e| conversion_error(6, Type::Text, e))?
        },
        None => Vec::new(),
    };

    Ok(SwiftPattern {
        id: row.get(0)?,
        pattern_name: row.get(1)?,
        description: row.get(2)?,
        code_example: row.get(3)?,
        when_to_use: row.get(4)?,
        when_not_to_use: row.get(5)?,
        related_apis,
        ios_version: row.get(7)?,
        swift_version: row.get(8)?,
        created_at: timestamp(row, 9)?,
        updated_at: timestamp(row, 10)?,
    })
}

/// Maps a row selected with [`SESSION_COLUMNS`].
pub fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let date: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date, SESSION_DATE_FORMAT)
        .map_err(|e| conversion_error(1, Type::Text, e))?;

    Ok(Session {
        id: row.get(0)?,
        date,
        project_name: row.get(2)?,
        session_log_path: row.get(3)?,
        summary: row.get(4)?,
        created_at: timestamp(row, 5)?,
    })
}

/// Encodes `related_apis` for storage.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_related_apis(apis: &[String]) -> Result<Option<String>> {
    if apis.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(apis)
        .map(Some)
        .map_err(|e| Error::operation("encode_related_apis", e))
}

/// Fetches tag names for a batch of lessons in one query.
///
/// Names come back sorted per lesson. Lessons without tags are absent from
/// the map.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fetch_tags(conn: &Connection, lesson_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    let mut tags: HashMap<i64, Vec<String>> = HashMap::with_capacity(lesson_ids.len());
    if lesson_ids.is_empty() {
        return Ok(tags);
    }

    let ids = serde_json::Value::from(lesson_ids.to_vec()).to_string();
    let mut stmt = conn
        .prepare_cached(
            "SELECT lt.lesson_id, t.name
             FROM lesson_tags lt
             JOIN tags t ON t.id = lt.tag_id
             WHERE lt.lesson_id IN (SELECT value FROM json_each(?1))
             ORDER BY lt.lesson_id, t.name",
        )
        .map_err(|e| Error::operation("prepare_fetch_tags", e))?;

    let rows = stmt
        .query_map([ids], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| Error::operation("fetch_tags", e))?;

    for row in rows {
        let (lesson_id, name) = row.map_err(|e| Error::operation("read_tag_row", e))?;
        tags.entry(lesson_id).or_default().push(name);
    }

    Ok(tags)
}

/// Fills in `tags` for each lesson.
///
/// # Errors
///
/// Returns an error if the tag query fails.
pub fn attach_tags(conn: &Connection, lessons: &mut [Lesson]) -> Result<()> {
    let ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
    let mut tags = fetch_tags(conn, &ids)?;
    for lesson in lessons {
        lesson.tags = tags.remove(&lesson.id).unwrap_or_default();
    }
    Ok(())
}
