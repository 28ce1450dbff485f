//! Lesson rows, their tag links, and their index mirror.

use super::rows::{LESSON_COLUMNS, attach_tags, fetch_tags, lesson_from_row};
use super::sql::{FilterBuilder, json_list, sql_limit};
use super::{KnowledgeStore, StoreReader, measured};
use crate::models::{Lesson, LessonPatch, NewLesson};
use crate::storage::fts::{FtsTable, MatchQuery};
use crate::{Error, Result, current_timestamp};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use tracing::instrument;

/// Parameters of a lesson search.
#[derive(Debug, Clone, Copy)]
pub struct LessonSearch<'a> {
    /// Sanitized search text.
    pub query: &'a MatchQuery,
    /// Technology equality filter.
    pub technology: Option<&'a str>,
    /// Any-of tag filter; empty means no filter.
    pub tags: &'a [String],
    /// Maximum rows.
    pub limit: usize,
}

impl KnowledgeStore {
    /// Inserts a lesson with its tags and index entry; returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is written then.
    #[instrument(skip(self, lesson), fields(operation = "add_lesson", backend = "sqlite", tags = lesson.tags.len()))]
    pub fn add_lesson(&self, lesson: &NewLesson) -> Result<i64> {
        self.write("add_lesson", |tx| {
            let now = current_timestamp();
            tx.execute(
                "INSERT INTO lessons
                    (title, content, category, technology, project_context, source_session,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    lesson.title,
                    lesson.content,
                    lesson.category.as_str(),
                    lesson.technology,
                    lesson.project_context,
                    lesson.source_session,
                    now
                ],
            )
            .map_err(|e| Error::operation("insert_lesson", e))?;

            let id = tx.last_insert_rowid();
            link_tags(tx, id, &lesson.tags)?;
            FtsTable::Lessons.upsert(
                tx,
                id,
                &[Some(lesson.title.as_str()), Some(lesson.content.as_str())],
            )?;
            Ok(id)
        })
    }

    /// Applies a partial update.
    ///
    /// `updated_at` is always refreshed. When the patch carries tags, the
    /// lesson's tag set is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the lesson does not exist.
    #[instrument(skip(self, patch), fields(operation = "update_lesson", backend = "sqlite", lesson.id = id))]
    pub fn update_lesson(&self, id: i64, patch: &LessonPatch) -> Result<()> {
        self.write("update_lesson", |tx| {
            let mut assignments = FilterBuilder::new();
            let mut sets = Vec::new();
            if let Some(title) = &patch.title {
                sets.push(format!("title = {}", assignments.bind(title.clone())));
            }
            if let Some(content) = &patch.content {
                sets.push(format!("content = {}", assignments.bind(content.clone())));
            }
            if let Some(category) = patch.category {
                sets.push(format!(
                    "category = {}",
                    assignments.bind(category.as_str().to_string())
                ));
            }
            if let Some(technology) = &patch.technology {
                sets.push(format!(
                    "technology = {}",
                    assignments.bind(technology.clone().map_or(Value::Null, Value::Text))
                ));
            }
            if let Some(project) = &patch.project_context {
                sets.push(format!(
                    "project_context = {}",
                    assignments.bind(project.clone().map_or(Value::Null, Value::Text))
                ));
            }
            sets.push(format!("updated_at = {}", assignments.bind(current_timestamp())));
            let id_param = assignments.bind(id);

            let sql = format!("UPDATE lessons SET {} WHERE id = {id_param}", sets.join(", "));
            let changed = tx
                .execute(&sql, rusqlite::params_from_iter(assignments.into_params()))
                .map_err(|e| Error::operation("update_lesson", e))?;
            if changed == 0 {
                return Err(Error::NotFound { kind: "Lesson", id });
            }

            if let Some(tags) = &patch.tags {
                tx.execute("DELETE FROM lesson_tags WHERE lesson_id = ?1", [id])
                    .map_err(|e| Error::operation("clear_lesson_tags", e))?;
                link_tags(tx, id, tags)?;
            }

            let (title, content): (String, String) = tx
                .query_row(
                    "SELECT title, content FROM lessons WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| Error::operation("reload_lesson", e))?;
            FtsTable::Lessons.upsert(tx, id, &[Some(title.as_str()), Some(content.as_str())])
        })
    }

    /// Deletes a lesson, its tag links, and its index entry.
    ///
    /// Tag rows are kept. Returns false if the lesson did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    #[instrument(skip(self), fields(operation = "delete_lesson", backend = "sqlite", lesson.id = id))]
    pub fn delete_lesson(&self, id: i64) -> Result<bool> {
        self.write("delete_lesson", |tx| {
            let deleted = tx
                .execute("DELETE FROM lessons WHERE id = ?1", [id])
                .map_err(|e| Error::operation("delete_lesson", e))?;
            FtsTable::Lessons.remove(tx, id)?;
            Ok(deleted > 0)
        })
    }
}

impl StoreReader {
    /// Fetches one lesson with its tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the lesson does not exist.
    pub fn get_lesson(&self, id: i64) -> Result<Lesson> {
        measured("get_lesson", || {
            let mut lesson = self
                .conn
                .query_row(
                    &format!("SELECT {LESSON_COLUMNS} FROM lessons l WHERE l.id = ?1"),
                    [id],
                    lesson_from_row,
                )
                .optional()
                .map_err(|e| Error::operation("get_lesson", e))?
                .ok_or(Error::NotFound { kind: "Lesson", id })?;

            lesson.tags = fetch_tags(&self.conn, &[id])?
                .remove(&id)
                .unwrap_or_default();
            Ok(lesson)
        })
    }

    /// Searches lessons; returns each hit with its relevance.
    ///
    /// Ranked hits order by relevance, then newest first. Unranked hits all
    /// score 1.0 and order newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self, search), fields(operation = "search_lessons", backend = "sqlite", limit = search.limit))]
    pub fn search_lessons(&self, search: &LessonSearch<'_>) -> Result<Vec<(Lesson, f64)>> {
        measured("search_lessons", || {
            let mut filter = FilterBuilder::new();
            let (from, relevance) = match search.query {
                MatchQuery::Nothing => return Ok(Vec::new()),
                MatchQuery::All => ("lessons l", "1.0"),
                MatchQuery::Terms(expr) => {
                    let p = filter.bind(expr.clone());
                    filter.push(format!("lessons_fts MATCH {p}"));
                    (
                        "lessons_fts JOIN lessons l ON l.id = lessons_fts.rowid",
                        FtsTable::Lessons.relevance_expr(),
                    )
                },
            };
            apply_filters(&mut filter, search.technology, search.tags);

            let clause = filter.where_clause();
            let limit = filter.bind(sql_limit(search.limit));
            let sql = format!(
                "SELECT {LESSON_COLUMNS}, {relevance} AS relevance
                 FROM {from}{clause}
                 ORDER BY relevance DESC, l.created_at DESC, l.id DESC
                 LIMIT {limit}"
            );

            let hits = query_lessons_with(&self.conn, &sql, filter.into_params(), |row| {
                Ok((lesson_from_row(row)?, row.get::<_, f64>(9)?))
            })?;

            let (mut lessons, scores): (Vec<Lesson>, Vec<f64>) = hits.into_iter().unzip();
            attach_tags(&self.conn, &mut lessons)?;
            Ok(lessons.into_iter().zip(scores).collect())
        })
    }

    /// Lists lessons in id order, optionally for one technology.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_lessons(&self, technology: Option<&str>) -> Result<Vec<Lesson>> {
        measured("list_lessons", || {
            let mut filter = FilterBuilder::new();
            apply_filters(&mut filter, technology, &[]);
            let sql = format!(
                "SELECT {LESSON_COLUMNS} FROM lessons l{} ORDER BY l.id",
                filter.where_clause()
            );
            let mut lessons =
                query_lessons_with(&self.conn, &sql, filter.into_params(), lesson_from_row)?;
            attach_tags(&self.conn, &mut lessons)?;
            Ok(lessons)
        })
    }
}

fn apply_filters(filter: &mut FilterBuilder, technology: Option<&str>, tags: &[String]) {
    if let Some(technology) = technology {
        filter.eq("l.technology", technology.to_string());
    }
    if !tags.is_empty() {
        let p = filter.bind(json_list(tags));
        filter.push(format!(
            "EXISTS (SELECT 1 FROM lesson_tags lt JOIN tags t ON t.id = lt.tag_id
                     WHERE lt.lesson_id = l.id AND t.name IN (SELECT value FROM json_each({p})))"
        ));
    }
}

fn query_lessons_with<T>(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
    map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::operation("prepare_lesson_query", e))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), map)
        .map_err(|e| Error::operation("execute_lesson_query", e))?;
    rows.collect::<rusqlite::Result<Vec<T>>>()
        .map_err(|e| Error::operation("read_lesson_row", e))
}

/// Links `tags` to a lesson, creating tag rows on demand.
///
/// Duplicate names collapse; existing links are left alone.
fn link_tags(conn: &Connection, lesson_id: i64, tags: &[String]) -> Result<()> {
    let unique: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
    for name in unique {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [name])
            .map_err(|e| Error::operation("insert_tag", e))?;
        conn.execute(
            "INSERT OR IGNORE INTO lesson_tags (lesson_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![lesson_id, name],
        )
        .map_err(|e| Error::operation("link_tag", e))?;
    }
    Ok(())
}
