//! Grouped listings and dashboard statistics.

use super::rows::timestamp;
use super::{StoreReader, measured};
use crate::models::{
    ErrorSummary, LessonCategory, RecentLesson, Statistics, TagUsage, TechnologyCount,
    TechnologyTally,
};
use crate::{Error, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::collections::BTreeMap;
use tracing::instrument;

/// Characters of an error pattern shown on the dashboard.
pub const ERROR_PATTERN_PREVIEW_CHARS: usize = 100;

const TOP_TECHNOLOGIES: i64 = 10;
const TOP_ERRORS: i64 = 5;
const RECENT_LESSONS: i64 = 5;

impl StoreReader {
    /// Counts lessons and errors per technology, sorted by name.
    ///
    /// Lessons without a technology are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self), fields(operation = "list_technologies", backend = "sqlite"))]
    pub fn list_technologies(&self) -> Result<Vec<TechnologyCount>> {
        measured("list_technologies", || {
            collect(
                &self.conn,
                "list_technologies",
                "SELECT technology, SUM(lessons), SUM(errors)
                 FROM (
                     SELECT technology, 1 AS lessons, 0 AS errors
                     FROM lessons WHERE technology IS NOT NULL
                     UNION ALL
                     SELECT technology, 0, 1 FROM common_errors
                 )
                 GROUP BY technology
                 ORDER BY technology ASC",
                [],
                |row| {
                    let lesson_count: i64 = row.get(1)?;
                    let error_count: i64 = row.get(2)?;
                    Ok(TechnologyCount {
                        technology: row.get(0)?,
                        lesson_count,
                        error_count,
                        total_count: lesson_count + error_count,
                    })
                },
            )
        })
    }

    /// Lists every tag with its lesson count, most used first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self), fields(operation = "list_tags", backend = "sqlite"))]
    pub fn list_tags(&self) -> Result<Vec<TagUsage>> {
        measured("list_tags", || {
            collect(
                &self.conn,
                "list_tags",
                "SELECT t.name, COUNT(lt.lesson_id) AS usage_count
                 FROM tags t
                 LEFT JOIN lesson_tags lt ON lt.tag_id = t.id
                 GROUP BY t.id
                 ORDER BY usage_count DESC, t.name ASC",
                [],
                |row| {
                    Ok(TagUsage {
                        tag: row.get(0)?,
                        usage_count: row.get(1)?,
                    })
                },
            )
        })
    }

    /// Builds the dashboard statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fails.
    #[instrument(skip(self), fields(operation = "get_statistics", backend = "sqlite"))]
    pub fn statistics(&self) -> Result<Statistics> {
        measured("get_statistics", || {
            let conn = &self.conn;
            let (total_lessons, total_errors, total_patterns, total_sessions, total_tags, occurrences): (
                i64,
                i64,
                i64,
                i64,
                i64,
                i64,
            ) = conn
                .query_row(
                    "SELECT (SELECT COUNT(*) FROM lessons),
                            (SELECT COUNT(*) FROM common_errors),
                            (SELECT COUNT(*) FROM swift_patterns),
                            (SELECT COUNT(*) FROM sessions),
                            (SELECT COUNT(*) FROM tags),
                            (SELECT COALESCE(SUM(occurrence_count), 0) FROM common_errors)",
                    [],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .map_err(|e| Error::operation("count_totals", e))?;

            let lessons_by_category: BTreeMap<String, i64> = collect(
                conn,
                "lessons_by_category",
                "SELECT category, COUNT(*) FROM lessons GROUP BY category",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?
            .into_iter()
            .collect();

            let top_technologies = collect(
                conn,
                "top_technologies",
                "SELECT technology, COUNT(*) AS count
                 FROM lessons WHERE technology IS NOT NULL
                 GROUP BY technology
                 ORDER BY count DESC, technology ASC
                 LIMIT ?1",
                [TOP_TECHNOLOGIES],
                |row| {
                    Ok(TechnologyTally {
                        technology: row.get(0)?,
                        count: row.get(1)?,
                    })
                },
            )?;

            let most_common_errors = collect(
                conn,
                "most_common_errors",
                "SELECT id, technology, error_pattern, occurrence_count
                 FROM common_errors
                 ORDER BY occurrence_count DESC, id ASC
                 LIMIT ?1",
                [TOP_ERRORS],
                |row| {
                    let pattern: String = row.get(2)?;
                    Ok(ErrorSummary {
                        id: row.get(0)?,
                        technology: row.get(1)?,
                        error_pattern: pattern.chars().take(ERROR_PATTERN_PREVIEW_CHARS).collect(),
                        occurrence_count: row.get(3)?,
                    })
                },
            )?;

            let recent_lessons = collect(
                conn,
                "recent_lessons",
                "SELECT id, title, category, technology, created_at
                 FROM lessons
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
                [RECENT_LESSONS],
                recent_lesson_from_row,
            )?;

            Ok(Statistics {
                total_lessons,
                total_errors,
                total_patterns,
                total_sessions,
                total_tags,
                lessons_by_category,
                top_technologies,
                most_common_errors,
                recent_lessons,
                total_error_occurrences: occurrences,
            })
        })
    }
}

fn recent_lesson_from_row(row: &Row<'_>) -> rusqlite::Result<RecentLesson> {
    let category: String = row.get(2)?;
    let category = category.parse::<LessonCategory>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
    })?;
    Ok(RecentLesson {
        id: row.get(0)?,
        title: row.get(1)?,
        category,
        technology: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn collect<T, P: rusqlite::Params>(
    conn: &Connection,
    operation: &'static str,
    sql: &str,
    params: P,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| Error::operation(operation, e))?;
    let rows = stmt
        .query_map(params, map)
        .map_err(|e| Error::operation(operation, e))?;
    rows.collect::<rusqlite::Result<Vec<T>>>()
        .map_err(|e| Error::operation(operation, e))
}

#[cfg(test)]
mod tests {
    use crate::config::DatabaseConfig;
    use crate::models::{LessonCategory, NewCommonError, NewLesson};
    use crate::storage::KnowledgeStore;
    use tempfile::TempDir;

    fn store() -> (TempDir, KnowledgeStore) {
        let dir = TempDir::new().unwrap();
        let store = KnowledgeStore::open(&DatabaseConfig::at(dir.path().join("k.db"))).unwrap();
        (dir, store)
    }

    #[test]
    fn test_list_technologies_merges_kinds() {
        let (_dir, store) = store();
        store
            .add_lesson(&NewLesson::new("a", "b", LessonCategory::Gotcha).with_technology("swift"))
            .unwrap();
        store
            .add_lesson(&NewLesson::new("untagged", "b", LessonCategory::Gotcha))
            .unwrap();
        store.add_common_error(&NewCommonError::new("swift", "e", "s")).unwrap();
        store.add_common_error(&NewCommonError::new("git", "e", "s")).unwrap();

        let techs = store.read(|r| r.list_technologies()).unwrap();
        assert_eq!(techs.len(), 2);
        assert_eq!(techs[0].technology, "git");
        assert_eq!((techs[0].lesson_count, techs[0].error_count), (0, 1));
        assert_eq!(techs[1].technology, "swift");
        assert_eq!(techs[1].total_count, 2);
    }

    #[test]
    fn test_list_tags_includes_unused() {
        let (_dir, store) = store();
        let id = store
            .add_lesson(&NewLesson::new("a", "b", LessonCategory::Gotcha).with_tags(["x", "y"]))
            .unwrap();
        store
            .add_lesson(&NewLesson::new("c", "d", LessonCategory::Gotcha).with_tags(["y"]))
            .unwrap();
        store.delete_lesson(id).unwrap();

        let tags = store.read(|r| r.list_tags()).unwrap();
        let pairs: Vec<(&str, i64)> = tags.iter().map(|t| (t.tag.as_str(), t.usage_count)).collect();
        assert_eq!(pairs, vec![("y", 1), ("x", 0)]);
    }

    #[test]
    fn test_statistics() {
        let (_dir, store) = store();
        store
            .add_lesson(&NewLesson::new("a", "b", LessonCategory::Gotcha).with_technology("swift"))
            .unwrap();
        store
            .add_lesson(&NewLesson::new("c", "d", LessonCategory::Pattern).with_technology("swift"))
            .unwrap();
        let long = "x".repeat(150);
        let err = store.add_common_error(&NewCommonError::new("swift", long, "s")).unwrap();
        store.increment_error_count(err).unwrap();
        store.add_common_error(&NewCommonError::new("swift", "short", "s")).unwrap();

        let stats = store.read(|r| r.statistics()).unwrap();
        assert_eq!(stats.total_lessons, 2);
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.total_patterns, 0);
        assert_eq!(stats.total_error_occurrences, 3);
        assert_eq!(stats.lessons_by_category.get("gotcha"), Some(&1));
        assert!(!stats.lessons_by_category.contains_key("decision"));
        assert_eq!(stats.top_technologies[0].count, 2);
        assert_eq!(stats.most_common_errors[0].id, err);
        assert_eq!(stats.most_common_errors[0].error_pattern.len(), 100);
        assert_eq!(stats.recent_lessons[0].title, "c");
    }

    #[test]
    fn test_statistics_on_empty_store() {
        let (_dir, store) = store();
        let stats = store.read(|r| r.statistics()).unwrap();
        assert_eq!(stats.total_error_occurrences, 0);
        assert!(stats.recent_lessons.is_empty());
        assert!(stats.lessons_by_category.is_empty());
    }
}
