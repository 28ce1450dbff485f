//! Mutation API.
//!
//! Validates each write request at the boundary, then hands it to the store.
//! Validation failures come back as [`Error::InvalidInput`] before any
//! connection is opened.

use crate::models::{
    DottedVersion, LessonPatch, MutationOutcome, NewCommonError, NewLesson, NewSession,
    NewSwiftPattern, SESSION_DATE_FORMAT,
};
use crate::storage::KnowledgeStore;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

/// Write-side operations over the knowledge store.
#[derive(Debug, Clone)]
pub struct MutationApi {
    store: Arc<KnowledgeStore>,
}

impl MutationApi {
    /// Creates a mutation API over a shared store.
    #[must_use]
    pub const fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Records a lesson and links its tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `title` or `content` is blank, or
    /// a storage error.
    #[instrument(skip(self, lesson), fields(operation = "add_lesson"))]
    pub fn add_lesson(&self, lesson: &NewLesson) -> Result<MutationOutcome> {
        require("title", &lesson.title)?;
        require("content", &lesson.content)?;

        let lesson = NewLesson {
            tags: clean_tags(&lesson.tags),
            ..lesson.clone()
        };
        let id = self.store.add_lesson(&lesson)?;
        Ok(MutationOutcome::new(
            id,
            format!("Lesson '{}' added successfully", lesson.title),
        ))
    }

    /// Records a common error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a required field is blank, or a
    /// storage error.
    #[instrument(skip(self, error), fields(operation = "add_common_error"))]
    pub fn add_common_error(&self, error: &NewCommonError) -> Result<MutationOutcome> {
        require("technology", &error.technology)?;
        require("error_pattern", &error.error_pattern)?;
        require("solution", &error.solution)?;

        let id = self.store.add_common_error(error)?;
        Ok(MutationOutcome::new(id, "Common error added successfully"))
    }

    /// Records a Swift pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a required field is blank or a
    /// version is not dotted numeric, or a storage error.
    #[instrument(skip(self, pattern), fields(operation = "add_swift_pattern"))]
    pub fn add_swift_pattern(&self, pattern: &NewSwiftPattern) -> Result<MutationOutcome> {
        require("pattern_name", &pattern.pattern_name)?;
        require("description", &pattern.description)?;
        require("code_example", &pattern.code_example)?;

        let pattern = NewSwiftPattern {
            ios_version: checked_version(pattern.ios_version.as_deref())?,
            swift_version: checked_version(pattern.swift_version.as_deref())?,
            related_apis: pattern
                .related_apis
                .iter()
                .map(|api| api.trim())
                .filter(|api| !api.is_empty())
                .map(str::to_string)
                .collect(),
            ..pattern.clone()
        };
        let id = self.store.add_swift_pattern(&pattern)?;
        Ok(MutationOutcome::new(
            id,
            format!("Swift pattern '{}' added successfully", pattern.pattern_name),
        ))
    }

    /// Records a work session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the date is missing or not
    /// `YYYY-MM-DD`, or a storage error.
    #[instrument(skip(self, session), fields(operation = "add_session_context"))]
    pub fn add_session_context(&self, session: &NewSession) -> Result<MutationOutcome> {
        let date = parse_session_date(&session.date)?;
        let id = self.store.add_session(
            date,
            session.project_name.as_deref(),
            session.session_log_path.as_deref(),
            session.summary.as_deref(),
        )?;
        Ok(MutationOutcome::new(
            id,
            format!("Session for {} added successfully", date.format(SESSION_DATE_FORMAT)),
        ))
    }

    /// Applies a partial update to a lesson.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a provided title or content is
    /// blank, [`Error::NotFound`] when the lesson does not exist, or a
    /// storage error.
    #[instrument(skip(self, patch), fields(operation = "update_lesson", lesson.id = id))]
    pub fn update_lesson(&self, id: i64, patch: &LessonPatch) -> Result<MutationOutcome> {
        if let Some(title) = &patch.title {
            require("title", title)?;
        }
        if let Some(content) = &patch.content {
            require("content", content)?;
        }

        let patch = LessonPatch {
            tags: patch.tags.as_deref().map(clean_tags),
            ..patch.clone()
        };
        self.store.update_lesson(id, &patch)?;
        Ok(MutationOutcome::new(id, format!("Lesson {id} updated successfully")))
    }

    /// Bumps an error's occurrence count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the error does not exist, or a
    /// storage error.
    #[instrument(skip(self), fields(operation = "increment_error_count", error.id = id))]
    pub fn increment_error_count(&self, id: i64) -> Result<MutationOutcome> {
        let count = self.store.increment_error_count(id)?;
        Ok(
            MutationOutcome::new(id, format!("Error occurrence count incremented to {count}"))
                .with_occurrence_count(count),
        )
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn checked_version(version: Option<&str>) -> Result<Option<String>> {
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            v.parse::<DottedVersion>()?;
            Ok(Some(v.to_string()))
        },
        None => Ok(None),
    }
}

/// Parses a strict `YYYY-MM-DD` session date.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the date is blank or malformed.
pub fn parse_session_date(date: &str) -> Result<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return Err(Error::InvalidInput(
            "date is required (YYYY-MM-DD format)".to_string(),
        ));
    }
    // chrono accepts unpadded fields; the length check pins the format.
    if date.len() != 10 {
        return Err(invalid_date());
    }
    NaiveDate::parse_from_str(date, SESSION_DATE_FORMAT).map_err(|_| invalid_date())
}

fn invalid_date() -> Error {
    Error::InvalidInput("date must be in YYYY-MM-DD format".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::LessonCategory;
    use crate::storage::StoreReader;
    use tempfile::TempDir;
    use test_case::test_case;

    fn api() -> (TempDir, Arc<KnowledgeStore>, MutationApi) {
        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(KnowledgeStore::open(&DatabaseConfig::at(dir.path().join("k.db"))).unwrap());
        let api = MutationApi::new(Arc::clone(&store));
        (dir, store, api)
    }

    #[test]
    fn test_add_lesson_message_and_tags() {
        let (_dir, store, api) = api();
        let outcome = api
            .add_lesson(
                &NewLesson::new("Use @Observable", "body", LessonCategory::Pattern)
                    .with_tags(["swiftui", " ", "swiftui", " state "]),
            )
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, "Lesson 'Use @Observable' added successfully");
        let lesson = store.read(|r| r.get_lesson(outcome.id)).unwrap();
        assert_eq!(lesson.tags, vec!["state", "swiftui"]);
    }

    #[test_case("", "body", "title is required"; "blank title")]
    #[test_case("title", "   ", "content is required"; "blank content")]
    fn test_add_lesson_rejects_blank(title: &str, content: &str, message: &str) {
        let (_dir, store, api) = api();
        let err = api
            .add_lesson(&NewLesson::new(title, content, LessonCategory::Gotcha))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains(message));
        assert!(store.read(|r| r.list_lessons(None)).unwrap().is_empty());
    }

    #[test]
    fn test_add_common_error_requires_fields() {
        let (_dir, _store, api) = api();
        let err = api
            .add_common_error(&NewCommonError::new("swift", "", "fix"))
            .unwrap_err();
        assert!(err.to_string().contains("error_pattern is required"));

        let ok = api
            .add_common_error(&NewCommonError::new("swift", "crash", "fix"))
            .unwrap();
        assert_eq!(ok.message, "Common error added successfully");
    }

    #[test]
    fn test_add_swift_pattern_validates_versions() {
        let (_dir, _store, api) = api();
        let err = api
            .add_swift_pattern(&NewSwiftPattern::new("p", "d", "c").with_ios_version("iOS 15"))
            .unwrap_err();
        assert!(err.is_invalid_input());

        let ok = api
            .add_swift_pattern(&NewSwiftPattern::new("Actor", "d", "c").with_swift_version("5.9"))
            .unwrap();
        assert_eq!(ok.message, "Swift pattern 'Actor' added successfully");
    }

    #[test_case("", "date is required (YYYY-MM-DD format)"; "blank")]
    #[test_case("2025-1-5", "date must be in YYYY-MM-DD format"; "unpadded")]
    #[test_case("05/01/2025", "date must be in YYYY-MM-DD format"; "slashes")]
    #[test_case("2025-02-30", "date must be in YYYY-MM-DD format"; "impossible day")]
    fn test_session_date_rejected(date: &str, message: &str) {
        let err = parse_session_date(date).unwrap_err();
        assert!(err.to_string().contains(message));
    }

    #[test]
    fn test_add_session_context() {
        let (_dir, store, api) = api();
        let outcome = api
            .add_session_context(&NewSession::new("2025-06-01"))
            .unwrap();
        assert_eq!(outcome.message, "Session for 2025-06-01 added successfully");
        assert_eq!(store.read(StoreReader::list_sessions).unwrap().len(), 1);
    }

    #[test]
    fn test_update_lesson() {
        let (_dir, store, api) = api();
        let id = api
            .add_lesson(&NewLesson::new("t", "c", LessonCategory::Gotcha).with_tags(["a"]))
            .unwrap()
            .id;

        let outcome = api
            .update_lesson(
                id,
                &LessonPatch {
                    tags: Some(vec!["b".to_string()]),
                    ..LessonPatch::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.message, format!("Lesson {id} updated successfully"));
        assert_eq!(store.read(|r| r.get_lesson(id)).unwrap().tags, vec!["b"]);

        let blank = LessonPatch {
            title: Some(" ".to_string()),
            ..LessonPatch::default()
        };
        assert!(api.update_lesson(id, &blank).unwrap_err().is_invalid_input());
        assert!(
            api.update_lesson(id + 1, &LessonPatch::default())
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_increment_error_count() {
        let (_dir, _store, api) = api();
        let id = api
            .add_common_error(&NewCommonError::new("swift", "crash", "fix"))
            .unwrap()
            .id;

        let outcome = api.increment_error_count(id).unwrap();
        assert_eq!(outcome.occurrence_count, Some(2));
        assert_eq!(outcome.message, "Error occurrence count incremented to 2");

        let err = api.increment_error_count(999).unwrap_err();
        assert_eq!(err.to_string(), "Error with id 999 not found");
    }
}
