//! Aggregate views, export documents, and mutation outcomes.

use super::{CommonError, Lesson, LessonCategory, Session, SwiftPattern};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Export format version.
pub const EXPORT_VERSION: &str = "1.0";

/// Entry counts for one technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnologyCount {
    /// Technology name.
    pub technology: String,
    /// Lessons tagged with this technology.
    pub lesson_count: i64,
    /// Errors recorded for this technology.
    pub error_count: i64,
    /// `lesson_count + error_count`.
    pub total_count: i64,
}

/// How many lessons carry a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagUsage {
    /// Tag name.
    pub tag: String,
    /// Number of linked lessons.
    pub usage_count: i64,
}

/// Lesson count for one technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnologyTally {
    /// Technology name.
    pub technology: String,
    /// Number of lessons.
    pub count: i64,
}

/// Short form of an error for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    /// Error id.
    pub id: i64,
    /// Technology.
    pub technology: String,
    /// Error pattern, truncated.
    pub error_pattern: String,
    /// Times seen.
    pub occurrence_count: i64,
}

/// Short form of a lesson for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentLesson {
    /// Lesson id.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Category.
    pub category: LessonCategory,
    /// Technology.
    pub technology: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Dashboard statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Number of lessons.
    pub total_lessons: i64,
    /// Number of common errors.
    pub total_errors: i64,
    /// Number of Swift patterns.
    pub total_patterns: i64,
    /// Number of sessions.
    pub total_sessions: i64,
    /// Number of tags.
    pub total_tags: i64,
    /// Lesson count per category; categories without lessons are absent.
    pub lessons_by_category: BTreeMap<String, i64>,
    /// Top 10 lesson technologies.
    pub top_technologies: Vec<TechnologyTally>,
    /// Top 5 errors by occurrence.
    pub most_common_errors: Vec<ErrorSummary>,
    /// 5 newest lessons.
    pub recent_lessons: Vec<RecentLesson>,
    /// Sum of every error's occurrence count.
    pub total_error_occurrences: i64,
}

/// A dump of the knowledge base.
///
/// Sections for categories that were not requested are omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,
    /// Export format version.
    pub version: &'static str,
    /// Lessons with tag names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons: Option<Vec<Lesson>>,
    /// Common errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<CommonError>>,
    /// Swift patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<SwiftPattern>>,
    /// Sessions, newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Always true; failures are returned as errors instead.
    pub success: bool,
    /// Id of the created or changed record.
    pub id: i64,
    /// Human-readable summary.
    pub message: String,
    /// New occurrence count, for error increments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_count: Option<i64>,
}

impl MutationOutcome {
    /// Creates an outcome for the given record.
    #[must_use]
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            id,
            message: message.into(),
            occurrence_count: None,
        }
    }

    /// Attaches an occurrence count.
    #[must_use]
    pub const fn with_occurrence_count(mut self, count: i64) -> Self {
        self.occurrence_count = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_omits_unrequested_sections() {
        let doc = ExportDocument {
            exported_at: Utc::now(),
            version: EXPORT_VERSION,
            lessons: Some(Vec::new()),
            errors: None,
            patterns: None,
            sessions: None,
        };
        let json = serde_json::to_value(&doc).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("lessons"));
        assert!(!obj.contains_key("errors"));
        assert!(!obj.contains_key("patterns"));
        assert!(!obj.contains_key("sessions"));
        assert_eq!(obj["version"], "1.0");
    }

    #[test]
    fn test_outcome_serialization() {
        let plain = serde_json::to_value(MutationOutcome::new(4, "ok")).unwrap();
        assert_eq!(plain["success"], true);
        assert!(plain.get("occurrence_count").is_none());

        let counted =
            serde_json::to_value(MutationOutcome::new(4, "ok").with_occurrence_count(3)).unwrap();
        assert_eq!(counted["occurrence_count"], 3);
    }
}
