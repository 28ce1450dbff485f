//! Lesson records and their request types.

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lesson categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonCategory {
    /// A reusable approach that worked.
    Pattern,
    /// A habit or convention worth keeping.
    Practice,
    /// A surprising behavior that cost time.
    Gotcha,
    /// A decision and its rationale.
    Decision,
}

impl LessonCategory {
    /// Returns all category variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pattern, Self::Practice, Self::Gotcha, Self::Decision]
    }

    /// Returns the category as stored and displayed.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Practice => "practice",
            Self::Gotcha => "gotcha",
            Self::Decision => "decision",
        }
    }

    /// Parses a category name. Matching is exact.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == s)
    }

    /// The validation message used when a category is rejected.
    #[must_use]
    pub fn invalid_message() -> String {
        let names: Vec<&str> = Self::all().iter().map(Self::as_str).collect();
        format!("category must be one of: {}", names.join(", "))
    }
}

impl FromStr for LessonCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(Self::invalid_message()))
    }
}

impl fmt::Display for LessonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored lesson with its resolved tag names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    /// Store-assigned id.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category.
    pub category: LessonCategory,
    /// Technology the lesson applies to.
    pub technology: Option<String>,
    /// Project the lesson came from.
    pub project_context: Option<String>,
    /// Path to the session log the lesson was extracted from.
    pub source_session: Option<String>,
    /// Tag names, sorted.
    pub tags: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLesson {
    /// Short title (required).
    pub title: String,
    /// Body text (required).
    pub content: String,
    /// Category.
    pub category: LessonCategory,
    /// Technology the lesson applies to.
    pub technology: Option<String>,
    /// Tag names; created on demand.
    pub tags: Vec<String>,
    /// Project the lesson came from.
    pub project_context: Option<String>,
    /// Path to the originating session log.
    pub source_session: Option<String>,
}

impl NewLesson {
    /// Creates a lesson request with the required fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: LessonCategory,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category,
            technology: None,
            tags: Vec::new(),
            project_context: None,
            source_session: None,
        }
    }

    /// Sets the technology.
    #[must_use]
    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the project context.
    #[must_use]
    pub fn with_project_context(mut self, project: impl Into<String>) -> Self {
        self.project_context = Some(project.into());
        self
    }
}

/// Partial update for a lesson.
///
/// `None` leaves a field untouched. For the nullable columns, `Some(None)`
/// clears the stored value. When `tags` is present the whole tag set is
/// replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonPatch {
    /// New title.
    pub title: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// New category.
    pub category: Option<LessonCategory>,
    /// New technology, or `Some(None)` to clear it.
    pub technology: Option<Option<String>>,
    /// New project context, or `Some(None)` to clear it.
    pub project_context: Option<Option<String>>,
    /// Replacement tag set.
    pub tags: Option<Vec<String>>,
}

impl LessonPatch {
    /// Returns true when the patch touches a column of the lessons table.
    #[must_use]
    pub const fn has_field_updates(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.category.is_some()
            || self.technology.is_some()
            || self.project_context.is_some()
    }
}
