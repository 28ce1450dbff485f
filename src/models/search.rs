//! Search requests and results.

use super::{CommonError, Lesson, SwiftPattern};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which record kinds a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Lessons only.
    Lesson,
    /// Common errors only.
    Error,
    /// Swift patterns only.
    Pattern,
    /// Every searchable kind.
    #[default]
    All,
}

impl Category {
    /// Returns the category name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Error => "error",
            Self::Pattern => "pattern",
            Self::All => "all",
        }
    }

    /// Parses a category name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lesson" => Some(Self::Lesson),
            "error" => Some(Self::Error),
            "pattern" => Some(Self::Pattern),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Returns true if records of `kind` are covered.
    #[must_use]
    pub fn includes(self, kind: Self) -> bool {
        self == Self::All || self == kind
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput("category must be one of: lesson, error, pattern, all".to_string())
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-category search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Search text. Blank means unranked.
    pub query: String,
    /// Kinds to search.
    pub category: Category,
    /// Technology equality filter (lessons and errors).
    pub technology: Option<String>,
    /// Lesson tag filter; a lesson matches if it has any of these.
    pub tags: Vec<String>,
    /// Requested result count; clamped to the configured bounds.
    pub limit: Option<i64>,
}

impl QueryRequest {
    /// Creates a request searching every category.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Restricts the search to one category.
    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Adds a technology filter.
    #[must_use]
    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    /// Adds a tag filter.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the requested limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Error search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorQuery {
    /// Search text. Blank means unranked.
    pub query: String,
    /// Technology equality filter.
    pub technology: Option<String>,
    /// Requested result count.
    pub limit: Option<i64>,
}

/// Pattern search request with version maxima.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternQuery {
    /// Search text. Blank means unranked.
    pub query: String,
    /// Only patterns needing at most this iOS version.
    pub ios_version: Option<String>,
    /// Only patterns needing at most this Swift version.
    pub swift_version: Option<String>,
    /// Requested result count.
    pub limit: Option<i64>,
}

impl PatternQuery {
    /// Creates a request with the given search text.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the iOS version maximum.
    #[must_use]
    pub fn with_ios_version(mut self, version: impl Into<String>) -> Self {
        self.ios_version = Some(version.into());
        self
    }

    /// Sets the Swift version maximum.
    #[must_use]
    pub fn with_swift_version(mut self, version: impl Into<String>) -> Self {
        self.swift_version = Some(version.into());
        self
    }
}

/// Export request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Kinds to include.
    pub category: Category,
    /// Technology filter for lessons and errors.
    pub technology: Option<String>,
    /// Whether to include sessions.
    pub include_sessions: bool,
}

/// A single search result, tagged with its record kind.
///
/// Serializes flat, with a `type` discriminator (`lesson`, `error`,
/// `pattern`) and a `relevance` score where higher is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchHit {
    /// A matching lesson.
    Lesson {
        /// The lesson.
        #[serde(flatten)]
        lesson: Lesson,
        /// Relevance score.
        relevance: f64,
    },
    /// A matching common error.
    Error {
        /// The error record.
        #[serde(flatten)]
        error: CommonError,
        /// Relevance score.
        relevance: f64,
    },
    /// A matching Swift pattern.
    Pattern {
        /// The pattern.
        #[serde(flatten)]
        pattern: SwiftPattern,
        /// Relevance score.
        relevance: f64,
    },
}

impl SearchHit {
    /// Returns the relevance score.
    #[must_use]
    pub const fn relevance(&self) -> f64 {
        match self {
            Self::Lesson { relevance, .. }
            | Self::Error { relevance, .. }
            | Self::Pattern { relevance, .. } => *relevance,
        }
    }

    /// Returns the record kind.
    #[must_use]
    pub const fn kind(&self) -> Category {
        match self {
            Self::Lesson { .. } => Category::Lesson,
            Self::Error { .. } => Category::Error,
            Self::Pattern { .. } => Category::Pattern,
        }
    }

    /// Returns the record id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Lesson { lesson, .. } => lesson.id,
            Self::Error { error, .. } => error.id,
            Self::Pattern { pattern, .. } => pattern.id,
        }
    }

    /// Returns the lesson, if this hit is one.
    #[must_use]
    pub const fn as_lesson(&self) -> Option<&Lesson> {
        match self {
            Self::Lesson { lesson, .. } => Some(lesson),
            _ => None,
        }
    }

    /// Returns the error record, if this hit is one.
    #[must_use]
    pub const fn as_error(&self) -> Option<&CommonError> {
        match self {
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the pattern, if this hit is one.
    #[must_use]
    pub const fn as_pattern(&self) -> Option<&SwiftPattern> {
        match self {
            Self::Pattern { pattern, .. } => Some(pattern),
            _ => None,
        }
    }
}
