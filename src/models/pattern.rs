//! Swift pattern records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A reusable Swift pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwiftPattern {
    /// Store-assigned id.
    pub id: i64,
    /// Pattern name.
    pub pattern_name: String,
    /// What the pattern does.
    pub description: String,
    /// Example code.
    pub code_example: String,
    /// When the pattern fits.
    pub when_to_use: Option<String>,
    /// When to avoid it.
    pub when_not_to_use: Option<String>,
    /// Related API names, in the order they were given.
    pub related_apis: Vec<String>,
    /// Minimum iOS version, dotted.
    pub ios_version: Option<String>,
    /// Minimum Swift version, dotted.
    pub swift_version: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSwiftPattern {
    /// Pattern name (required).
    pub pattern_name: String,
    /// Description (required).
    pub description: String,
    /// Example code (required).
    pub code_example: String,
    /// When the pattern fits.
    pub when_to_use: Option<String>,
    /// When to avoid it.
    pub when_not_to_use: Option<String>,
    /// Related API names.
    pub related_apis: Vec<String>,
    /// Minimum iOS version.
    pub ios_version: Option<String>,
    /// Minimum Swift version.
    pub swift_version: Option<String>,
}

impl NewSwiftPattern {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        pattern_name: impl Into<String>,
        description: impl Into<String>,
        code_example: impl Into<String>,
    ) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            description: description.into(),
            code_example: code_example.into(),
            ..Self::default()
        }
    }

    /// Sets the minimum iOS version.
    #[must_use]
    pub fn with_ios_version(mut self, version: impl Into<String>) -> Self {
        self.ios_version = Some(version.into());
        self
    }

    /// Sets the minimum Swift version.
    #[must_use]
    pub fn with_swift_version(mut self, version: impl Into<String>) -> Self {
        self.swift_version = Some(version.into());
        self
    }

    /// Sets the related APIs.
    #[must_use]
    pub fn with_related_apis<I, S>(mut self, apis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_apis = apis.into_iter().map(Into::into).collect();
        self
    }
}
