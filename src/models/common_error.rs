//! Recurring error records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A recurring error and how to fix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonError {
    /// Store-assigned id.
    pub id: i64,
    /// Technology the error shows up in.
    pub technology: String,
    /// The error message or a recognizable fragment of it.
    pub error_pattern: String,
    /// What causes it.
    pub root_cause: Option<String>,
    /// How to fix it.
    pub solution: String,
    /// Code showing the fix.
    pub code_example: Option<String>,
    /// Times this error has been seen. Starts at 1.
    pub occurrence_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCommonError {
    /// Technology (required).
    pub technology: String,
    /// Error message or fragment (required).
    pub error_pattern: String,
    /// Fix (required).
    pub solution: String,
    /// Cause.
    pub root_cause: Option<String>,
    /// Code showing the fix.
    pub code_example: Option<String>,
}

impl NewCommonError {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        technology: impl Into<String>,
        error_pattern: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            technology: technology.into(),
            error_pattern: error_pattern.into(),
            solution: solution.into(),
            root_cause: None,
            code_example: None,
        }
    }

    /// Sets the root cause.
    #[must_use]
    pub fn with_root_cause(mut self, root_cause: impl Into<String>) -> Self {
        self.root_cause = Some(root_cause.into());
        self
    }
}
