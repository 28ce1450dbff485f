//! Session context records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Format accepted for session dates.
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d";

/// A work session that produced knowledge entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Store-assigned id.
    pub id: i64,
    /// Calendar date of the session.
    pub date: NaiveDate,
    /// Project worked on.
    pub project_name: Option<String>,
    /// Where the session log lives.
    pub session_log_path: Option<String>,
    /// What was accomplished.
    pub summary: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for recording a session.
///
/// `date` is kept as the caller's text so the mutation API can report the
/// expected format when it does not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSession {
    /// Date in `YYYY-MM-DD` form (required).
    pub date: String,
    /// Project worked on.
    pub project_name: Option<String>,
    /// Where the session log lives.
    pub session_log_path: Option<String>,
    /// What was accomplished.
    pub summary: Option<String>,
}

impl NewSession {
    /// Creates a request for the given date.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }
}
