//! Data models for hindsight.
//!
//! Records as read from the store, typed request structs for every
//! operation, and the aggregate shapes returned by the query engine.

mod common_error;
mod lesson;
mod pattern;
mod search;
mod session;
mod stats;
mod version;

pub use common_error::{CommonError, NewCommonError};
pub use lesson::{Lesson, LessonCategory, LessonPatch, NewLesson};
pub use pattern::{NewSwiftPattern, SwiftPattern};
pub use search::{Category, ErrorQuery, ExportRequest, PatternQuery, QueryRequest, SearchHit};
pub use session::{NewSession, SESSION_DATE_FORMAT, Session};
pub use stats::{
    EXPORT_VERSION, ErrorSummary, ExportDocument, MutationOutcome, RecentLesson, Statistics,
    TagUsage, TechnologyCount, TechnologyTally,
};
pub use version::{DottedVersion, version_at_most};
