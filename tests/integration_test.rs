//! Integration tests for hindsight.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp,
    clippy::too_many_lines
)]

use hindsight::config::{DatabaseConfig, SearchConfig};
use hindsight::models::{Category, ErrorQuery};
use hindsight::{
    ExportRequest, KnowledgeService, KnowledgeStore, LessonCategory, LessonPatch, NewCommonError,
    NewLesson, NewSession, NewSwiftPattern, PatternQuery, QueryRequest,
};
use std::time::Duration;
use tempfile::TempDir;

fn service() -> (TempDir, KnowledgeService) {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig::at(dir.path().join("knowledge.db"));
    let store = KnowledgeStore::open(&config).unwrap();
    (dir, KnowledgeService::new(store, SearchConfig::default()))
}

async fn lesson(service: &KnowledgeService, title: &str, content: &str) -> i64 {
    service
        .add_lesson(NewLesson::new(title, content, LessonCategory::Practice))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_lesson_ids_increase() {
    let (_dir, service) = service();

    let mut previous = 0;
    for i in 0..5 {
        let id = lesson(&service, &format!("Lesson {i}"), "body").await;
        assert!(id > previous);
        previous = id;
    }
}

#[tokio::test]
async fn test_missing_title_creates_nothing() {
    let (_dir, service) = service();

    let err = service
        .add_lesson(NewLesson::new("  ", "content", LessonCategory::Gotcha))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());

    let stats = service.get_statistics().await.unwrap();
    assert_eq!(stats.total_lessons, 0);
}

#[tokio::test]
async fn test_increment_error_count() {
    let (_dir, service) = service();
    let id = service
        .add_common_error(NewCommonError::new(
            "swift",
            "Fatal error: Index out of range",
            "Check bounds before subscripting",
        ))
        .await
        .unwrap()
        .id;

    let first = service.increment_error_count(id).await.unwrap();
    assert_eq!(first.occurrence_count, Some(2));
    for _ in 0..3 {
        service.increment_error_count(id).await.unwrap();
    }
    let last = service.increment_error_count(id).await.unwrap();
    assert_eq!(last.occurrence_count, Some(6));
    assert_eq!(last.message, "Error occurrence count incremented to 6");

    let missing = service.increment_error_count(id + 100).await.unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_update_replaces_tags() {
    let (_dir, service) = service();
    let id = service
        .add_lesson(
            NewLesson::new("Actors", "isolate state", LessonCategory::Pattern)
                .with_tags(["concurrency", "swift"]),
        )
        .await
        .unwrap()
        .id;

    let patch = LessonPatch {
        tags: Some(vec!["actors".to_string()]),
        ..LessonPatch::default()
    };
    let outcome = service.update_lesson(id, patch).await.unwrap();
    assert_eq!(outcome.message, format!("Lesson {id} updated successfully"));

    let stored = service.store().read(|r| r.get_lesson(id)).unwrap();
    assert_eq!(stored.tags, vec!["actors".to_string()]);
    assert_eq!(stored.title, "Actors");

    let missing = service
        .update_lesson(id + 1, LessonPatch::default())
        .await
        .unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_exact_title_ranks_first() {
    let (_dir, service) = service();
    let mention = lesson(
        &service,
        "View updates",
        "Notes on SwiftUI, including some state management details for lists",
    )
    .await;
    let exact = lesson(
        &service,
        "SwiftUI State Management",
        "Prefer @State for view-local values",
    )
    .await;

    let hits = service
        .query(QueryRequest::new("SwiftUI State Management"))
        .await
        .unwrap();
    let ids: Vec<i64> = hits.iter().map(hindsight::SearchHit::id).collect();
    assert_eq!(ids, vec![exact, mention]);
    assert!(hits[0].relevance() >= hits[1].relevance());
}

#[tokio::test]
async fn test_category_filter_and_merge() {
    let (_dir, service) = service();
    lesson(&service, "Optional chaining", "optional values unwrap safely").await;
    service
        .add_common_error(NewCommonError::new(
            "swift",
            "Unexpectedly found nil while unwrapping an Optional value",
            "Use optional binding",
        ))
        .await
        .unwrap();
    service
        .add_swift_pattern(NewSwiftPattern::new(
            "Optional binding",
            "Bind optional values with if let",
            "if let value { use(value) }",
        ))
        .await
        .unwrap();

    let mut lessons_only = QueryRequest::new("optional");
    lessons_only.category = Category::Lesson;
    let hits = service.query(lessons_only).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits.iter().all(|h| h.kind() == Category::Lesson));

    let hits = service.query(QueryRequest::new("optional")).await.unwrap();
    let kinds: Vec<Category> = hits.iter().map(hindsight::SearchHit::kind).collect();
    assert_eq!(hits.len(), 3);
    assert!(kinds.contains(&Category::Lesson));
    assert!(kinds.contains(&Category::Error));
    assert!(kinds.contains(&Category::Pattern));
    assert!(
        hits.windows(2)
            .all(|pair| pair[0].relevance() >= pair[1].relevance())
    );
}

#[tokio::test]
async fn test_pattern_version_filter() {
    let (_dir, service) = service();
    for (name, ios) in [("Old", Some("13.0")), ("New", Some("17.0")), ("Any", None)] {
        let mut pattern = NewSwiftPattern::new(name, "navigation stack usage", "code");
        if let Some(ios) = ios {
            pattern = pattern.with_ios_version(ios);
        }
        service.add_swift_pattern(pattern).await.unwrap();
    }

    let hits = service
        .get_patterns(PatternQuery::new("").with_ios_version("15.0"))
        .await
        .unwrap();
    let mut names: Vec<&str> = hits
        .iter()
        .filter_map(|h| h.as_pattern().map(|p| p.pattern_name.as_str()))
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Any", "Old"]);

    let bad = service
        .get_patterns(PatternQuery::new("").with_ios_version("fifteen"))
        .await
        .unwrap_err();
    assert!(bad.is_invalid_input());
}

#[tokio::test]
async fn test_export_sections() {
    let (_dir, service) = service();
    lesson(&service, "Exported", "content").await;
    service
        .add_session_context(NewSession::new("2024-03-01"))
        .await
        .unwrap();

    let document = service
        .export(ExportRequest {
            category: Category::Lesson,
            technology: None,
            include_sessions: false,
        })
        .await
        .unwrap();
    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(json["lessons"].as_array().unwrap().len(), 1);
    assert!(json.get("errors").is_none());
    assert!(json.get("patterns").is_none());
    assert!(json.get("sessions").is_none());

    let document = service
        .export(ExportRequest {
            include_sessions: true,
            ..ExportRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(document.sessions.unwrap().len(), 1);
    assert!(document.errors.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_query_is_unranked_and_filtered() {
    let (_dir, service) = service();
    for i in 0..4 {
        let mut new = NewLesson::new(format!("Lesson {i}"), "text", LessonCategory::Decision);
        if i % 2 == 0 {
            new = new.with_technology("swiftui");
        }
        service.add_lesson(new).await.unwrap();
    }

    let hits = service
        .query(QueryRequest::new("").with_technology("swiftui"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.relevance() == 1.0));
}

#[tokio::test]
async fn test_limit_clamping() {
    let (_dir, service) = service();
    for i in 0..105 {
        lesson(&service, &format!("Bulk {i}"), "bulk content").await;
    }

    let hits = service.query(QueryRequest::new("bulk")).await.unwrap();
    assert_eq!(hits.len(), 10);

    let mut request = QueryRequest::new("bulk");
    request.limit = Some(500);
    let hits = service.query(request).await.unwrap();
    assert_eq!(hits.len(), 100);
}

#[tokio::test]
async fn test_special_characters_never_fail() {
    let (_dir, service) = service();
    lesson(&service, "Closures", "escaping closures capture self").await;

    for query in [
        "\"unbalanced",
        "prefix*",
        "(group",
        "title:closures",
        "NEAR(a b)",
        "a AND OR NOT",
        "***",
        "'; DROP TABLE lessons; --",
    ] {
        service.query(QueryRequest::new(query)).await.unwrap();
        service
            .search_errors(ErrorQuery {
                query: query.to_string(),
                ..ErrorQuery::default()
            })
            .await
            .unwrap();
        service.get_patterns(PatternQuery::new(query)).await.unwrap();
    }

    let hits = service
        .query(QueryRequest::new("closures:"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_delete_cascades_links_and_index() {
    let (_dir, service) = service();
    let id = service
        .add_lesson(
            NewLesson::new("Deleted lesson", "unique marker", LessonCategory::Gotcha)
                .with_tags(["kept-tag"]),
        )
        .await
        .unwrap()
        .id;

    assert!(service.store().delete_lesson(id).unwrap());
    assert!(!service.store().delete_lesson(id).unwrap());

    let hits = service.query(QueryRequest::new("marker")).await.unwrap();
    assert!(hits.is_empty());

    let (links, tags): (i64, i64) = service
        .store()
        .with_connection(|conn| {
            let links = conn
                .query_row("SELECT COUNT(*) FROM lesson_tags", [], |r| r.get(0))
                .unwrap();
            let tags = conn
                .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
                .unwrap();
            Ok((links, tags))
        })
        .unwrap();
    assert_eq!(links, 0);
    assert_eq!(tags, 1);
}

#[test]
fn test_unopenable_path_fails_after_retries() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig::at(dir.path())
        .with_max_retries(2)
        .with_retry_delay(Duration::from_millis(1));

    let err = KnowledgeStore::open(&config).unwrap_err();
    assert!(!err.is_invalid_input());
    assert!(!err.is_not_found());
}
