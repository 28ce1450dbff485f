//! Benchmarks for ranked search.
//!
//! Seeds a store with lessons, errors and patterns in equal parts, then
//! measures cross-category queries, a tag-filtered lesson query and the
//! unranked listing path.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use hindsight::config::{DatabaseConfig, SearchConfig};
use hindsight::models::Category;
use hindsight::services::QueryEngine;
use hindsight::{
    KnowledgeStore, LessonCategory, NewCommonError, NewLesson, NewSwiftPattern, QueryRequest,
};

const TOPICS: &[&str] = &[
    "SwiftUI state management with observable objects",
    "async await structured concurrency and task groups",
    "Core Data background contexts and merge policies",
    "memory leaks from retain cycles in escaping closures",
    "navigation stack deep links and path restoration",
];

/// Creates a store seeded with `per_kind` records of each kind.
fn seeded_engine(dir: &TempDir, per_kind: usize) -> QueryEngine {
    let store = KnowledgeStore::open(&DatabaseConfig::at(dir.path().join("bench.db")))
        .expect("Failed to open store");

    for i in 0..per_kind {
        let topic = TOPICS[i % TOPICS.len()];
        store
            .add_lesson(
                &NewLesson::new(format!("Lesson {i}: {topic}"), topic, LessonCategory::Practice)
                    .with_technology(if i % 2 == 0 { "swiftui" } else { "swift" })
                    .with_tags([format!("tag-{}", i % 20)]),
            )
            .unwrap();
        store
            .add_common_error(&NewCommonError::new(
                "swift",
                format!("Error {i} while handling {topic}"),
                "Apply the documented fix",
            ))
            .unwrap();
        store
            .add_swift_pattern(&NewSwiftPattern::new(
                format!("Pattern {i}"),
                topic,
                "// example",
            ))
            .unwrap();
    }

    QueryEngine::new(Arc::new(store), SearchConfig::default())
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    group.measurement_time(Duration::from_secs(10));

    for per_kind in [100usize, 1_000] {
        let dir = TempDir::new().unwrap();
        let engine = seeded_engine(&dir, per_kind);

        group.bench_with_input(
            BenchmarkId::new("all_categories", per_kind),
            &engine,
            |b, engine| {
                let request = QueryRequest::new("concurrency task groups");
                b.iter(|| black_box(engine.query(&request).unwrap()));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("lessons_by_tag", per_kind),
            &engine,
            |b, engine| {
                let mut request = QueryRequest::new("state").with_tags(["tag-3", "tag-7"]);
                request.category = Category::Lesson;
                b.iter(|| black_box(engine.query(&request).unwrap()));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("unranked_listing", per_kind),
            &engine,
            |b, engine| {
                let request = QueryRequest::new("").with_technology("swift");
                b.iter(|| black_box(engine.query(&request).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_query);
criterion_main!(benches);
