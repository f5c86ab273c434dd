mod support;

use std::collections::HashSet;

use chaptrack::application::pagination::PageRequest;
use chaptrack::application::repos::ChapterQueryFilter;
use chaptrack::cache::metrics::{HIT_TOTAL, NAMESPACES};
use chaptrack::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;

use support::{InMemoryChapters, memory_backend, memory_cache, physics, services, unavailable_cache};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let store = InMemoryChapters::new();
    let (chapters, _) = services(store.clone(), memory_cache(memory_backend()));
    let filter = ChapterQueryFilter::default();

    // miss then hit
    chapters
        .list(&filter, PageRequest::default())
        .await
        .expect("first list");
    chapters
        .list(&filter, PageRequest::default())
        .await
        .expect("second list");

    // write invalidates the cached page
    chapters
        .create(&physics("Kinematics"))
        .await
        .expect("create");

    let (degraded, _) = services(InMemoryChapters::new(), unavailable_cache());
    degraded
        .list(&filter, PageRequest::default())
        .await
        .expect("uncached list");

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    let hit_namespaces: HashSet<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| composite_key.key().name() == HIT_TOTAL)
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "namespace")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    for namespace in NAMESPACES {
        assert!(
            hit_namespaces.contains(namespace),
            "missing hit series for namespace {namespace}"
        );
    }

    let expected = [
        "chaptrack_cache_hit_total",
        "chaptrack_cache_miss_total",
        "chaptrack_cache_unavailable_total",
        "chaptrack_cache_invalidated_keys_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
