//! End-to-end runs against a local query mirror.

use axum::http::StatusCode;
use axum::routing::post;
use notes_ingest::config::PipelineConfig;
use notes_ingest::pipeline::runner::Pipeline;
use notes_ingest::pipeline::store::MemoryStore;
use notes_ingest::query::client::RetryingClient;
use notes_ingest::resources::monitor::ResourceMonitor;
use notes_ingest::resources::system::FixedStats;
use notes_ingest::resources::types::ResourceConfig;
use std::path::Path;
use std::sync::Arc;

async fn spawn_mirror(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/interpreter", addr)
}

fn write_notes(path: &Path, count: u64) {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<osm-notes>\n");
    for id in 1..=count {
        doc.push_str(&format!(
            "  <note id=\"{}\" lat=\"{}\" lon=\"{}\" created_at=\"2022-03-01T08:00:00Z\">\n    <comment action=\"opened\">hello</comment>\n  </note>\n",
            id,
            (id % 90) as f64 / 2.0,
            -((id % 180) as f64) / 3.0
        ));
    }
    doc.push_str("</osm-notes>\n");
    std::fs::write(path, doc).unwrap();
}

fn config_for(work_dir: &Path, endpoints: Vec<String>) -> PipelineConfig {
    let mut config = PipelineConfig {
        work_dir: work_dir.to_path_buf(),
        startup_wait_secs: 0.0,
        ..PipelineConfig::default()
    };
    config.pool.spawn_delay_secs = 0.0;
    config.pool.retry_delay_secs = 0.0;
    config.partition.target_parts = 6;
    config.query.endpoints = endpoints;
    config.query.retries_per_endpoint = 1;
    config.query.backoff_secs = 0.0;
    config.query.request_timeout_secs = 5;
    config
}

fn pipeline_for(config: PipelineConfig, store: Arc<MemoryStore>) -> Pipeline<MemoryStore, notes_ingest::query::transport::HttpTransport> {
    let monitor = ResourceMonitor::new(Arc::new(FixedStats::healthy(8)), ResourceConfig::default());
    let client = RetryingClient::from_config(&config.query);
    Pipeline::new(config, monitor, store, client)
}

#[tokio::test]
async fn test_run_fails_over_to_second_mirror() {
    let broken = spawn_mirror(axum::Router::new().route(
        "/api/interpreter",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "runtime error: out of memory") }),
    ))
    .await;
    let healthy = spawn_mirror(axum::Router::new().route(
        "/api/interpreter",
        post(|| async { "@id\n51477\n62149\n1428125\n" }),
    ))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.xml");
    write_notes(&input, 120);
    let backup = dir.path().join("boundaries.csv");
    std::fs::write(&backup, "@id\n51477\n62149\n1428125\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    let config = config_for(&dir.path().join("work"), vec![broken, healthy]);
    let summary = pipeline_for(config, store.clone())
        .run(&input, Some(&backup))
        .await
        .unwrap();

    assert_eq!(summary.records, 120);
    assert_eq!(summary.partitions, 6);
    assert_eq!(summary.pool.succeeded, 6);
    assert_eq!(summary.notes_loaded, 120);
    assert_eq!(store.len(), 120);
    assert!(!summary.used_backup);
    assert!(summary.reconciliation.as_ref().unwrap().matched);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn test_run_reports_gap_against_backup() {
    let mirror = spawn_mirror(axum::Router::new().route(
        "/api/interpreter",
        post(|| async { "@id\n1\n2\n3\n" }),
    ))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.xml");
    write_notes(&input, 10);
    let backup = dir.path().join("boundaries.json");
    std::fs::write(&backup, r#"{"elements":[{"id":1},{"id":2},{"id":3},{"id":4}]}"#).unwrap();

    let store = Arc::new(MemoryStore::new());
    let config = config_for(dir.path(), vec![mirror]);
    let summary = pipeline_for(config, store)
        .run(&input, Some(&backup))
        .await
        .unwrap();

    let result = summary.reconciliation.as_ref().unwrap();
    assert!(!result.matched);
    assert_eq!(result.missing_ids, vec![4]);
    assert_eq!(result.gap_percentage, 25);

    // A boundary gap is reported, not counted against the unit tolerance
    assert_eq!(summary.exit_code(), 0);
}
