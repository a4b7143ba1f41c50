// tests/metrics.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use coct_alert_bots::alerts::backend::ScriptedBackend;
use coct_alert_bots::alerts::resolver::NoSource;
use coct_alert_bots::alerts::types::{Alert, LinkBuilder};
use coct_alert_bots::metrics::Metrics;
use coct_alert_bots::publish::RecordingPublisher;
use coct_alert_bots::storage::MemoryBlobStore;
use coct_alert_bots::AlertPipeline;
use serde_json::json;

#[tokio::test]
async fn metrics_endpoint_contains_pipeline_series() {
    // One recorder per process; this binary holds a single test.
    let metrics = Metrics::init().expect("install recorder");

    let pipeline = AlertPipeline::new(
        Arc::new(MemoryBlobStore::new()),
        Arc::new(NoSource),
        Arc::new(ScriptedBackend::repeating("Road closure on Main Rd.")),
        Arc::new(RecordingPublisher::new()),
        LinkBuilder::new("https://cdn.example"),
    );
    let alert: Alert = serde_json::from_value(json!({
        "Id": "5",
        "service_area": "Roads",
        "start_timestamp": "2023-01-01T10:00:00.000Z",
        "forecast_end_timestamp": "2023-01-01T14:00:00.000Z"
    }))
    .unwrap();
    pipeline
        .process_batch(vec![alert.clone(), alert])
        .await
        .unwrap();

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for series in [
        "alerts_received_total 2",
        "alerts_duplicate_total 1",
        "alerts_generated_total 1",
        "publish_total 1",
        "generation_attempts_total 1",
    ] {
        assert!(text.contains(series), "missing `{series}` in:\n{text}");
    }
}
