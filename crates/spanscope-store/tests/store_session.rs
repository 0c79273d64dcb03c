use spanscope::*;
use spanscope_store::{load_seed_data, parse_traces, StoreConfig, TraceStore};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn switching_traces_shows_only_the_last_one() {
    let store = TraceStore::new(StoreConfig {
        latency: Duration::from_millis(200),
        ..Default::default()
    });
    load_seed_data(&store);

    let (mut loader, mut outcomes) = TraceLoader::new(store);
    let mut session = TraceSession::new();

    loader.fetch(session.request("a1b2c3d4"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    loader.fetch(session.request("deadbeef"));

    let (ticket, result) = outcomes.recv().await.unwrap();
    assert_eq!(session.resolve(&ticket, result), Resolution::Applied);

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.trace_id(), &TraceId::from("deadbeef"));
    assert_eq!(
        snapshot.metrics().services,
        ["storefront", "inventory", "payments", "postgres"]
    );
    assert_eq!(snapshot.metrics().total_duration_source, TotalDurationSource::Declared);
}

#[tokio::test]
async fn empty_and_missing_traces() {
    let store = TraceStore::new(StoreConfig::default());
    load_seed_data(&store);
    let (mut loader, mut outcomes) = TraceLoader::new(store);
    let mut session = TraceSession::new();
    let config = RenderConfig::default();

    loader.fetch(session.request("e0e0e0e0"));
    let (ticket, result) = outcomes.recv().await.unwrap();
    session.resolve(&ticket, result);
    assert_eq!(render::waterfall(&session.view(), &config), render::Panel::Empty);

    loader.fetch(session.request("nope"));
    let (ticket, result) = outcomes.recv().await.unwrap();
    session.resolve(&ticket, result);
    assert!(matches!(
        render::tree(&session.view(), &config),
        render::Panel::Failed(_)
    ));
}

#[tokio::test]
async fn loaded_file_is_served() {
    let store = TraceStore::new(StoreConfig::default());
    let traces = parse_traces(
        r#"[
            {"spanId": "r", "traceId": "file-1", "name": "GET /", "serviceName": "web", "duration": 30},
            {"spanId": "c", "traceId": "file-1", "parentSpanId": "r", "name": "SELECT", "serviceName": "db", "duration": 12, "httpStatus": 0}
        ]"#,
    )
    .unwrap();
    for trace in traces {
        store.insert_payload(trace);
    }

    let payload = store.fetch_trace(&"file-1".into()).await.unwrap();
    let metrics = TraceMetrics::from_payload(&payload);
    assert_eq!(metrics.span_count, 2);
    assert_eq!(metrics.total_duration, 30.0);
    assert_eq!(metrics.total_duration_source, TotalDurationSource::FirstSpan);
}
