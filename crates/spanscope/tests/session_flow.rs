use spanscope::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// In-memory store answering each trace after a fixed delay
struct DelayedStore {
    traces: HashMap<TraceId, (Duration, TracePayload)>,
}

impl DelayedStore {
    fn new() -> Self {
        Self {
            traces: HashMap::new(),
        }
    }

    fn with_trace(mut self, delay_ms: u64, payload: TracePayload) -> Self {
        self.traces
            .insert(payload.trace_id.clone(), (Duration::from_millis(delay_ms), payload));
        self
    }
}

impl SpanStore for DelayedStore {
    async fn fetch_trace(&self, trace_id: &TraceId) -> Result<TracePayload, FetchError> {
        let Some((delay, payload)) = self.traces.get(trace_id) else {
            return Err(FetchError::NotFound(trace_id.clone()));
        };
        tokio::time::sleep(*delay).await;
        Ok(payload.clone())
    }
}

fn checkout_trace(trace_id: &str) -> TracePayload {
    TracePayload::new(
        trace_id,
        vec![
            SpanBuilder::new(trace_id, "root", "POST /checkout")
                .service("storefront")
                .lasting(120.0)
                .http("POST", "/checkout", 200)
                .build(),
            SpanBuilder::new(trace_id, "pay", "charge card")
                .service("payments")
                .child_of("root")
                .lasting(80.0)
                .http("POST", "/charge", 502)
                .build(),
            SpanBuilder::new(trace_id, "db", "INSERT orders")
                .service("postgres")
                .child_of("root")
                .lasting(15.0)
                .build(),
        ],
    )
    .with_root("root")
}

#[tokio::test(start_paused = true)]
async fn slow_response_for_abandoned_trace_is_ignored() {
    let store = DelayedStore::new()
        .with_trace(500, checkout_trace("slow"))
        .with_trace(10, checkout_trace("fast"));
    let (mut loader, mut outcomes) = TraceLoader::new(Arc::new(store));
    let mut session = TraceSession::new();

    let slow = session.request("slow");
    // Fetch by hand so the superseded task is not aborted by the loader.
    let slow_store = Arc::clone(loader.store());
    let slow_fetch = tokio::spawn(async move {
        let result = slow_store.fetch_trace(slow.trace_id()).await;
        (slow, result)
    });

    let fast = session.request("fast");
    loader.fetch(fast);

    let (ticket, result) = outcomes.recv().await.unwrap();
    assert_eq!(session.resolve(&ticket, result), Resolution::Applied);

    let (ticket, result) = slow_fetch.await.unwrap();
    assert_eq!(session.resolve(&ticket, result), Resolution::Stale);
    assert_eq!(session.snapshot().unwrap().trace_id(), &TraceId::from("fast"));
}

#[tokio::test(start_paused = true)]
async fn loader_aborts_superseded_fetch() {
    let store = DelayedStore::new()
        .with_trace(500, checkout_trace("first"))
        .with_trace(500, checkout_trace("second"));
    let (mut loader, mut outcomes) = TraceLoader::new(Arc::new(store));
    let mut session = TraceSession::new();

    loader.fetch(session.request("first"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    loader.fetch(session.request("second"));

    let (ticket, result) = outcomes.recv().await.unwrap();
    assert_eq!(ticket.trace_id(), &TraceId::from("second"));
    assert_eq!(session.resolve(&ticket, result), Resolution::Applied);
    assert!(outcomes.try_recv().is_err());
}

#[tokio::test]
async fn missing_trace_surfaces_as_failed_panel() {
    let (mut loader, mut outcomes) = TraceLoader::new(Arc::new(DelayedStore::new()));
    let mut session = TraceSession::new();

    loader.fetch(session.request("nope"));
    let (ticket, result) = outcomes.recv().await.unwrap();
    session.resolve(&ticket, result);

    let panel = render::waterfall(&session.view(), &RenderConfig::default());
    assert_eq!(panel, render::Panel::Failed("trace nope not found".to_string()));
}

#[tokio::test]
async fn full_navigation_round_trip() {
    let store = DelayedStore::new().with_trace(0, checkout_trace("t1"));
    let (mut loader, mut outcomes) = TraceLoader::new(Arc::new(store));
    let mut session = TraceSession::new();

    loader.fetch(session.request("t1"));
    let (ticket, result) = outcomes.recv().await.unwrap();
    session.resolve(&ticket, result);

    let metrics = session.snapshot().unwrap().metrics().clone();
    assert_eq!(metrics.services, ["storefront", "payments", "postgres"]);
    assert_eq!(metrics.total_duration, 120.0);
    assert_eq!(metrics.total_duration_source, TotalDurationSource::Declared);

    let config = RenderConfig::default();
    let rows = render::waterfall(&session.view(), &config);
    let rows = rows.ready().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].is_error);
    assert_eq!(rows[1].status_label, "502");

    assert!(session.dispatch(NavEvent::SelectSpan("db".into())).changed());
    let crumbs: Vec<_> = render::breadcrumb(session.navigation())
        .into_iter()
        .map(|crumb| crumb.label)
        .collect();
    assert_eq!(crumbs, ["POST /checkout", "INSERT orders"]);

    let detail = session.view().detail().unwrap();
    assert_eq!(detail.title, "INSERT orders");

    session.dispatch(NavEvent::SetMode(ViewMode::Tree));
    session.dispatch(NavEvent::ToggleExpand("root".into()));
    let tree_rows = render::tree(&session.view(), &config);
    assert_eq!(tree_rows.ready().map(Vec::len), Some(1));

    session.unmount();
    assert_eq!(render::tree(&session.view(), &config), render::Panel::Idle);
}
