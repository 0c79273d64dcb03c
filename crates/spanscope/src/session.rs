//! Trace session: the state a hosting view holds for one trace at a time.
//!
//! The session is where the asynchronous fetch meets the synchronous core.
//! Every request gets a [`FetchTicket`]; only the ticket of the latest request
//! may resolve, so a slow response for a trace the user already left can
//! never overwrite what is on screen.

use spanscope_protocol::{Span, SpanId, TraceId, TracePayload};
use std::sync::Arc;

use crate::detail::SpanDetail;
use crate::metrics::{MetricsCache, TraceMetrics};
use crate::navigation::{NavEvent, NavigationController, NavigationState, Transition};
use crate::store::FetchError;
use crate::tree::SpanTree;

/// Proof of a request, handed back with its response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    trace_id: TraceId,
    generation: u64,
}

impl FetchTicket {
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of [`TraceSession::resolve`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// A newer request superseded this one; the response was dropped
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
    /// No trace requested
    Idle,
    Loading,
    Ready,
    /// The trace exists but has no spans
    Empty,
    Failed(FetchError),
}

/// An immutable, fully built trace
#[derive(Clone, Debug)]
pub struct TraceSnapshot {
    trace_id: TraceId,
    root_span_id: Option<SpanId>,
    spans: Arc<[Span]>,
    tree: SpanTree,
    metrics: TraceMetrics,
}

impl TraceSnapshot {
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn root_span_id(&self) -> Option<&SpanId> {
        self.root_span_id.as_ref()
    }

    /// The flat span list exactly as received
    pub fn spans(&self) -> &Arc<[Span]> {
        &self.spans
    }

    pub fn tree(&self) -> &SpanTree {
        &self.tree
    }

    pub fn metrics(&self) -> &TraceMetrics {
        &self.metrics
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Read-only view over a session, what renderers consume
#[derive(Clone, Copy, Debug)]
pub struct TraceView<'a> {
    pub status: &'a LoadStatus,
    pub snapshot: Option<&'a TraceSnapshot>,
    pub nav: &'a NavigationState,
    pub active_trace: Option<&'a TraceId>,
}

impl<'a> TraceView<'a> {
    pub fn selected_span(&self) -> Option<&'a Span> {
        let snapshot = self.snapshot?;
        let span_id = self.nav.selected_id()?;
        snapshot.tree().span(span_id)
    }

    /// Detail panel content, when a span is selected and the panel is open
    pub fn detail(&self) -> Option<SpanDetail> {
        if !self.nav.is_detail_open() {
            return None;
        }
        self.selected_span().map(SpanDetail::from_span)
    }
}

#[derive(Debug)]
pub struct TraceSession {
    active: Option<FetchTicket>,
    generation: u64,
    status: LoadStatus,
    snapshot: Option<TraceSnapshot>,
    nav: NavigationController,
    metrics: MetricsCache,
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSession {
    pub fn new() -> Self {
        Self {
            active: None,
            generation: 0,
            status: LoadStatus::Idle,
            snapshot: None,
            nav: NavigationController::new(),
            metrics: MetricsCache::new(),
        }
    }

    /// Start loading `trace_id`.
    ///
    /// Any earlier request is superseded. Selection and breadcrumb are
    /// cleared right away; the previous snapshot stays untouched until the
    /// new response resolves.
    pub fn request(&mut self, trace_id: impl Into<TraceId>) -> FetchTicket {
        let trace_id = trace_id.into();
        self.generation += 1;
        let ticket = FetchTicket {
            trace_id,
            generation: self.generation,
        };

        if let Some(previous) = self.active.replace(ticket.clone()) {
            tracing::debug!(
                superseded = %previous.trace_id,
                requested = %ticket.trace_id,
                "superseding in-flight trace request"
            );
        }

        self.nav.clear_selection();
        self.status = LoadStatus::Loading;
        ticket
    }

    /// Apply the response for `ticket`, unless a newer request exists
    pub fn resolve(
        &mut self,
        ticket: &FetchTicket,
        result: Result<TracePayload, FetchError>,
    ) -> Resolution {
        if self.active.as_ref() != Some(ticket) {
            tracing::debug!(
                trace_id = %ticket.trace_id,
                generation = ticket.generation,
                "discarding stale trace response"
            );
            return Resolution::Stale;
        }

        match result {
            Ok(payload) => {
                if !payload.trace_id.is_empty() && payload.trace_id != ticket.trace_id {
                    tracing::warn!(
                        requested = %ticket.trace_id,
                        received = %payload.trace_id,
                        "store answered with a different trace id"
                    );
                }
                self.install(ticket.trace_id.clone(), payload.root_span_id, payload.spans.into());
            }
            Err(err) => {
                tracing::warn!(trace_id = %ticket.trace_id, error = %err, "failed to fetch trace");
                self.status = LoadStatus::Failed(err);
            }
        }

        Resolution::Applied
    }

    /// Install a span list the host already holds, without a fetch.
    ///
    /// Supplying the very same list again is a no-op: the tree is not rebuilt
    /// and expansion and selection are kept.
    pub fn supply(
        &mut self,
        trace_id: impl Into<TraceId>,
        root_span_id: Option<SpanId>,
        spans: Arc<[Span]>,
    ) {
        let trace_id = trace_id.into();
        let same_trace = self
            .active
            .as_ref()
            .is_some_and(|active| active.trace_id == trace_id);

        if same_trace {
            // Invalidate any in-flight fetch, keep the selection.
            self.generation += 1;
            self.active = Some(FetchTicket {
                trace_id: trace_id.clone(),
                generation: self.generation,
            });
        } else {
            self.request(trace_id.clone());
        }

        self.install(trace_id, root_span_id, spans);
    }

    /// The hosting view went away: drop interest in everything
    pub fn unmount(&mut self) {
        self.active = None;
        self.status = LoadStatus::Idle;
        self.snapshot = None;
        self.metrics.clear();
        self.nav.reset();
    }

    /// Apply a navigation event against the current tree
    pub fn dispatch(&mut self, event: NavEvent) -> Transition {
        match &self.snapshot {
            Some(snapshot) => self.nav.apply(event, &snapshot.tree),
            None => self.nav.apply(event, &SpanTree::default()),
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn snapshot(&self) -> Option<&TraceSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn navigation(&self) -> &NavigationState {
        self.nav.state()
    }

    pub fn active_trace(&self) -> Option<&TraceId> {
        self.active.as_ref().map(FetchTicket::trace_id)
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn view(&self) -> TraceView<'_> {
        TraceView {
            status: &self.status,
            snapshot: self.snapshot.as_ref(),
            nav: self.nav.state(),
            active_trace: self.active_trace(),
        }
    }

    fn install(&mut self, trace_id: TraceId, root_span_id: Option<SpanId>, spans: Arc<[Span]>) {
        let unchanged = self.snapshot.as_ref().is_some_and(|current| {
            current.trace_id == trace_id
                && current.root_span_id == root_span_id
                && Arc::ptr_eq(&current.spans, &spans)
        });

        if !unchanged {
            let tree = SpanTree::build(&spans);
            let metrics = self.metrics.get(&spans, root_span_id.as_ref()).clone();
            tracing::debug!(
                %trace_id,
                spans = spans.len(),
                roots = tree.roots().len(),
                services = metrics.service_count(),
                "trace tree rebuilt"
            );

            let previous_selection = self.nav.state().selected_id().cloned();
            let snapshot = self.snapshot.insert(TraceSnapshot {
                trace_id,
                root_span_id,
                spans,
                tree,
                metrics,
            });

            self.nav.apply(NavEvent::TreeLoaded(snapshot.tree.root_ids()), &snapshot.tree);
            match previous_selection {
                Some(span_id) if snapshot.tree.get(&span_id).is_some() => {
                    self.nav.apply(NavEvent::SelectSpan(span_id), &snapshot.tree);
                }
                Some(_) => self.nav.clear_selection(),
                None => {}
            }
        }

        self.status = match &self.snapshot {
            Some(snapshot) if !snapshot.is_empty() => LoadStatus::Ready,
            _ => LoadStatus::Empty,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Selection;

    fn span(id: &str, parent: Option<&str>, duration: f64) -> Span {
        Span {
            span_id: SpanId::from(id),
            parent_span_id: parent.map(SpanId::from),
            service_name: "svc".to_string(),
            duration,
            ..Default::default()
        }
    }

    fn chain_payload(trace: &str) -> TracePayload {
        TracePayload::new(
            trace,
            vec![
                span("a", None, 100.0),
                span("b", Some("a"), 40.0),
                span("c", Some("b"), 10.0),
            ],
        )
    }

    #[test]
    fn resolve_builds_tree_and_expands_roots() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        assert!(session.is_loading());

        assert_eq!(session.resolve(&ticket, Ok(chain_payload("t1"))), Resolution::Applied);
        assert_eq!(session.status(), &LoadStatus::Ready);

        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.tree().root_ids(), [SpanId::from("a")]);
        assert_eq!(snapshot.metrics().max_duration, 100.0);
        assert!(session.navigation().is_expanded(&"a".into()));
        assert_eq!(session.navigation().expanded_ids().len(), 1);
    }

    #[test]
    fn last_requested_trace_wins() {
        let mut session = TraceSession::new();
        let first = session.request("t1");
        let second = session.request("t2");

        assert_eq!(session.resolve(&first, Ok(chain_payload("t1"))), Resolution::Stale);
        assert!(session.is_loading());
        assert!(session.snapshot().is_none());

        assert_eq!(session.resolve(&second, Ok(chain_payload("t2"))), Resolution::Applied);
        assert_eq!(session.snapshot().unwrap().trace_id(), &TraceId::from("t2"));
    }

    #[test]
    fn rerequesting_same_trace_discards_older_response() {
        let mut session = TraceSession::new();
        let old = session.request("t1");
        let new = session.request("t1");
        assert_eq!(session.resolve(&old, Ok(chain_payload("t1"))), Resolution::Stale);
        assert_eq!(session.resolve(&new, Ok(chain_payload("t1"))), Resolution::Applied);
    }

    #[test]
    fn loading_keeps_prior_tree_and_clears_selection() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        session.resolve(&ticket, Ok(chain_payload("t1")));
        session.dispatch(NavEvent::SelectSpan("c".into()));
        assert_eq!(session.navigation().breadcrumb().len(), 3);

        session.request("t2");
        assert!(session.is_loading());
        assert_eq!(session.snapshot().unwrap().trace_id(), &TraceId::from("t1"));
        assert_eq!(session.navigation().selection(), Selection::NoSelection);
        assert!(session.navigation().breadcrumb().is_empty());
    }

    #[test]
    fn empty_and_failed_are_distinct() {
        let mut session = TraceSession::new();
        let ticket = session.request("empty");
        session.resolve(&ticket, Ok(TracePayload::new("empty", vec![])));
        assert_eq!(session.status(), &LoadStatus::Empty);
        assert_eq!(session.snapshot().unwrap().metrics().span_count, 0);

        let ticket = session.request("broken");
        session.resolve(&ticket, Err(FetchError::Backend("connection reset".into())));
        assert_eq!(
            session.status(),
            &LoadStatus::Failed(FetchError::Backend("connection reset".into()))
        );
    }

    #[test]
    fn stale_failure_does_not_clobber_ready_trace() {
        let mut session = TraceSession::new();
        let slow = session.request("t1");
        let fast = session.request("t2");
        session.resolve(&fast, Ok(chain_payload("t2")));
        assert_eq!(
            session.resolve(&slow, Err(FetchError::NotFound("t1".into()))),
            Resolution::Stale
        );
        assert_eq!(session.status(), &LoadStatus::Ready);
    }

    #[test]
    fn supplying_same_list_keeps_navigation() {
        let spans: Arc<[Span]> = chain_payload("t1").spans.into();
        let mut session = TraceSession::new();
        session.supply("t1", None, Arc::clone(&spans));
        session.dispatch(NavEvent::ToggleExpand("b".into()));
        session.dispatch(NavEvent::SelectSpan("c".into()));

        session.supply("t1", None, Arc::clone(&spans));
        assert!(session.navigation().is_expanded(&"b".into()));
        assert_eq!(session.navigation().selected_id(), Some(&SpanId::from("c")));
    }

    #[test]
    fn refreshed_list_resets_expansion_and_keeps_surviving_selection() {
        let mut session = TraceSession::new();
        session.supply("t1", None, chain_payload("t1").spans.into());
        session.dispatch(NavEvent::ToggleExpand("b".into()));
        session.dispatch(NavEvent::SelectSpan("c".into()));

        session.supply("t1", None, chain_payload("t1").spans.into());
        assert!(!session.navigation().is_expanded(&"b".into()));
        assert!(session.navigation().is_expanded(&"a".into()));
        let crumbs: Vec<_> = session
            .navigation()
            .breadcrumb()
            .iter()
            .map(|s| s.span_id.as_str())
            .collect();
        assert_eq!(crumbs, ["a", "b", "c"]);
    }

    #[test]
    fn supplying_invalidates_in_flight_fetch() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        session.supply("t1", None, chain_payload("t1").spans.into());
        assert_eq!(session.resolve(&ticket, Ok(TracePayload::new("t1", vec![]))), Resolution::Stale);
        assert_eq!(session.status(), &LoadStatus::Ready);
    }

    #[test]
    fn unmount_clears_everything() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        session.resolve(&ticket, Ok(chain_payload("t1")));
        session.dispatch(NavEvent::SelectSpan("b".into()));

        session.unmount();
        assert_eq!(session.status(), &LoadStatus::Idle);
        assert!(session.snapshot().is_none());
        assert_eq!(session.navigation().selection(), Selection::NoSelection);
        assert_eq!(session.resolve(&ticket, Ok(chain_payload("t1"))), Resolution::Stale);
    }

    #[test]
    fn view_exposes_detail_for_selection() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        session.resolve(&ticket, Ok(chain_payload("t1")));
        assert!(session.view().detail().is_none());

        session.dispatch(NavEvent::SelectSpan("b".into()));
        let view = session.view();
        assert_eq!(view.selected_span().map(|s| s.span_id.as_str()), Some("b"));
        assert!(view.detail().is_some());

        session.dispatch(NavEvent::CloseDetail);
        assert!(session.view().detail().is_none());
    }

    #[test]
    fn declared_root_drives_total_duration() {
        let mut session = TraceSession::new();
        let ticket = session.request("t1");
        let payload = TracePayload::new(
            "t1",
            vec![span("child", Some("root"), 5.0), span("root", None, 75.0)],
        )
        .with_root("root");
        session.resolve(&ticket, Ok(payload));
        assert_eq!(session.snapshot().unwrap().metrics().total_duration, 75.0);
    }
}
