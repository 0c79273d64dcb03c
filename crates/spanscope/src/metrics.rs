//! Summary statistics over a trace's flat span list.
//!
//! Metrics are computed from the flat list rather than the tree, so they do
//! not depend on how (or whether) parent references resolve.

use spanscope_protocol::{Span, SpanId, Timestamp, TracePayload};
use std::collections::HashSet;
use std::sync::Arc;

/// Where [`TraceMetrics::total_duration`] was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalDurationSource {
    /// The payload named its root span and that span was present
    Declared,
    /// Positional convention: the first span of the input list
    FirstSpan,
    /// No spans at all
    Unavailable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraceMetrics {
    /// Distinct non-empty service names, in order of first appearance
    pub services: Vec<String>,
    pub span_count: usize,
    /// Longest span duration in milliseconds; only used to scale bars
    pub max_duration: f64,
    /// Duration of the root span in milliseconds. Not a sum, not a max.
    pub total_duration: f64,
    pub total_duration_source: TotalDurationSource,
    pub min_start_time: Option<Timestamp>,
}

impl TraceMetrics {
    pub fn compute(spans: &[Span], root_span_id: Option<&SpanId>) -> Self {
        let mut seen = HashSet::new();
        let services = spans
            .iter()
            .map(|span| span.service_name.as_str())
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(str::to_string)
            .collect();

        let max_duration = spans.iter().map(Span::duration_ms).fold(0.0, f64::max);
        let min_start_time = spans.iter().map(|span| span.start_time).min();

        let declared = root_span_id.and_then(|id| spans.iter().find(|span| &span.span_id == id));
        let (total_duration, total_duration_source) = match (declared, spans.first()) {
            (Some(root), _) => (root.duration_ms(), TotalDurationSource::Declared),
            (None, Some(first)) => {
                if let Some(id) = root_span_id {
                    tracing::warn!(root_span_id = %id, "declared root span missing, using first span");
                }
                (first.duration_ms(), TotalDurationSource::FirstSpan)
            }
            (None, None) => (0.0, TotalDurationSource::Unavailable),
        };

        Self {
            services,
            span_count: spans.len(),
            max_duration,
            total_duration,
            total_duration_source,
            min_start_time,
        }
    }

    pub fn from_payload(payload: &TracePayload) -> Self {
        Self::compute(&payload.spans, payload.root_span_id.as_ref())
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span_count == 0
    }

    /// Width of a duration bar as a fraction of the longest span, in `[0, 1]`.
    ///
    /// Returns 0 when there is nothing to scale against.
    pub fn bar_fraction(&self, duration_ms: f64) -> f64 {
        if !self.max_duration.is_finite() || self.max_duration <= 0.0 || !duration_ms.is_finite() {
            return 0.0;
        }
        (duration_ms / self.max_duration).clamp(0.0, 1.0)
    }
}

/// Memoizes [`TraceMetrics`] per input list.
///
/// The cache is keyed by the identity of the `Arc` holding the spans, so a
/// new list always recomputes and the same list never does.
#[derive(Debug, Default)]
pub struct MetricsCache {
    entry: Option<CacheEntry>,
    computations: usize,
}

#[derive(Debug)]
struct CacheEntry {
    spans: Arc<[Span]>,
    root_span_id: Option<SpanId>,
    metrics: TraceMetrics,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, spans: &Arc<[Span]>, root_span_id: Option<&SpanId>) -> &TraceMetrics {
        let hit = self.entry.as_ref().is_some_and(|entry| {
            Arc::ptr_eq(&entry.spans, spans) && entry.root_span_id.as_ref() == root_span_id
        });

        if !hit {
            self.entry = None;
        }

        let entry = self.entry.get_or_insert_with(|| {
            self.computations += 1;
            CacheEntry {
                spans: Arc::clone(spans),
                root_span_id: root_span_id.cloned(),
                metrics: TraceMetrics::compute(spans, root_span_id),
            }
        });
        &entry.metrics
    }

    /// How many times metrics were actually computed
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, service: &str, duration: f64) -> Span {
        Span {
            span_id: SpanId::from(id),
            service_name: service.to_string(),
            duration,
            ..Default::default()
        }
    }

    #[test]
    fn chain_scenario() {
        let spans = vec![
            span("a", "gateway", 100.0),
            span("b", "orders", 40.0),
            span("c", "gateway", 10.0),
        ];
        let metrics = TraceMetrics::compute(&spans, None);
        assert_eq!(metrics.services, ["gateway", "orders"]);
        assert_eq!(metrics.service_count(), 2);
        assert_eq!(metrics.span_count, 3);
        assert_eq!(metrics.max_duration, 100.0);
        assert_eq!(metrics.total_duration, 100.0);
        assert_eq!(metrics.total_duration_source, TotalDurationSource::FirstSpan);
    }

    #[test]
    fn total_duration_is_first_span_not_max() {
        let spans = vec![span("child", "svc", 5.0), span("root", "svc", 80.0)];
        let metrics = TraceMetrics::compute(&spans, None);
        assert_eq!(metrics.total_duration, 5.0);
        assert_eq!(metrics.max_duration, 80.0);
    }

    #[test]
    fn declared_root_wins_over_position() {
        let spans = vec![span("child", "svc", 5.0), span("root", "svc", 80.0)];
        let metrics = TraceMetrics::compute(&spans, Some(&SpanId::from("root")));
        assert_eq!(metrics.total_duration, 80.0);
        assert_eq!(metrics.total_duration_source, TotalDurationSource::Declared);

        let metrics = TraceMetrics::compute(&spans, Some(&SpanId::from("nope")));
        assert_eq!(metrics.total_duration, 5.0);
        assert_eq!(metrics.total_duration_source, TotalDurationSource::FirstSpan);
    }

    #[test]
    fn empty_service_names_are_skipped() {
        let spans = vec![span("a", "", 1.0), span("b", "db", 1.0), span("c", "", 1.0)];
        let metrics = TraceMetrics::compute(&spans, None);
        assert_eq!(metrics.services, ["db"]);
    }

    #[test]
    fn empty_input() {
        let metrics = TraceMetrics::compute(&[], None);
        assert_eq!(metrics.span_count, 0);
        assert!(metrics.services.is_empty());
        assert_eq!(metrics.max_duration, 0.0);
        assert_eq!(metrics.total_duration_source, TotalDurationSource::Unavailable);
        assert_eq!(metrics.min_start_time, None);
        assert_eq!(metrics.bar_fraction(10.0), 0.0);
    }

    #[test]
    fn bar_fraction_is_bounded() {
        let metrics = TraceMetrics::compute(&[span("a", "s", 50.0)], None);
        assert_eq!(metrics.bar_fraction(25.0), 0.5);
        assert_eq!(metrics.bar_fraction(500.0), 1.0);
        assert_eq!(metrics.bar_fraction(f64::NAN), 0.0);
        assert_eq!(metrics.bar_fraction(-1.0), 0.0);
    }

    #[test]
    fn zero_durations_never_divide_by_zero() {
        let metrics = TraceMetrics::compute(&[span("a", "s", 0.0), span("b", "s", 0.0)], None);
        let fraction = metrics.bar_fraction(0.0);
        assert!(fraction.is_finite());
        assert_eq!(fraction, 0.0);
    }

    #[test]
    fn min_start_time() {
        let mut early = span("a", "s", 1.0);
        early.start_time = Timestamp::from_unix_millis(1_000);
        let mut late = span("b", "s", 1.0);
        late.start_time = Timestamp::from_unix_millis(5_000);
        let metrics = TraceMetrics::compute(&[late, early], None);
        assert_eq!(metrics.min_start_time, Some(Timestamp::from_unix_millis(1_000)));
    }

    #[test]
    fn cache_recomputes_only_for_new_input() {
        let spans: Arc<[Span]> = vec![span("a", "s", 3.0)].into();
        let mut cache = MetricsCache::new();

        assert_eq!(cache.get(&spans, None).span_count, 1);
        assert_eq!(cache.get(&spans, None).span_count, 1);
        assert_eq!(cache.computations(), 1);

        // Equal contents, different list: recompute.
        let copy: Arc<[Span]> = spans.to_vec().into();
        cache.get(&copy, None);
        assert_eq!(cache.computations(), 2);

        cache.get(&copy, Some(&SpanId::from("a")));
        assert_eq!(cache.computations(), 3);
    }
}
