use dashmap::DashMap;
use spanscope::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Store tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a trace is kept after its last update
    pub ttl: Duration,
    /// Artificial delay added to every fetch, to exercise loading states
    pub latency: Duration,
    /// How often expired traces are swept
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            latency: Duration::ZERO,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// In-memory trace store with TTL
pub struct TraceStore {
    traces: DashMap<TraceId, StoredTrace>,
    config: StoreConfig,
}

struct StoredTrace {
    payload: TracePayload,
    updated_at: Instant,
}

impl TraceStore {
    /// Create the store and its cleanup task. Must be called within a tokio runtime.
    pub fn new(config: StoreConfig) -> Arc<Self> {
        let store = Arc::new(Self {
            traces: DashMap::new(),
            config,
        });

        // Background task to clean up expired traces
        let store_weak = Arc::downgrade(&store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.cleanup_interval);
            loop {
                interval.tick().await;
                match store_weak.upgrade() {
                    Some(store) => {
                        store.cleanup_expired();
                    }
                    None => break,
                }
            }
        });

        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Ingest loose spans, grouping them into traces. Returns how many were kept.
    ///
    /// A span whose id is already stored replaces the earlier copy in place.
    pub fn ingest(&self, spans: Vec<Span>) -> usize {
        let mut count = 0;

        for span in spans {
            if span.trace_id.is_empty() {
                tracing::warn!(span_id = %span.span_id, "dropping span without trace id");
                continue;
            }
            count += 1;

            let mut entry = self
                .traces
                .entry(span.trace_id.clone())
                .or_insert_with(|| StoredTrace {
                    payload: TracePayload::new(span.trace_id.clone(), Vec::new()),
                    updated_at: Instant::now(),
                });
            let stored = entry.value_mut();

            if stored.payload.root_span_id.is_none() && span.parent_span_id.is_none() {
                stored.payload.root_span_id = Some(span.span_id.clone());
            }

            match stored
                .payload
                .spans
                .iter_mut()
                .find(|existing| existing.span_id == span.span_id)
            {
                Some(existing) => *existing = span,
                None => stored.payload.spans.push(span),
            }
            stored.updated_at = Instant::now();
        }

        tracing::info!(count, traces = self.traces.len(), "ingested spans");
        count
    }

    /// Store a whole trace, replacing any previous version
    pub fn insert_payload(&self, payload: TracePayload) {
        tracing::info!(
            trace_id = %payload.trace_id,
            spans = payload.spans.len(),
            "stored trace"
        );
        self.traces.insert(
            payload.trace_id.clone(),
            StoredTrace {
                payload,
                updated_at: Instant::now(),
            },
        );
    }

    /// Get a complete trace by ID
    pub fn get_trace(&self, trace_id: &TraceId) -> Option<TracePayload> {
        self.traces.get(trace_id).map(|entry| entry.payload.clone())
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// List traces with filtering, newest first
    pub fn list_traces(&self, filter: &TraceFilter) -> Vec<TraceSummary> {
        let mut summaries: Vec<TraceSummary> = self
            .traces
            .iter()
            .filter_map(|entry| {
                let summary = summarize(&entry.payload);

                if let Some(service) = &filter.service {
                    if !entry.payload.spans.iter().any(|s| &s.service_name == service) {
                        return None;
                    }
                }

                if let Some(min) = filter.min_duration_ms {
                    if summary.duration < min {
                        return None;
                    }
                }

                if let Some(max) = filter.max_duration_ms {
                    if summary.duration > max {
                        return None;
                    }
                }

                if let Some(filter_errors) = filter.has_errors {
                    if summary.has_errors != filter_errors {
                        return None;
                    }
                }

                Some(summary)
            })
            .collect();

        // Sort by start time (newest first), trace id breaks ties
        summaries.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.trace_id.as_str().cmp(b.trace_id.as_str()))
        });

        let limit = filter.limit.unwrap_or(100);
        summaries.truncate(limit);

        summaries
    }

    /// Drop traces not updated within the TTL. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.traces.len();
        let ttl = self.config.ttl;
        self.traces
            .retain(|_, stored| stored.updated_at.elapsed() < ttl);
        let removed = before.saturating_sub(self.traces.len());
        if removed > 0 {
            tracing::debug!(removed, "expired traces");
        }
        removed
    }
}

impl SpanStore for TraceStore {
    async fn fetch_trace(&self, trace_id: &TraceId) -> Result<TracePayload, FetchError> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        self.get_trace(trace_id)
            .ok_or_else(|| FetchError::NotFound(trace_id.clone()))
    }
}

/// Root span: declared, else the first parentless span, else the first span
fn summary_root(payload: &TracePayload) -> Option<&Span> {
    payload
        .declared_root()
        .or_else(|| payload.spans.iter().find(|s| s.parent_span_id.is_none()))
        .or_else(|| payload.spans.first())
}

fn summarize(payload: &TracePayload) -> TraceSummary {
    let root = summary_root(payload);
    let start_time = payload
        .spans
        .iter()
        .map(|s| s.start_time)
        .min()
        .unwrap_or_default();

    TraceSummary {
        trace_id: payload.trace_id.clone(),
        root_span_name: root.map(|s| s.name.clone()).unwrap_or_default(),
        service_name: root.map(|s| s.service_name.clone()).unwrap_or_default(),
        start_time,
        duration: root.map(Span::duration_ms).unwrap_or(0.0),
        span_count: payload.spans.len(),
        has_errors: payload.spans.iter().any(Span::is_error),
    }
}
