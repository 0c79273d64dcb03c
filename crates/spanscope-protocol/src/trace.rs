use serde::{Deserialize, Serialize};

use crate::ids::{empty_span_id_as_none, SpanId, TraceId};
use crate::span::{Span, Timestamp};

/// Everything a span store returns for one trace.
///
/// `root_span_id` names the entry span explicitly. Stores that cannot name it
/// leave it empty and consumers fall back to the first span of `spans`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePayload {
    #[serde(default)]
    pub trace_id: TraceId,
    #[serde(
        default,
        deserialize_with = "empty_span_id_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub root_span_id: Option<SpanId>,
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TracePayload {
    pub fn new(trace_id: impl Into<TraceId>, spans: Vec<Span>) -> Self {
        Self {
            trace_id: trace_id.into(),
            root_span_id: None,
            spans,
        }
    }

    /// Name the entry span of this trace
    pub fn with_root(mut self, root_span_id: impl Into<SpanId>) -> Self {
        self.root_span_id = Some(root_span_id.into());
        self
    }

    /// The span named by `root_span_id`, if it is part of the payload
    pub fn declared_root(&self) -> Option<&Span> {
        let root_id = self.root_span_id.as_ref()?;
        self.spans.iter().find(|span| &span.span_id == root_id)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Summary of a trace (for listing)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub trace_id: TraceId,
    pub root_span_name: String,
    pub service_name: String,
    pub start_time: Timestamp,
    /// Duration of the root span in milliseconds
    pub duration: f64,
    pub span_count: usize,
    pub has_errors: bool,
}

/// Filter for listing traces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFilter {
    pub service: Option<String>,
    pub min_duration_ms: Option<f64>,
    pub max_duration_ms: Option<f64>,
    pub has_errors: Option<bool>,
    pub limit: Option<usize>,
}
