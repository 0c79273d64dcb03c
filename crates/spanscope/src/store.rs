use spanscope_protocol::{TraceId, TracePayload};
use std::future::Future;
use std::sync::Arc;

/// Why a trace could not be fetched
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("trace {0} not found")]
    NotFound(TraceId),

    #[error("span store error: {0}")]
    Backend(String),

    #[error("invalid trace payload: {0}")]
    Decode(String),
}

/// Source of span lists, one trace at a time.
///
/// Implementations own transport, retries and storage; the core only sees
/// the resolved payload or the failure.
pub trait SpanStore: Send + Sync + 'static {
    fn fetch_trace(
        &self,
        trace_id: &TraceId,
    ) -> impl Future<Output = Result<TracePayload, FetchError>> + Send;
}

impl<S: SpanStore> SpanStore for Arc<S> {
    fn fetch_trace(
        &self,
        trace_id: &TraceId,
    ) -> impl Future<Output = Result<TracePayload, FetchError>> + Send {
        (**self).fetch_trace(trace_id)
    }
}
