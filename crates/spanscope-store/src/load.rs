use indexmap::IndexMap;
use serde_json::Value;
use spanscope::*;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid trace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace has spans but no trace id")]
    MissingTraceId,

    #[error("unrecognized trace file: expected a span array, {{\"spans\": [...]}} or {{\"traces\": [...]}}")]
    UnrecognizedLayout,
}

/// Read traces from a JSON file
pub fn load_json_file(path: impl AsRef<Path>) -> Result<Vec<TracePayload>, LoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let traces = parse_traces(&raw)?;
    tracing::info!(path = %path.display(), traces = traces.len(), "loaded trace file");
    Ok(traces)
}

/// Parse traces from JSON: a span array, a `{ "spans": [...] }` payload, or
/// `{ "traces": [...] }`
///
/// The layout is picked from the top-level shape, so a broken element is
/// reported as such instead of falling through to another layout.
pub fn parse_traces(raw: &str) -> Result<Vec<TracePayload>, LoadError> {
    let payloads = match serde_json::from_str::<Value>(raw)? {
        spans @ Value::Array(_) => group_by_trace(serde_json::from_value(spans)?),
        Value::Object(mut file) => {
            if let Some(traces) = file.remove("traces") {
                serde_json::from_value(traces)?
            } else if file.contains_key("spans") {
                vec![serde_json::from_value(Value::Object(file))?]
            } else {
                return Err(LoadError::UnrecognizedLayout);
            }
        }
        _ => return Err(LoadError::UnrecognizedLayout),
    };

    payloads.into_iter().map(fill_trace_id).collect()
}

/// Group loose spans into payloads, in order of first appearance
fn group_by_trace(spans: Vec<Span>) -> Vec<TracePayload> {
    let mut grouped: IndexMap<TraceId, Vec<Span>> = IndexMap::new();
    for span in spans {
        grouped.entry(span.trace_id.clone()).or_default().push(span);
    }
    grouped
        .into_iter()
        .map(|(trace_id, spans)| TracePayload::new(trace_id, spans))
        .collect()
}

/// Payloads may omit their trace id when the spans carry it
fn fill_trace_id(mut payload: TracePayload) -> Result<TracePayload, LoadError> {
    if payload.trace_id.is_empty() {
        match payload.spans.iter().find(|s| !s.trace_id.is_empty()) {
            Some(span) => payload.trace_id = span.trace_id.clone(),
            None if payload.spans.is_empty() => {}
            None => return Err(LoadError::MissingTraceId),
        }
    }
    Ok(payload)
}
