//! In-memory span store for spanscope.
//!
//! Spans are ingested from JSON files or generated as seed data, grouped into
//! traces, and served back through [`spanscope::SpanStore`].

mod load;
mod seed_data;
mod storage;

pub use load::{load_json_file, parse_traces, LoadError};
pub use seed_data::{load_seed_data, seed_traces};
pub use storage::{StoreConfig, TraceStore};
