//! Trace reconstruction and timeline state for span viewers.
//!
//! A flat span list goes in; out comes a [`SpanTree`], aggregate
//! [`TraceMetrics`], and a [`NavigationController`] tracking what the user has
//! expanded and selected. [`TraceSession`] ties these to an asynchronous
//! [`SpanStore`] so that only the most recently requested trace is ever shown.
//!
//! # Example
//!
//! ```
//! use spanscope::{render, NavEvent, RenderConfig, SpanBuilder, TracePayload, TraceSession};
//!
//! let spans = vec![
//!     SpanBuilder::new("t1", "root", "GET /").service("web").lasting(40.0).build(),
//!     SpanBuilder::new("t1", "db", "SELECT").service("pg").child_of("root").lasting(12.0).build(),
//! ];
//!
//! let mut session = TraceSession::new();
//! let ticket = session.request("t1");
//! session.resolve(&ticket, Ok(TracePayload::new("t1", spans)));
//! session.dispatch(NavEvent::SelectSpan("db".into()));
//!
//! let rows = render::tree(&session.view(), &RenderConfig::default());
//! assert_eq!(rows.ready().map(Vec::len), Some(2));
//! ```

pub mod config;
pub mod detail;
pub mod format;
mod loader;
pub mod metrics;
pub mod navigation;
pub mod render;
pub mod session;
mod span_builder;
mod store;
pub mod tree;

pub use config::RenderConfig;
pub use detail::SpanDetail;
pub use loader::{FetchOutcome, TraceLoader};
pub use metrics::{MetricsCache, TotalDurationSource, TraceMetrics};
pub use navigation::{NavEvent, NavigationController, NavigationState, Selection, Transition, ViewMode};
pub use session::{FetchTicket, LoadStatus, Resolution, TraceSession, TraceSnapshot, TraceView};
pub use span_builder::SpanBuilder;
pub use spanscope_protocol::*;
pub use store::{FetchError, SpanStore};
pub use tree::{NodeId, SpanNode, SpanTree};
