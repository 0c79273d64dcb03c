//! Data definitions shared by every spanscope crate.
//!
//! This crate defines the span representation reported by instrumented
//! services and the trace payload a span store hands back for one trace.

pub mod ids;
pub mod span;
pub mod trace;

pub use ids::*;
pub use span::*;
pub use trace::*;
