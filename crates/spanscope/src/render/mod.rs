//! Pure projections of a [`TraceView`] into rows a frontend can draw.
//!
//! Nothing here mutates the tree or the navigation state.

pub mod tree;
pub mod waterfall;

use spanscope_protocol::{Span, SpanId};

use crate::config::RenderConfig;
use crate::format;
use crate::metrics::TraceMetrics;
use crate::navigation::NavigationState;
use crate::session::{LoadStatus, TraceSnapshot, TraceView};

pub use tree::TreeRow;
pub use waterfall::WaterfallRow;

/// What a panel shows for the current load state
#[derive(Clone, Debug, PartialEq)]
pub enum Panel<T> {
    Idle,
    Loading,
    Empty,
    Failed(String),
    Ready(T),
}

impl<T> Panel<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Panel::Idle => Panel::Idle,
            Panel::Loading => Panel::Loading,
            Panel::Empty => Panel::Empty,
            Panel::Failed(message) => Panel::Failed(message),
            Panel::Ready(value) => Panel::Ready(f(value)),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Placeholder text for every state but `Ready`
    pub fn message(&self) -> Option<String> {
        match self {
            Panel::Idle => Some("No trace selected".to_string()),
            Panel::Loading => Some("Loading trace...".to_string()),
            Panel::Empty => Some("No spans available.".to_string()),
            Panel::Failed(message) => Some(format!("Failed to fetch trace data: {message}")),
            Panel::Ready(_) => None,
        }
    }
}

/// Project the current snapshot, or explain why there is nothing to project
pub fn project<T>(
    view: &TraceView<'_>,
    f: impl FnOnce(&TraceSnapshot, &NavigationState) -> T,
) -> Panel<T> {
    match view.status {
        LoadStatus::Idle => Panel::Idle,
        LoadStatus::Loading => Panel::Loading,
        LoadStatus::Failed(err) => Panel::Failed(err.to_string()),
        LoadStatus::Empty => Panel::Empty,
        LoadStatus::Ready => match view.snapshot {
            Some(snapshot) if !snapshot.is_empty() => Panel::Ready(f(snapshot, view.nav)),
            _ => Panel::Empty,
        },
    }
}

pub fn waterfall(view: &TraceView<'_>, config: &RenderConfig) -> Panel<Vec<WaterfallRow>> {
    project(view, |snapshot, nav| {
        waterfall::rows(snapshot.tree(), snapshot.metrics(), nav, config)
    })
}

pub fn tree(view: &TraceView<'_>, config: &RenderConfig) -> Panel<Vec<TreeRow>> {
    project(view, |snapshot, nav| tree::rows(snapshot.tree(), nav, config))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crumb {
    pub span_id: SpanId,
    pub label: String,
}

/// Root-to-selection path as display labels
pub fn breadcrumb(nav: &NavigationState) -> Vec<Crumb> {
    nav.breadcrumb()
        .iter()
        .map(|span: &Span| Crumb {
            span_id: span.span_id.clone(),
            label: if span.name.is_empty() {
                span.span_id.to_string()
            } else {
                span.name.clone()
            },
        })
        .collect()
}

/// Services in the order they first appear in the trace
pub fn service_map(metrics: &TraceMetrics) -> &[String] {
    &metrics.services
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryCard {
    pub label: &'static str,
    pub value: String,
}

pub fn summary(metrics: &TraceMetrics) -> [SummaryCard; 3] {
    [
        SummaryCard {
            label: "Services",
            value: metrics.service_count().to_string(),
        },
        SummaryCard {
            label: "Spans",
            value: metrics.span_count.to_string(),
        },
        SummaryCard {
            label: "Total Duration",
            value: format::millis(metrics.total_duration),
        },
    ]
}
