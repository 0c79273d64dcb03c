use spanscope_protocol::SpanId;

use crate::config::RenderConfig;
use crate::detail::status_label;
use crate::format;
use crate::metrics::TraceMetrics;
use crate::navigation::NavigationState;
use crate::tree::SpanTree;

/// One line of the waterfall view
#[derive(Clone, Debug, PartialEq)]
pub struct WaterfallRow {
    pub span_id: SpanId,
    pub name: String,
    pub service_name: String,
    pub depth: usize,
    /// Leading columns, `depth * indent_width`
    pub indent: usize,
    pub has_children: bool,
    pub duration_ms: f64,
    pub duration_label: String,
    /// Bar length relative to the longest span, in `[0, 1]`
    pub bar_fraction: f64,
    pub is_error: bool,
    pub status_label: String,
    pub selected: bool,
    /// Leading attributes as `(key, value)` text pairs
    pub attributes: Vec<(String, String)>,
}

impl WaterfallRow {
    /// Bar length in cells for a bar area of `width` cells
    pub fn bar_cells(&self, width: u16) -> u16 {
        let cells = (self.bar_fraction * f64::from(width)).round();
        cells.clamp(0.0, f64::from(width)) as u16
    }
}

/// Every span, depth-first, regardless of expansion
pub fn rows(
    tree: &SpanTree,
    metrics: &TraceMetrics,
    nav: &NavigationState,
    config: &RenderConfig,
) -> Vec<WaterfallRow> {
    tree.pre_order()
        .map(|(_, node)| {
            let span = node.span();
            let duration_ms = span.duration_ms();
            WaterfallRow {
                span_id: span.span_id.clone(),
                name: span.name.clone(),
                service_name: span.service_name.clone(),
                depth: node.depth(),
                indent: node.depth() * config.indent_width,
                has_children: node.has_children(),
                duration_ms,
                duration_label: format::millis(duration_ms),
                bar_fraction: metrics.bar_fraction(duration_ms),
                is_error: span.is_error(),
                status_label: status_label(span),
                selected: nav.is_selected(&span.span_id),
                attributes: span
                    .attributes
                    .iter()
                    .take(config.attribute_preview)
                    .map(|(key, value)| (key.clone(), value.to_string()))
                    .collect(),
            }
        })
        .collect()
}
