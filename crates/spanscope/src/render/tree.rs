use spanscope_protocol::SpanId;

use crate::config::RenderConfig;
use crate::format;
use crate::navigation::NavigationState;
use crate::tree::{SpanNode, SpanTree};

/// One line of the collapsible tree view
#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub span_id: SpanId,
    pub name: String,
    pub service_name: String,
    pub depth: usize,
    pub indent: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
    pub duration_ms: f64,
    pub duration_label: String,
    pub http_status: Option<u16>,
    pub is_error: bool,
}

impl TreeRow {
    /// Disclosure glyph for the row
    pub fn marker(&self) -> &'static str {
        match (self.has_children, self.expanded) {
            (false, _) => "•",
            (true, true) => "▾",
            (true, false) => "▸",
        }
    }
}

/// Visible rows: descendants of collapsed nodes are skipped
pub fn rows(tree: &SpanTree, nav: &NavigationState, config: &RenderConfig) -> Vec<TreeRow> {
    tree.walk(|node: &SpanNode| nav.is_expanded(node.span_id()))
        .map(|(_, node)| {
            let span = node.span();
            let duration_ms = span.duration_ms();
            TreeRow {
                span_id: span.span_id.clone(),
                name: span.name.clone(),
                service_name: span.service_name.clone(),
                depth: node.depth(),
                indent: node.depth() * config.indent_width,
                has_children: node.has_children(),
                expanded: nav.is_expanded(&span.span_id),
                selected: nav.is_selected(&span.span_id),
                duration_ms,
                duration_label: format::duration_ms(duration_ms),
                http_status: span.http_status,
                is_error: span.is_error(),
            }
        })
        .collect()
}
