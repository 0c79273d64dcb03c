//! Plain-text output for `spanscope dump` and `spanscope list`

use std::fmt::Write;
use std::sync::Arc;

use spanscope::render::{self, Panel, TreeRow, WaterfallRow};
use spanscope::{
    format, NavEvent, RenderConfig, TraceFilter, TraceLoader, TraceSession, TraceSummary, TraceView,
    ViewMode,
};
use spanscope_store::TraceStore;

const BAR_CELL: char = '█';

/// Fetch one trace through a session and render it as text
pub async fn dump(
    store: Arc<TraceStore>,
    config: RenderConfig,
    trace_id: Option<String>,
    mode: ViewMode,
    expand_all: bool,
) -> anyhow::Result<String> {
    let trace_id = match trace_id {
        Some(id) => id,
        None => store
            .list_traces(&TraceFilter {
                limit: Some(1),
                ..Default::default()
            })
            .into_iter()
            .next()
            .map(|summary| summary.trace_id.to_string())
            .ok_or_else(|| anyhow::anyhow!("the store holds no traces"))?,
    };

    let (mut loader, mut outcomes) = TraceLoader::new(store);
    let mut session = TraceSession::new();
    loader.fetch(session.request(trace_id.as_str()));
    let (ticket, result) = outcomes
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("trace loader stopped before answering"))?;
    session.resolve(&ticket, result);

    session.dispatch(NavEvent::SetMode(mode));
    if expand_all {
        session.dispatch(NavEvent::ExpandAll);
    }

    Ok(render_text(&session.view(), &config))
}

/// Header, then the rows of the active view mode
pub fn render_text(view: &TraceView<'_>, config: &RenderConfig) -> String {
    let mut out = String::new();

    if let Some(trace_id) = view.active_trace {
        let _ = writeln!(out, "Trace {trace_id}");
    }

    if let Some(snapshot) = view.snapshot.filter(|_| view.status == &spanscope::LoadStatus::Ready) {
        let metrics = snapshot.metrics();
        let cards: Vec<String> = render::summary(metrics)
            .iter()
            .map(|card| format!("{}: {}", card.label, card.value))
            .collect();
        let _ = writeln!(out, "{}", cards.join("   "));
        let _ = writeln!(out, "{}", render::service_map(metrics).join(" → "));
        out.push('\n');
    }

    let lines = match view.nav.mode() {
        ViewMode::Waterfall => render::waterfall(view, config).map(|rows| waterfall_lines(&rows, config)),
        ViewMode::Tree => render::tree(view, config).map(|rows| tree_lines(&rows)),
    };

    match lines {
        Panel::Ready(lines) => {
            for line in lines {
                let _ = writeln!(out, "{}", line.trim_end());
            }
        }
        other => {
            if let Some(message) = other.message() {
                let _ = writeln!(out, "{message}");
            }
        }
    }

    out
}

fn waterfall_lines(rows: &[WaterfallRow], config: &RenderConfig) -> Vec<String> {
    let names: Vec<String> = rows
        .iter()
        .map(|row| format!("{}{}", " ".repeat(row.indent), row.name))
        .collect();
    let name_width = column_width(names.iter().map(String::as_str));
    let service_width = column_width(rows.iter().map(|row| row.service_name.as_str()));
    let bar_width = usize::from(config.bar_width);

    rows.iter()
        .zip(names)
        .map(|(row, name)| {
            let bar: String = std::iter::repeat(BAR_CELL)
                .take(usize::from(row.bar_cells(config.bar_width)))
                .collect();
            let marker = if row.is_error { " !" } else { "" };
            format!(
                "{name:<name_width$}  {:<service_width$}  {bar:<bar_width$}  {:>12}  {}{marker}",
                row.service_name, row.duration_label, row.status_label,
            )
        })
        .collect()
}

fn tree_lines(rows: &[TreeRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let status = row
                .http_status
                .map(|status| format!("  [{status}]"))
                .unwrap_or_default();
            format!(
                "{}{} {}  ({})  {}{status}",
                " ".repeat(row.indent),
                row.marker(),
                row.name,
                row.service_name,
                row.duration_label,
            )
        })
        .collect()
}

/// Trace summaries as an aligned table
pub fn trace_table(summaries: &[TraceSummary]) -> String {
    if summaries.is_empty() {
        return "No traces found.\n".to_string();
    }

    let id_width = column_width(summaries.iter().map(|s| s.trace_id.as_str())).max(8);
    let name_width = column_width(summaries.iter().map(|s| s.root_span_name.as_str())).max(4);
    let service_width = column_width(summaries.iter().map(|s| s.service_name.as_str())).max(7);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<name_width$}  {:<service_width$}  {:>5}  {:>12}  ERRORS",
        "TRACE ID", "ROOT", "SERVICE", "SPANS", "DURATION"
    );
    for summary in summaries {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<name_width$}  {:<service_width$}  {:>5}  {:>12}  {}",
            summary.trace_id.as_str(),
            summary.root_span_name,
            summary.service_name,
            summary.span_count,
            format::duration_ms(summary.duration),
            if summary.has_errors { "yes" } else { "no" },
        );
    }
    out
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|value| value.chars().count()).max().unwrap_or(0)
}
