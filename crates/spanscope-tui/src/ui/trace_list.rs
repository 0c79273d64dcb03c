use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span as TextSpan};
use ratatui::widgets::{List, ListItem};
use ratatui::Frame;

use spanscope::format;

use super::{
    is_focused, panel_block, placeholder, truncate_with_ellipsis, ERROR_COLOR, SELECTION_BG, SELECTION_FG,
    TEXT_MUTED, TEXT_PRIMARY,
};
use crate::app::{App, Focus};

/// Draw the left-hand trace list with selection highlighting
pub(super) fn render(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let block = panel_block(
        format!("Traces • {}", app.traces.len()),
        is_focused(app, Focus::TraceList),
    );

    if app.traces.is_empty() {
        frame.render_widget(placeholder("No traces found", block), area);
        return;
    }

    let name_width = usize::from(area.width.saturating_sub(16)).max(8);
    let items: Vec<ListItem<'static>> = app
        .traces
        .iter()
        .map(|summary| {
            let name_style = if summary.has_errors {
                Style::default().fg(ERROR_COLOR)
            } else {
                Style::default().fg(TEXT_PRIMARY)
            };
            let name = if summary.root_span_name.is_empty() {
                summary.trace_id.to_string()
            } else {
                summary.root_span_name.clone()
            };
            ListItem::new(vec![
                Line::from(TextSpan::styled(truncate_with_ellipsis(&name, name_width), name_style)),
                Line::from(TextSpan::styled(
                    format!(
                        "  {} · {} spans · {}",
                        summary.service_name,
                        summary.span_count,
                        format::duration_ms(summary.duration)
                    ),
                    Style::default().fg(TEXT_MUTED),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(SELECTION_FG)
                .bg(SELECTION_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.trace_list);
}
