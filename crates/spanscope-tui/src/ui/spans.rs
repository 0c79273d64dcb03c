use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span as TextSpan};
use ratatui::widgets::{Cell, Row, Table, TableState};
use ratatui::Frame;

use spanscope::render::{self, Panel, TreeRow, WaterfallRow};
use spanscope::ViewMode;

use super::{
    is_focused, panel_block, placeholder, truncate_with_ellipsis, BAR_COLOR, ERROR_COLOR, SELECTION_BG,
    SELECTION_FG, TEXT_ACCENT, TEXT_MUTED, TEXT_PRIMARY,
};
use crate::app::{App, Focus};

const BAR_CELL: &str = "█";

/// Draw the waterfall or the tree, whichever mode is active
pub(super) fn render(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let view = app.session.view();
    let mode = view.nav.mode();
    let block = panel_block(
        format!("{} [m]", mode.label()),
        is_focused(app, Focus::Spans),
    );

    let (rows, widths, header) = match mode {
        ViewMode::Waterfall => match render::waterfall(&view, &app.config) {
            Panel::Ready(rows) => waterfall_table(&rows, app, area.width),
            other => return frame.render_widget(placeholder(other.message().unwrap_or_default(), block), area),
        },
        ViewMode::Tree => match render::tree(&view, &app.config) {
            Panel::Ready(rows) => tree_table(&rows, area.width),
            other => return frame.render_widget(placeholder(other.message().unwrap_or_default(), block), area),
        },
    };

    let table = Table::new(rows, widths)
        .header(header.style(Style::default().fg(TEXT_ACCENT).add_modifier(Modifier::BOLD)))
        .block(block)
        .highlight_style(
            Style::default()
                .fg(SELECTION_FG)
                .bg(SELECTION_BG)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    if app.focus == Focus::Spans {
        state.select(Some(app.span_cursor));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn row_style(is_error: bool, selected: bool) -> Style {
    let style = if is_error {
        Style::default().fg(ERROR_COLOR)
    } else {
        Style::default().fg(TEXT_PRIMARY)
    };
    if selected {
        style.add_modifier(Modifier::UNDERLINED)
    } else {
        style
    }
}

fn waterfall_table(
    rows: &[WaterfallRow],
    app: &App,
    width: u16,
) -> (Vec<Row<'static>>, Vec<Constraint>, Row<'static>) {
    let bar_width = app.config.bar_width.min(width.saturating_sub(40) / 2).max(10);
    let name_width = usize::from(width.saturating_sub(bar_width + 40)).max(16);

    let table_rows = rows
        .iter()
        .map(|row| {
            let name = format!("{}{}", " ".repeat(row.indent), row.name);
            let bar = BAR_CELL.repeat(usize::from(row.bar_cells(bar_width)));
            let attributes = row
                .attributes
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(" ");

            Row::new(vec![
                Cell::from(truncate_with_ellipsis(&name, name_width)),
                Cell::from(row.service_name.clone()),
                Cell::from(Line::from(TextSpan::styled(bar, Style::default().fg(BAR_COLOR)))),
                Cell::from(row.duration_label.clone()),
                Cell::from(row.status_label.clone()),
                Cell::from(Line::from(TextSpan::styled(attributes, Style::default().fg(TEXT_MUTED)))),
            ])
            .style(row_style(row.is_error, row.selected))
        })
        .collect();

    let widths = vec![
        Constraint::Length(name_width as u16),
        Constraint::Length(14),
        Constraint::Length(bar_width),
        Constraint::Length(11),
        Constraint::Length(6),
        Constraint::Min(0),
    ];
    let header = Row::new(vec!["Operation", "Service", "", "Duration", "Status", "Attributes"]);
    (table_rows, widths, header)
}

fn tree_table(rows: &[TreeRow], width: u16) -> (Vec<Row<'static>>, Vec<Constraint>, Row<'static>) {
    let name_width = usize::from(width.saturating_sub(36)).max(16);

    let table_rows = rows
        .iter()
        .map(|row| {
            let name = format!("{}{} {}", " ".repeat(row.indent), row.marker(), row.name);
            Row::new(vec![
                Cell::from(truncate_with_ellipsis(&name, name_width)),
                Cell::from(row.service_name.clone()),
                Cell::from(row.duration_label.clone()),
                Cell::from(row.http_status.map(|s| s.to_string()).unwrap_or_default()),
            ])
            .style(row_style(row.is_error, row.selected))
        })
        .collect();

    let widths = vec![
        Constraint::Length(name_width as u16),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(6),
    ];
    let header = Row::new(vec!["Operation", "Service", "Duration", "Status"]);
    (table_rows, widths, header)
}
