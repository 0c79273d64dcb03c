//! Rendering layer for the spanscope TUI.
//!
//! `render` lays out the chrome (summary, breadcrumb, key help) and delegates
//! the trace list, span views and detail panel to their own modules.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span as TextSpan};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use spanscope::render;

use crate::app::{App, Focus};

mod detail;
mod spans;
mod trace_list;

pub(crate) const PANEL_BORDER_DIM: Color = Color::Rgb(73, 84, 105);
pub(crate) const PANEL_BORDER_ACTIVE: Color = Color::Rgb(139, 168, 255);
pub(crate) const TEXT_PRIMARY: Color = Color::Rgb(210, 222, 255);
pub(crate) const TEXT_MUTED: Color = Color::Rgb(150, 160, 185);
pub(crate) const TEXT_ACCENT: Color = Color::Rgb(189, 208, 255);
pub(crate) const SELECTION_BG: Color = Color::Rgb(32, 38, 56);
pub(crate) const SELECTION_FG: Color = Color::Rgb(252, 214, 87);
pub(crate) const ERROR_COLOR: Color = Color::Rgb(255, 110, 110);
pub(crate) const BAR_COLOR: Color = Color::Rgb(108, 220, 255);

const KEY_HELP: &str =
    "q quit  tab focus  ↑↓ move  enter open/select  space toggle  m mode  e/E expand/collapse all  esc close  r reload";

/// Draw one frame
pub fn render(frame: &mut Frame<'_>, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6), Constraint::Length(1)])
        .split(frame.size());

    render_summary(frame, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    trace_list::render(frame, app, columns[0]);
    render_trace_pane(frame, app, columns[1]);

    let help = Paragraph::new(KEY_HELP).style(Style::default().fg(TEXT_MUTED));
    frame.render_widget(help, rows[2]);
}

fn render_trace_pane(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let detail = app.session.view().detail();

    let (main, side) = match detail {
        Some(_) => {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(area);
            (split[0], Some(split[1]))
        }
        None => (area, None),
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(main);

    render_breadcrumb(frame, app, sections[0]);
    spans::render(frame, app, sections[1]);

    if let (Some(detail), Some(side)) = (detail, side) {
        detail::render(frame, &detail, side);
    }
}

fn render_summary(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let view = app.session.view();
    let title = match view.active_trace {
        Some(trace_id) => format!("Trace {trace_id}"),
        None => "spanscope".to_string(),
    };
    let block = panel_block(title, false);

    let lines = match view.snapshot {
        Some(snapshot) if !snapshot.is_empty() => {
            let metrics = snapshot.metrics();
            let mut cards = Vec::new();
            for card in render::summary(metrics) {
                cards.push(TextSpan::styled(format!("{}: ", card.label), Style::default().fg(TEXT_MUTED)));
                cards.push(TextSpan::styled(
                    card.value,
                    Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
                ));
                cards.push(TextSpan::raw("    "));
            }
            vec![
                Line::from(cards),
                Line::styled(
                    render::service_map(metrics).join(" → "),
                    Style::default().fg(TEXT_ACCENT),
                ),
            ]
        }
        _ => vec![Line::styled("No trace loaded", Style::default().fg(TEXT_MUTED))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_breadcrumb(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let crumbs = render::breadcrumb(app.session.navigation());
    let line = if crumbs.is_empty() {
        Line::styled("No span selected", Style::default().fg(TEXT_MUTED))
    } else {
        let last = crumbs.len() - 1;
        let mut parts = Vec::new();
        for (i, crumb) in crumbs.into_iter().enumerate() {
            let style = if i == last {
                Style::default().fg(SELECTION_FG).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(TEXT_ACCENT)
            };
            parts.push(TextSpan::styled(crumb.label, style));
            if i != last {
                parts.push(TextSpan::styled(" › ", Style::default().fg(TEXT_MUTED)));
            }
        }
        Line::from(parts)
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Bordered block, highlighted when its pane has focus
pub(crate) fn panel_block<'a>(title: impl Into<Line<'a>>, active: bool) -> Block<'a> {
    let border = if active { PANEL_BORDER_ACTIVE } else { PANEL_BORDER_DIM };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(TEXT_ACCENT))
        .border_style(Style::default().fg(border))
}

/// Centered muted placeholder inside a block
pub(crate) fn placeholder<'a>(message: impl Into<String>, block: Block<'a>) -> Paragraph<'a> {
    Paragraph::new(message.into())
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_MUTED))
        .block(block)
}

pub(crate) fn is_focused(app: &App, focus: Focus) -> bool {
    app.focus == focus
}

/// Limit `text` to `max_len` characters, appending an ellipsis when truncated
pub(crate) fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let mut truncated: String = text.chars().take(max_len - 3).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use spanscope::RenderConfig;
    use spanscope_store::{load_seed_data, StoreConfig, TraceStore};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_with_ellipsis("checkout", 20), "checkout");
        assert_eq!(truncate_with_ellipsis("checkout", 6), "che...");
        assert_eq!(truncate_with_ellipsis("checkout", 2), "ch");
    }

    #[tokio::test]
    async fn renders_loaded_trace_with_detail() {
        let store = TraceStore::new(StoreConfig::default());
        load_seed_data(&store);
        let (mut app, mut outcomes) = App::new(store, RenderConfig::default());
        app.open_trace("deadbeef");
        let outcome = outcomes.recv().await.unwrap();
        app.on_fetch(outcome);
        app.session.dispatch(spanscope::NavEvent::SelectSpan("c4".into()));

        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Trace deadbeef"));
        assert!(text.contains("Total Duration: 2345.00 ms"));
        assert!(text.contains("POST /checkout › charge card › fraud check"));
        assert!(text.contains("Timing"));
    }

    #[tokio::test]
    async fn renders_placeholders_before_any_trace() {
        let store = TraceStore::new(StoreConfig::default());
        let (mut app, _outcomes) = App::new(store, RenderConfig::default());

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("No trace loaded"));
        assert!(text.contains("No trace selected"));
        assert!(text.contains("No traces found"));
    }
}
