use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span as TextSpan};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use spanscope::SpanDetail;

use super::{panel_block, TEXT_ACCENT, TEXT_MUTED, TEXT_PRIMARY};

/// Section-by-section detail of the selected span
pub(super) fn render(frame: &mut Frame<'_>, detail: &SpanDetail, area: Rect) {
    let block = panel_block(format!("{} [esc]", detail.title), false);

    let mut lines = Vec::new();
    for section in detail.sections() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::styled(
            section.title,
            Style::default().fg(TEXT_ACCENT).add_modifier(Modifier::BOLD),
        ));
        if section.fields.is_empty() {
            lines.push(Line::styled("  none", Style::default().fg(TEXT_MUTED)));
        }
        for field in &section.fields {
            lines.push(Line::from(vec![
                TextSpan::styled(format!("  {}: ", field.label), Style::default().fg(TEXT_MUTED)),
                TextSpan::styled(field.value.clone(), Style::default().fg(TEXT_PRIMARY)),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
