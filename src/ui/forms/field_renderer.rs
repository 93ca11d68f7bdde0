//! Field rendering utilities for forms

use crate::ui::theme::Palette;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Everything needed to draw one input box
pub struct FieldView<'a> {
    pub label: String,
    pub value: String,
    pub error: Option<&'a str>,
    pub is_active: bool,
    pub is_multiline: bool,
    /// Inside a saved row; read-only until reopened
    pub is_locked: bool,
}

impl FieldView<'_> {
    /// Rows the field needs: box plus an error line
    pub fn height(&self) -> u16 {
        let content = if self.is_multiline { 5 } else { 3 };
        content + u16::from(self.error.is_some())
    }
}

/// Draw a form field with its error line underneath
pub fn draw_field(frame: &mut Frame, area: Rect, field: &FieldView, palette: &Palette) {
    let border_style = if field.error.is_some() {
        Style::default().fg(palette.error)
    } else {
        palette.border(field.is_active)
    };
    let style = if field.is_locked {
        palette.muted()
    } else if field.is_active {
        palette.accent()
    } else {
        Style::default().fg(palette.text)
    };

    let display_str = if field.value.is_empty() && !field.is_active {
        "(empty)"
    } else {
        field.value.as_str()
    };

    let cursor = if field.is_active && !field.is_locked { "▌" } else { "" };
    let cursor_span = Span::styled(cursor, palette.accent());

    let content = if field.is_multiline {
        let mut lines: Vec<Line> = display_str
            .split('\n')
            .map(|l| Line::from(Span::styled(l.to_string(), style)))
            .collect();
        if let Some(last) = lines.last_mut() {
            last.spans.push(cursor_span);
        }
        Paragraph::new(lines)
    } else {
        Paragraph::new(Line::from(vec![
            Span::styled(display_str.to_string(), style),
            cursor_span,
        ]))
    };

    let title = if field.is_locked {
        format!(" {} 🔒 ", field.label)
    } else {
        format!(" {} ", field.label)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let box_height = area.height.saturating_sub(u16::from(field.error.is_some()));
    frame.render_widget(
        content.wrap(Wrap { trim: false }).block(block),
        Rect {
            height: box_height,
            ..area
        },
    );

    if let Some(error) = field.error {
        let error_area = Rect {
            y: area.y + box_height,
            height: 1,
            ..area
        };
        frame.render_widget(
            Paragraph::new(format!("  {error}")).style(Style::default().fg(palette.error)),
            error_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(error: Option<&str>, is_multiline: bool) -> FieldView<'_> {
        FieldView {
            label: "Name".into(),
            value: String::new(),
            error,
            is_active: false,
            is_multiline,
            is_locked: false,
        }
    }

    #[test]
    fn test_height_accounts_for_error_line() {
        assert_eq!(view(None, false).height(), 3);
        assert_eq!(view(Some("Name is required"), false).height(), 4);
        assert_eq!(view(None, true).height(), 5);
    }
}
