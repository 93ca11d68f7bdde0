//! Base dialog component

use crate::ui::theme::Palette;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Configuration for rendering a dialog
pub struct DialogConfig<'a> {
    /// Dialog title
    pub title: &'a str,
    /// Title and border color
    pub color: Color,
    /// Message content (can be multi-line with \n)
    pub message: &'a str,
    /// Lines rendered between the message and the hint (buttons)
    pub extra: Vec<Line<'a>>,
    /// Hint text shown at the bottom (e.g., "Press Enter to dismiss")
    pub hint: Option<Vec<Span<'a>>>,
    /// Maximum width of the dialog
    pub max_width: u16,
}

/// Render a centered dialog overlay
pub fn render_dialog(frame: &mut Frame, config: DialogConfig, palette: &Palette) {
    let area = frame.area();
    let padding = 4u16; // 2 chars padding on each side
    let max_line_width = config.max_width.saturating_sub(padding) as usize;

    let wrapped_lines = wrap_text(config.message, max_line_width);

    let content_width = wrapped_lines
        .iter()
        .map(|l| l.chars().count())
        .chain(config.extra.iter().map(Line::width))
        .chain(config.hint.iter().map(|h| h.iter().map(Span::width).sum::<usize>()))
        .max()
        .unwrap_or(0)
        .max(config.title.chars().count()) as u16;
    let dialog_width = (content_width + padding + 2).min(config.max_width); // +2 for borders

    // Height: title + blank + message + blank + extra + blank + hint + borders
    let extra_lines = if config.extra.is_empty() {
        0
    } else {
        config.extra.len() as u16 + 1
    };
    let hint_lines = if config.hint.is_some() { 2 } else { 0 };
    let dialog_height = (2 + wrapped_lines.len() as u16 + extra_lines + hint_lines + 2).max(5);

    let dialog_area = Rect {
        x: area.x + (area.width.saturating_sub(dialog_width)) / 2,
        y: area.y + (area.height.saturating_sub(dialog_height)) / 2,
        width: dialog_width.min(area.width),
        height: dialog_height.min(area.height),
    };

    // Clear the area behind the dialog
    frame.render_widget(Clear, dialog_area);

    let mut content = vec![
        Line::from(Span::styled(
            config.title,
            Style::default()
                .fg(config.color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    content.extend(wrapped_lines.into_iter().map(Line::from));

    if !config.extra.is_empty() {
        content.push(Line::from(""));
        content.extend(config.extra);
    }

    if let Some(hint_spans) = config.hint {
        content.push(Line::from(""));
        content.push(Line::from(hint_spans));
    }

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(config.color))
                .style(Style::default().bg(palette.background)),
        )
        .style(Style::default().bg(palette.background).fg(palette.text));

    frame.render_widget(dialog, dialog_area);
}

/// Key/label pairs rendered as a hint line
pub fn key_hints<'a>(pairs: &[(&'a str, &'a str)], palette: &Palette) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    for (i, (key, label)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            *key,
            palette.accent().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {label}"), palette.muted()));
    }
    spans
}

/// Wrap text to fit within a maximum width
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.len() + word.len() + 1 > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = String::new();
            }
            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
