//! Button component for TUI

use crate::ui::theme::Palette;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Button height in rows (top border + content + bottom border)
pub const BUTTON_HEIGHT: u16 = 3;

/// Render a generic button with border
pub fn render_button(
    frame: &mut Frame,
    area: Rect,
    content: &str,
    is_selected: bool,
    palette: &Palette,
) {
    let text_style = if is_selected {
        palette.accent().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text)
    };

    let paragraph = Paragraph::new(format!(" {content} ")).style(text_style);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(is_selected));

    frame.render_widget(paragraph.block(block), area);
}

/// Render a sidebar button with key and label
pub fn render_sidebar_button(
    frame: &mut Frame,
    area: Rect,
    key: &str,
    label: &str,
    is_selected: bool,
    palette: &Palette,
) {
    let content = format!("{key} {label}");
    render_button(frame, area, &content, is_selected, palette);
}
