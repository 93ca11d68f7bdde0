//! Confirmation dialog for inventory status changes and deletes

use super::base::{key_hints, render_dialog, DialogConfig};
use crate::state::ConfirmDialog;
use crate::ui::theme::Palette;
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    Frame,
};

/// Render the confirmation dialog with Cancel and confirm options
pub fn render_confirm_dialog(frame: &mut Frame, dialog: &ConfirmDialog, palette: &Palette) {
    let target = dialog.request.target();
    let color = if target.is_destructive() {
        palette.error
    } else {
        palette.warning
    };
    let message = dialog.request.message();
    let confirm_label = capitalize(&target.verb());

    let options = [(false, "Cancel", palette.text), (true, confirm_label.as_str(), color)];
    let buttons: Vec<Line> = options
        .iter()
        .map(|&(is_confirm, label, base_color)| {
            let is_selected = dialog.confirm_selected == is_confirm;
            let prefix = if is_selected { "▸ " } else { "  " };
            let style = if is_selected {
                Style::default().fg(base_color).add_modifier(Modifier::BOLD)
            } else {
                palette.muted()
            };
            Line::from(Span::styled(format!("{prefix}{label}"), style))
        })
        .collect();

    render_dialog(
        frame,
        DialogConfig {
            title: dialog.request.title(),
            color,
            message: &message,
            extra: buttons,
            hint: Some(key_hints(
                &[("↑↓", "select"), ("Enter", "choose"), ("y", "yes"), ("Esc", "cancel")],
                palette,
            )),
            max_width: 60,
        },
        palette,
    );
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
