//! Error dialog component

use super::base::{key_hints, render_dialog, DialogConfig};
use crate::ui::theme::Palette;
use ratatui::Frame;

/// Render an error dialog overlay centered on the screen
pub fn render_error_dialog(
    frame: &mut Frame,
    title: &str,
    error_message: &str,
    hints: &[(&str, &str)],
    palette: &Palette,
) {
    render_dialog(
        frame,
        DialogConfig {
            title,
            color: palette.error,
            message: error_message,
            extra: Vec::new(),
            hint: Some(key_hints(hints, palette)),
            max_width: 60,
        },
        palette,
    );
}
