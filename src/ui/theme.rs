//! Colors for the light and dark themes

use crate::session::Theme;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub background: Color,
    pub selection: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: Color::Cyan,
                text: Color::White,
                muted: Color::DarkGray,
                background: Color::Black,
                selection: Color::DarkGray,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
            },
            Theme::Light => Self {
                accent: Color::Blue,
                text: Color::Black,
                muted: Color::Gray,
                background: Color::White,
                selection: Color::Gray,
                success: Color::Green,
                warning: Color::Magenta,
                error: Color::Red,
            },
        }
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Border color for a panel with or without focus
    pub fn border(&self, focused: bool) -> Style {
        if focused {
            self.accent()
        } else {
            self.muted()
        }
    }
}
