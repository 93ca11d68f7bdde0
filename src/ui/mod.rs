//! UI module for rendering the TUI

mod catalog;
mod components;
mod forms;
mod inventory;
mod layout;
mod lists;
mod theme;
mod widgets;

use crate::app::App;
use crate::state::View;
use components::{render_confirm_dialog, render_error_dialog};
use ratatui::{style::Style, widgets::Block, Frame};
use theme::Palette;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.session.theme);
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    let (sidebar_area, main_area) = layout::create_layout(area);
    layout::draw_sidebar(frame, sidebar_area, app, &palette);

    match app.state.current_view {
        View::Catalog => catalog::draw(frame, main_area, app, &palette),
        View::Inventory => inventory::draw(frame, main_area, app, &palette),
        View::SellProduct => {
            if let Some(wizard) = &app.state.sell {
                forms::draw_wizard(frame, main_area, wizard, &palette);
            }
        }
        View::Registration => {
            if let Some(wizard) = &app.state.registration {
                forms::draw_wizard(frame, main_area, wizard, &palette);
            }
        }
        View::Login => {
            if let Some(form) = &app.state.login {
                forms::draw_wizard(frame, main_area, form, &palette);
            }
        }
        View::Signup => {
            if let Some(form) = &app.state.signup {
                forms::draw_wizard(frame, main_area, form, &palette);
            }
        }
        View::Drafts => lists::draw_drafts(frame, main_area, app, &palette),
        View::Registrations => lists::draw_registrations(frame, main_area, app, &palette),
        View::Users => lists::draw_users(frame, main_area, app, &palette),
        View::ServerDown => {
            let message = app
                .state
                .server_down
                .as_deref()
                .unwrap_or("Server is unreachable. Please try again later.");
            render_error_dialog(
                frame,
                "Server unavailable",
                message,
                &[("r", "retry"), ("Esc", "back"), ("^C", "quit")],
                &palette,
            );
        }
    }

    if let Some(dialog) = &app.state.confirm {
        render_confirm_dialog(frame, dialog, &palette);
    }

    layout::draw_status_bar(frame, app, &palette);
}
