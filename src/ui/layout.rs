//! Layout components (sidebar, status bar)

use super::components::{render_sidebar_button, BUTTON_HEIGHT};
use super::theme::Palette;
use crate::app::App;
use crate::state::{NotificationKind, View};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Sidebar entries with their number keys
const SIDEBAR_ITEMS: [(&str, View); 7] = [
    ("1", View::Catalog),
    ("2", View::Inventory),
    ("3", View::SellProduct),
    ("4", View::Drafts),
    ("5", View::Registration),
    ("6", View::Registrations),
    ("7", View::Users),
];

/// Create the main layout with sidebar
pub fn create_layout(area: Rect) -> (Rect, Rect) {
    // Reserve bottom line for status bar
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(20), // Sidebar
            Constraint::Min(0),     // Main content
        ])
        .split(rows[0]);

    (chunks[0], chunks[1])
}

/// Draw the sidebar with boxed buttons
pub fn draw_sidebar(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let mut constraints = vec![Constraint::Min(0)];
    constraints.extend([Constraint::Length(BUTTON_HEIGHT); SIDEBAR_ITEMS.len()]);
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let current = app.state.current_view;
    for (idx, (key, view)) in SIDEBAR_ITEMS.iter().enumerate() {
        render_sidebar_button(
            frame,
            chunks[idx + 1],
            key,
            view.title(),
            current == *view,
            palette,
        );
    }
}

/// Draw the status bar: notification or key hints, then session info
pub fn draw_status_bar(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = frame.area();
    let status_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", app.state.current_view.title()),
        palette.title(),
    )];

    match app.state.notifications.current() {
        Some(notification) => {
            let color = match notification.kind {
                NotificationKind::Success => palette.success,
                NotificationKind::Info => palette.accent,
                NotificationKind::Error => palette.error,
            };
            spans.push(Span::styled(
                notification.message.as_str(),
                Style::default().fg(color),
            ));
        }
        None => spans.push(Span::styled(view_hints(app), palette.muted())),
    }

    let user = match &app.session.user {
        Some(user) => format!(" {} ", user.name),
        None => " guest ".to_string(),
    };
    let right = format!("{user}| {} | ^C:quit ", app.session.theme.label());

    let status = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(palette.selection).fg(palette.text));
    frame.render_widget(status, status_area);

    let width = right.chars().count() as u16;
    let right_area = Rect {
        x: area.width.saturating_sub(width),
        y: status_area.y,
        width: width.min(area.width),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(right).style(Style::default().bg(palette.selection).fg(palette.text)),
        right_area,
    );
}

/// Keyboard hints for the current view
fn view_hints(app: &App) -> String {
    let state = &app.state;
    match state.current_view {
        View::Catalog if state.catalog.searching => "type to search  Enter/Esc:done".to_string(),
        View::Catalog => {
            "j/k:nav  /:search  c:category  p:price  s:sort  f:fav  F:favs only  x:clear"
                .to_string()
        }
        View::Inventory if state.inventory.searching => {
            "type to search  Enter/Esc:done".to_string()
        }
        View::Inventory => {
            "j/k:nav  n/b:page  space:select  a:all  A/I/D:status  x:delete  e:edit  E:export"
                .to_string()
        }
        View::SellProduct => {
            "Tab:next  PgDn/PgUp:step  ^A:add row  ^S:save row  ^W:draft  Esc:back".to_string()
        }
        View::Registration => {
            "Tab:next  PgDn/PgUp:step  ^A:add  ^N:add product  ^D:remove  Esc:back".to_string()
        }
        View::Drafts => "j/k:nav  Enter:resume  x:delete  r:reload".to_string(),
        View::Registrations => "j/k:nav  Enter:edit  n:new  x:delete  r:reload".to_string(),
        View::Users if state.user_searching => "type to search  Enter:apply  Esc:done".to_string(),
        View::Users => "j/k:nav  /:search  r:reload".to_string(),
        View::Login => "Tab:next  Enter:log in  ^U:sign up  Esc:back".to_string(),
        View::Signup => "Tab:next  Enter:sign up  Esc:back".to_string(),
        View::ServerDown => "r:retry  Esc:back".to_string(),
    }
}
