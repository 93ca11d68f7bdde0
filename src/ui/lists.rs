//! Simple list views: drafts, seller registrations, users

use super::theme::Palette;
use super::widgets::render_scrollable_list;
use crate::api::PaymentDetails;
use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

fn list_block<'a>(title: String, palette: &Palette) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(palette.border(true))
}

fn row_style(is_selected: bool, palette: &Palette) -> Style {
    if is_selected {
        Style::default().bg(palette.selection)
    } else {
        Style::default()
    }
}

pub fn draw_drafts(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let drafts = &app.state.drafts;
    let block = list_block(format!(" Drafts ({}) ", drafts.len()), palette);

    if drafts.is_empty() {
        frame.render_widget(
            Paragraph::new("No drafts.\nPress Ctrl+W in the sell form to save one.")
                .style(palette.muted())
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = drafts
        .iter()
        .enumerate()
        .map(|(idx, draft)| {
            let is_selected = idx == app.state.selected_index;
            let name = draft
                .data
                .get("name")
                .and_then(|v| v.as_str())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("(untitled)");
            let active = app.state.active_draft.as_deref() == Some(draft.id.as_str());
            ListItem::new(Line::from(vec![
                Span::styled(if is_selected { "▸ " } else { "  " }, row_style(is_selected, palette)),
                Span::styled(name.to_string(), row_style(is_selected, palette)),
                Span::raw("  "),
                Span::styled(
                    draft.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    palette.muted(),
                ),
                Span::styled(if active { "  (open)" } else { "" }, palette.accent()),
            ]))
        })
        .collect();

    render_scrollable_list(frame, area, List::new(items).block(block), app.state.selected_index);
}

pub fn draw_registrations(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let registrations = &app.state.registrations;
    let block = list_block(format!(" Seller registrations ({}) ", registrations.len()), palette);

    if registrations.is_empty() {
        frame.render_widget(
            Paragraph::new("No registrations.\nPress 'n' to register a seller.")
                .style(palette.muted())
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = registrations
        .iter()
        .enumerate()
        .map(|(idx, registration)| {
            let is_selected = idx == app.state.selected_index;
            let details = &registration.details;
            let payout = match &details.payment {
                PaymentDetails::Bank { .. } => "bank",
                PaymentDetails::Upi { .. } => "upi",
            };
            let status = if registration.status.is_empty() {
                "pending"
            } else {
                registration.status.as_str()
            };
            ListItem::new(Line::from(vec![
                Span::styled(if is_selected { "▸ " } else { "  " }, row_style(is_selected, palette)),
                Span::styled(details.full_name.as_str(), row_style(is_selected, palette)),
                Span::styled(format!("  <{}>", details.email), palette.muted()),
                Span::raw(format!(
                    "  {} business(es), payout: {payout}",
                    details.businesses.len()
                )),
                Span::styled(format!("  [{status}]"), palette.accent()),
            ]))
        })
        .collect();

    render_scrollable_list(frame, area, List::new(items).block(block), app.state.selected_index);
}

pub fn draw_users(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let search = if app.state.user_searching {
        format!("{}▌", app.state.user_search)
    } else {
        app.state.user_search.clone()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Search: ", palette.muted()),
            Span::styled(search, palette.accent()),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(palette.border(app.state.user_searching)),
        ),
        chunks[0],
    );

    let users = &app.state.users;
    let block = list_block(format!(" Users ({}) ", users.len()), palette);
    if users.is_empty() {
        frame.render_widget(
            Paragraph::new("No users found.").style(palette.muted()).block(block),
            chunks[1],
        );
        return;
    }

    let items: Vec<ListItem> = users
        .iter()
        .enumerate()
        .map(|(idx, user)| {
            let is_selected = idx == app.state.selected_index;
            ListItem::new(Line::from(vec![
                Span::styled(if is_selected { "▸ " } else { "  " }, row_style(is_selected, palette)),
                Span::styled(user.name.as_str(), row_style(is_selected, palette)),
                Span::styled(format!("  <{}>", user.email), palette.muted()),
                Span::raw(format!("  {}", user.phone)),
                Span::styled(format!("  {}", user.role), palette.accent()),
            ]))
        })
        .collect();

    render_scrollable_list(frame, chunks[1], List::new(items).block(block), app.state.selected_index);
}
