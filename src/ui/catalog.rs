//! Product catalog view: filters on top, list on the left, detail on the right

use super::theme::Palette;
use super::widgets::render_scrollable_list;
use crate::api::Product;
use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let catalog = &app.state.catalog;
    let products = catalog.visible(&app.session.favourites);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    draw_filters(frame, chunks[0], app, palette);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let block = Block::default()
        .title(format!(" Catalog ({}) ", products.len()))
        .borders(Borders::ALL)
        .border_style(palette.border(true));

    if products.is_empty() {
        let message = if catalog.products.is_empty() {
            "No products yet.\nPress '3' to list one."
        } else {
            "Nothing matches these filters.\nPress 'x' to clear them."
        };
        frame.render_widget(
            Paragraph::new(message).style(palette.muted()).block(block),
            body[0],
        );
    } else {
        let items: Vec<ListItem> = products
            .iter()
            .enumerate()
            .map(|(idx, product)| {
                let is_selected = idx == catalog.selected_index;
                let star = if app.session.is_favourite(&product.id) {
                    "★ "
                } else {
                    "  "
                };
                let style = if is_selected {
                    Style::default().bg(palette.selection)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(if is_selected { "▸" } else { " " }, style),
                    Span::styled(star, Style::default().fg(palette.warning)),
                    Span::styled(product.name.as_str(), style),
                    Span::raw("  "),
                    Span::styled(format!("{:.2}", product.price), palette.accent()),
                ]))
            })
            .collect();
        render_scrollable_list(frame, body[0], List::new(items).block(block), catalog.selected_index);
    }

    draw_detail(frame, body[1], products.get(catalog.selected_index).copied(), palette);
}

fn draw_filters(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let catalog = &app.state.catalog;
    let search = if catalog.searching {
        format!("{}▌", catalog.search)
    } else if catalog.search.is_empty() {
        "-".to_string()
    } else {
        catalog.search.clone()
    };

    let mut spans = vec![
        Span::styled("Search: ", palette.muted()),
        Span::styled(search, palette.accent()),
        Span::styled("  Category: ", palette.muted()),
        Span::raw(catalog.category.as_deref().unwrap_or("All").to_string()),
        Span::styled("  Price: ", palette.muted()),
        Span::raw(catalog.price.label()),
        Span::styled("  Sort: ", palette.muted()),
        Span::raw(catalog.sort.label()),
    ];
    if catalog.favourites_only {
        spans.push(Span::styled("  ★ only", Style::default().fg(palette.warning)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(catalog.searching));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_detail(frame: &mut Frame, area: Rect, product: Option<&Product>, palette: &Palette) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(palette.muted());

    let Some(product) = product else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            product.name.as_str(),
            palette.title().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Price: ", palette.muted()),
            Span::raw(format!("{:.2}", product.price)),
        ]),
        Line::from(vec![
            Span::styled("Category: ", palette.muted()),
            Span::raw(product.category.as_str()),
        ]),
        Line::from(vec![
            Span::styled("In stock: ", palette.muted()),
            Span::raw(product.stock.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Returns: ", palette.muted()),
            Span::raw(if product.accepts_returns { "accepted" } else { "no" }),
        ]),
    ];
    if !product.tags.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Tags: ", palette.muted()),
            Span::raw(product.tags.join(", ")),
        ]));
    }
    if !product.description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(product.description.as_str()));
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}
