//! Seller inventory table with paging and multi-select

use super::theme::Palette;
use super::widgets::render_scrollable_table;
use crate::api::ProductStatus;
use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let inventory = &app.state.inventory;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    // Header with filter, sort and selection info
    let search = if inventory.searching {
        format!("{}▌", inventory.search)
    } else {
        inventory.search.clone()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "Sort: {} {}",
                inventory.sort.label(),
                inventory.direction.symbol()
            ),
            palette.accent(),
        ),
        Span::styled(" [s]cycle [S]dir", palette.muted()),
        Span::raw(" | "),
        Span::raw(format!("Status: {}", inventory.status_filter_label())),
        Span::styled(" [f]", palette.muted()),
        Span::raw(" | "),
        Span::raw(format!("Search: {search}")),
        Span::raw(" | "),
        Span::styled(
            format!("{} selected", inventory.selected.len()),
            Style::default().fg(palette.warning),
        ),
    ]));
    frame.render_widget(header, chunks[0]);

    let block = Block::default()
        .title(format!(
            " Inventory - page {}/{} ",
            inventory.page() + 1,
            inventory.page_count()
        ))
        .borders(Borders::ALL)
        .border_style(palette.border(true));

    let rows_on_page = inventory.page_rows();
    if rows_on_page.is_empty() {
        let message = if inventory.products.is_empty() {
            "No products found.\nPress '3' to list your first product."
        } else {
            "No products match the current filters."
        };
        frame.render_widget(
            Paragraph::new(message).style(palette.muted()).block(block),
            chunks[1],
        );
        return;
    }

    let page_start = inventory.page() * inventory.page_size;
    let rows: Vec<Row> = rows_on_page
        .iter()
        .map(|(idx, product)| {
            let mark = if inventory.is_selected(&product.id) {
                "[x]"
            } else {
                "[ ]"
            };
            let status_color = match product.status {
                ProductStatus::Active => palette.success,
                ProductStatus::Inactive => palette.muted,
                ProductStatus::Draft => palette.warning,
            };
            let style = if *idx == inventory.cursor {
                Style::default().bg(palette.selection)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(mark),
                Cell::from(product.name.as_str()),
                Cell::from(product.sku.as_str()),
                Cell::from(format!("{:.2}", product.price)),
                Cell::from(product.stock.to_string()),
                Cell::from(Span::styled(
                    product.status.label(),
                    Style::default().fg(status_color),
                )),
                Cell::from(product.updated_at.format("%Y-%m-%d").to_string()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(["", "Name", "SKU", "Price", "Stock", "Status", "Updated"])
            .style(palette.muted().add_modifier(Modifier::BOLD)),
    )
    .block(block);

    render_scrollable_table(
        frame,
        chunks[1],
        table,
        Some(inventory.cursor.saturating_sub(page_start)),
    );
}
