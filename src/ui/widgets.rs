//! Reusable UI widget helpers

use ratatui::{
    layout::Rect,
    widgets::{List, ListState, Table, TableState},
    Frame,
};

/// Render a list that keeps the selected item visible.
///
/// # Example
/// ```ignore
/// let list = List::new(items).block(block);
/// render_scrollable_list(frame, area, list, app.state.selected_index);
/// ```
pub fn render_scrollable_list(frame: &mut Frame, area: Rect, list: List, selected_index: usize) {
    let mut list_state = ListState::default().with_selected(Some(selected_index));
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Same as [`render_scrollable_list`] for tables
pub fn render_scrollable_table(frame: &mut Frame, area: Rect, table: Table, selected: Option<usize>) {
    let mut table_state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut table_state);
}
