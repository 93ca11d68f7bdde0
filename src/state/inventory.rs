//! Inventory table: search, status filter, sort, paging and multi-select

use super::SortDirection;
use crate::api::{Product, ProductStatus};
use std::collections::BTreeSet;

/// Sort field for the inventory table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventorySort {
    Name,
    Price,
    Stock,
    #[default]
    Updated,
}

impl InventorySort {
    pub fn next(&self) -> Self {
        match self {
            Self::Name => Self::Price,
            Self::Price => Self::Stock,
            Self::Stock => Self::Updated,
            Self::Updated => Self::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Price => "Price",
            Self::Stock => "Stock",
            Self::Updated => "Updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InventoryState {
    pub products: Vec<Product>,
    pub search: String,
    pub searching: bool,
    /// `None` shows every status
    pub status_filter: Option<ProductStatus>,
    pub sort: InventorySort,
    pub direction: SortDirection,
    pub selected: BTreeSet<String>,
    /// Row under the cursor, relative to the whole filtered list
    pub cursor: usize,
    pub page_size: usize,
}

impl Default for InventoryState {
    fn default() -> Self {
        Self::new(20)
    }
}

impl InventoryState {
    pub fn new(page_size: usize) -> Self {
        Self {
            products: Vec::new(),
            search: String::new(),
            searching: false,
            status_filter: None,
            sort: InventorySort::default(),
            direction: SortDirection::Desc,
            selected: BTreeSet::new(),
            cursor: 0,
            page_size: page_size.max(1),
        }
    }

    /// Replace the rows, dropping selections that no longer exist
    pub fn set_products(&mut self, products: Vec<Product>) {
        self.products = products;
        let ids: BTreeSet<&str> = self.products.iter().map(|p| p.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.clamp_cursor();
    }

    /// Rows passing search and status filter, in sort order
    pub fn visible(&self) -> Vec<&Product> {
        let needle = self.search.trim().to_lowercase();
        let mut rows: Vec<_> = self
            .products
            .iter()
            .filter(|p| self.status_filter.map_or(true, |s| p.status == s))
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.sku.to_lowercase().contains(&needle)
            })
            .collect();

        rows.sort_by(|a, b| {
            let cmp = match self.sort {
                InventorySort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                InventorySort::Price => a.price.total_cmp(&b.price),
                InventorySort::Stock => a.stock.cmp(&b.stock),
                InventorySort::Updated => a.updated_at.cmp(&b.updated_at),
            };
            match self.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            }
        });
        rows
    }

    pub fn page(&self) -> usize {
        self.cursor / self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.visible().len().div_ceil(self.page_size).max(1)
    }

    /// Rows on the cursor's page with their absolute indices
    pub fn page_rows(&self) -> Vec<(usize, &Product)> {
        let start = self.page() * self.page_size;
        self.visible()
            .into_iter()
            .enumerate()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn current(&self) -> Option<&Product> {
        self.visible().get(self.cursor).copied()
    }

    pub fn move_down(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn next_page(&mut self) {
        let len = self.visible().len();
        let target = (self.page() + 1) * self.page_size;
        if target < len {
            self.cursor = target;
        }
    }

    pub fn prev_page(&mut self) {
        self.cursor = self.page().saturating_sub(1) * self.page_size;
    }

    /// Toggle the row under the cursor
    pub fn toggle_current(&mut self) {
        if let Some(id) = self.current().map(|p| p.id.clone()) {
            if !self.selected.remove(&id) {
                self.selected.insert(id);
            }
        }
    }

    /// Select every visible row, or clear when all are already selected
    pub fn toggle_all_visible(&mut self) {
        let ids: Vec<String> = self.visible().iter().map(|p| p.id.clone()).collect();
        if !ids.is_empty() && ids.iter().all(|id| self.selected.contains(id)) {
            self.selected.clear();
        } else {
            self.selected.extend(ids);
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn cycle_status_filter(&mut self) {
        self.status_filter = match self.status_filter {
            None => Some(ProductStatus::Active),
            Some(ProductStatus::Active) => Some(ProductStatus::Inactive),
            Some(ProductStatus::Inactive) => Some(ProductStatus::Draft),
            Some(ProductStatus::Draft) => None,
        };
        self.cursor = 0;
    }

    pub fn status_filter_label(&self) -> &'static str {
        self.status_filter.map_or("All", |s| s.label())
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.cursor = 0;
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggle();
        self.cursor = 0;
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
        self.cursor = 0;
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
        self.cursor = 0;
    }

    /// Apply a confirmed status change locally
    pub fn apply_status(&mut self, ids: &[String], status: ProductStatus) {
        for product in self.products.iter_mut().filter(|p| ids.contains(&p.id)) {
            product.status = status;
        }
        self.clamp_cursor();
    }

    /// Drop deleted rows
    pub fn remove(&mut self, ids: &[String]) {
        self.products.retain(|p| !ids.contains(&p.id));
        for id in ids {
            self.selected.remove(id);
        }
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }
}
