//! Product catalog browsing: filters, sort and favourites

use crate::api::{Category, Product};
use std::collections::BTreeSet;

/// Sort order for the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl CatalogSort {
    pub fn next(&self) -> Self {
        match self {
            Self::Newest => Self::PriceAsc,
            Self::PriceAsc => Self::PriceDesc,
            Self::PriceDesc => Self::Name,
            Self::Name => Self::Newest,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price ↑",
            Self::PriceDesc => "Price ↓",
            Self::Name => "Name",
        }
    }
}

/// Inclusive price bounds; `None` leaves a side open
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    /// Presets cycled from the keyboard
    pub const PRESETS: [PriceRange; 5] = [
        PriceRange { min: None, max: None },
        PriceRange { min: None, max: Some(25.0) },
        PriceRange { min: Some(25.0), max: Some(100.0) },
        PriceRange { min: Some(100.0), max: Some(500.0) },
        PriceRange { min: Some(500.0), max: None },
    ];

    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }

    pub fn label(&self) -> String {
        match (self.min, self.max) {
            (None, None) => "Any price".to_string(),
            (None, Some(max)) => format!("Under {max:.0}"),
            (Some(min), None) => format!("Over {min:.0}"),
            (Some(min), Some(max)) => format!("{min:.0}–{max:.0}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    /// Category name, `None` for all
    pub category: Option<String>,
    pub price: PriceRange,
    price_preset: usize,
    pub search: String,
    pub searching: bool,
    pub sort: CatalogSort,
    pub favourites_only: bool,
    pub selected_index: usize,
}

impl CatalogState {
    /// Products passing every filter, in sort order
    pub fn visible(&self, favourites: &BTreeSet<String>) -> Vec<&Product> {
        let needle = self.search.trim().to_lowercase();
        let mut products: Vec<_> = self
            .products
            .iter()
            .filter(|p| self.category.as_ref().map_or(true, |c| &p.category == c))
            .filter(|p| self.price.contains(p.price))
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .filter(|p| !self.favourites_only || favourites.contains(&p.id))
            .collect();

        products.sort_by(|a, b| match self.sort {
            CatalogSort::Newest => b.created_at.cmp(&a.created_at),
            CatalogSort::PriceAsc => a.price.total_cmp(&b.price),
            CatalogSort::PriceDesc => b.price.total_cmp(&a.price),
            CatalogSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });
        products
    }

    pub fn selected<'a>(&'a self, favourites: &BTreeSet<String>) -> Option<&'a Product> {
        self.visible(favourites).get(self.selected_index).copied()
    }

    pub fn cycle_category(&mut self) {
        let names: Vec<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        self.category = match &self.category {
            None => names.first().map(|n| n.to_string()),
            Some(current) => names
                .iter()
                .position(|n| n == current)
                .and_then(|i| names.get(i + 1))
                .map(|n| n.to_string()),
        };
        self.selected_index = 0;
    }

    pub fn cycle_price(&mut self) {
        self.price_preset = (self.price_preset + 1) % PriceRange::PRESETS.len();
        self.price = PriceRange::PRESETS[self.price_preset];
        self.selected_index = 0;
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.selected_index = 0;
    }

    pub fn toggle_favourites_only(&mut self) {
        self.favourites_only = !self.favourites_only;
        self.selected_index = 0;
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
        self.selected_index = 0;
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
        self.selected_index = 0;
    }

    pub fn move_down(&mut self, visible: usize) {
        if visible > 0 && self.selected_index + 1 < visible {
            self.selected_index += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Clear every filter
    pub fn clear_filters(&mut self) {
        self.category = None;
        self.price = PriceRange::default();
        self.price_preset = 0;
        self.search.clear();
        self.favourites_only = false;
        self.selected_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProductStatus;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn product(id: &str, name: &str, category: &str, price: f64, day: u32) -> Product {
        let at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} for the home"),
            sku: format!("SKU-{id}"),
            category: category.to_string(),
            price,
            stock: 1,
            status: ProductStatus::Active,
            image_url: None,
            tags: Vec::new(),
            accepts_returns: false,
            warehouses: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    fn catalog() -> CatalogState {
        CatalogState {
            products: vec![
                product("1", "Desk Lamp", "Lighting", 40.0, 1),
                product("2", "Floor Lamp", "Lighting", 120.0, 3),
                product("3", "Oak Chair", "Furniture", 15.0, 2),
            ],
            categories: vec![
                Category {
                    id: "c1".into(),
                    name: "Lighting".into(),
                },
                Category {
                    id: "c2".into(),
                    name: "Furniture".into(),
                },
            ],
            ..Default::default()
        }
    }

    fn ids(products: Vec<&Product>) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let catalog = catalog();
        assert_eq!(ids(catalog.visible(&BTreeSet::new())), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_description() {
        let mut catalog = catalog();
        catalog.search = "LAMP".into();
        assert_eq!(ids(catalog.visible(&BTreeSet::new())).len(), 2);
        catalog.search = "for the home".into();
        assert_eq!(ids(catalog.visible(&BTreeSet::new())).len(), 3);
    }

    #[test]
    fn test_category_cycle_wraps_to_all() {
        let mut catalog = catalog();
        catalog.cycle_category();
        assert_eq!(catalog.category.as_deref(), Some("Lighting"));
        catalog.cycle_category();
        assert_eq!(catalog.category.as_deref(), Some("Furniture"));
        assert_eq!(ids(catalog.visible(&BTreeSet::new())), vec!["3"]);
        catalog.cycle_category();
        assert_eq!(catalog.category, None);
    }

    #[test]
    fn test_price_range_and_sort() {
        let mut catalog = catalog();
        catalog.price = PriceRange {
            min: Some(20.0),
            max: Some(200.0),
        };
        catalog.sort = CatalogSort::PriceAsc;
        assert_eq!(ids(catalog.visible(&BTreeSet::new())), vec!["1", "2"]);
        catalog.sort = CatalogSort::PriceDesc;
        assert_eq!(ids(catalog.visible(&BTreeSet::new())), vec!["2", "1"]);
    }

    #[test]
    fn test_favourites_only() {
        let mut catalog = catalog();
        let favourites: BTreeSet<String> = ["3".to_string()].into();
        catalog.toggle_favourites_only();
        assert_eq!(ids(catalog.visible(&favourites)), vec!["3"]);
        assert_eq!(catalog.selected(&favourites).map(|p| p.id.as_str()), Some("3"));
    }

    #[test]
    fn test_price_presets_cycle() {
        let mut catalog = catalog();
        catalog.cycle_price();
        assert_eq!(catalog.price.label(), "Under 25");
        for _ in 0..PriceRange::PRESETS.len() - 1 {
            catalog.cycle_price();
        }
        assert_eq!(catalog.price, PriceRange::default());
    }
}
