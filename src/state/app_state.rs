//! Application state definitions

use super::catalog::CatalogState;
use super::dialog::ConfirmDialog;
use super::forms::{LoginForm, RegistrationForm, SellProductForm, SignupForm, Wizard};
use super::inventory::InventoryState;
use super::notification::Notifications;
use crate::api::{Draft, Registration, User};

/// Current view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Catalog,
    Inventory,
    SellProduct,
    Drafts,
    Registration,
    Registrations,
    Users,
    Login,
    Signup,
    /// Full-screen error shown when the API cannot be reached
    ServerDown,
}

impl View {
    /// Views whose state is a form being edited
    pub fn is_form_view(&self) -> bool {
        matches!(
            self,
            Self::SellProduct | Self::Registration | Self::Login | Self::Signup
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Catalog => "Catalog",
            Self::Inventory => "Inventory",
            Self::SellProduct => "Sell",
            Self::Drafts => "Drafts",
            Self::Registration => "Register",
            Self::Registrations => "Sellers",
            Self::Users => "Users",
            Self::Login => "Log in",
            Self::Signup => "Sign up",
            Self::ServerDown => "Offline",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Asc => "↑",
            Self::Desc => "↓",
        }
    }
}

/// Main application state
#[derive(Default)]
pub struct AppState {
    // Navigation
    pub current_view: View,
    pub view_history: Vec<View>,

    // Data
    pub catalog: CatalogState,
    pub inventory: InventoryState,
    pub drafts: Vec<Draft>,
    pub registrations: Vec<Registration>,
    pub users: Vec<User>,
    pub user_search: String,
    pub user_searching: bool,

    // Selection for the simple lists (drafts, registrations, users)
    pub selected_index: usize,

    // Forms
    pub sell: Option<Wizard<SellProductForm>>,
    /// Draft the sell wizard was resumed from
    pub active_draft: Option<String>,
    pub registration: Option<Wizard<RegistrationForm>>,
    pub login: Option<Wizard<LoginForm>>,
    pub signup: Option<Wizard<SignupForm>>,

    // Overlays
    pub confirm: Option<ConfirmDialog>,
    pub notifications: Notifications,
    /// Message of the last server-down failure
    pub server_down: Option<String>,
}

impl AppState {
    pub fn move_selection_down(&mut self, max: usize) {
        if max > 0 && self.selected_index < max - 1 {
            self.selected_index += 1;
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn reset_selection(&mut self) {
        self.selected_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_views() {
        assert!(View::SellProduct.is_form_view());
        assert!(View::Login.is_form_view());
        assert!(!View::Inventory.is_form_view());
        assert!(!View::ServerDown.is_form_view());
    }

    #[test]
    fn test_selection_bounds() {
        let mut state = AppState::default();
        state.move_selection_up();
        assert_eq!(state.selected_index, 0);
        state.move_selection_down(2);
        state.move_selection_down(2);
        assert_eq!(state.selected_index, 1);
        state.move_selection_down(0);
        assert_eq!(state.selected_index, 1);
    }

    #[test]
    fn test_sort_direction_toggle() {
        assert_eq!(SortDirection::Asc.toggle(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.symbol(), "↓");
    }
}
