//! Application state and core logic

use crate::api::{
    ApiError, AuthUser, Product, ProductStatus, RestClient, StorefrontService, UserQuery,
};
use crate::config::AppConfig;
use crate::export;
use crate::session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
use crate::state::{
    login_form, registration_wizard, sell_product_wizard, signup_form, AppState, ConfirmDialog,
    ConfirmDialogState, ConfirmTarget, FieldPath, Focus, FormError, InventoryState,
    Notifications, RegistrationForm, RowError, SellProductForm, SubmitError, SubmitMode,
    SubmitOutcome, View, Wizard,
};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Instant;

/// What a key press inside a form asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormAction {
    None,
    Submit,
    SaveDraft,
    Cancel,
}

/// Main application struct
pub struct App {
    /// Current application state
    pub state: AppState,
    /// Storefront REST API
    pub service: Box<dyn StorefrontService>,
    /// Signed-in user, theme and favourites
    pub session: Session,
    store: Box<dyn SessionStore>,
    pub config: AppConfig,
    /// Whether the app should quit
    quit: bool,
}

impl App {
    /// Create the app against the configured API and load the catalog
    pub async fn new(config: AppConfig) -> Result<Self> {
        let client = RestClient::new(&config.api_base_url);
        tracing::info!(api = %client.base_url(), "using storefront API");
        let service = Box::new(client);
        let store: Box<dyn SessionStore> = match FileSessionStore::default_location() {
            Some(store) => Box::new(store),
            None => {
                tracing::warn!("no data directory available, session will not persist");
                Box::new(MemorySessionStore::new())
            }
        };
        let mut app = Self::with_parts(config, service, store);
        app.refresh_catalog().await;
        Ok(app)
    }

    pub fn with_parts(
        config: AppConfig,
        service: Box<dyn StorefrontService>,
        store: Box<dyn SessionStore>,
    ) -> Self {
        let session = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load session, starting fresh");
            Session::with_theme(config.default_theme)
        });
        let state = AppState {
            inventory: InventoryState::new(config.inventory_page_size),
            ..AppState::default()
        };
        Self {
            state,
            service,
            session,
            store,
            config,
            quit: false,
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Per-frame housekeeping
    pub fn tick(&mut self) {
        self.state.notifications.expire(Instant::now());
    }

    /// Handle a key event
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Confirm dialog is modal
        if self.state.confirm.is_some() {
            self.handle_confirm_key(key).await;
            return Ok(());
        }

        if !self.state.current_view.is_form_view()
            && !self.is_typing()
            && self.handle_global_key(key).await
        {
            return Ok(());
        }

        match self.state.current_view {
            View::Catalog => self.handle_catalog_key(key).await,
            View::Inventory => self.handle_inventory_key(key).await,
            View::SellProduct => self.handle_sell_key(key).await,
            View::Drafts => self.handle_drafts_key(key).await,
            View::Registration => self.handle_registration_key(key).await,
            View::Registrations => self.handle_registrations_key(key).await,
            View::Users => self.handle_users_key(key).await,
            View::Login => self.handle_login_key(key).await,
            View::Signup => self.handle_signup_key(key).await,
            View::ServerDown => self.handle_server_down_key(key).await,
        }
        Ok(())
    }

    fn is_typing(&self) -> bool {
        match self.state.current_view {
            View::Catalog => self.state.catalog.searching,
            View::Inventory => self.state.inventory.searching,
            View::Users => self.state.user_searching,
            _ => false,
        }
    }

    /// Navigation and session keys available outside forms
    async fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('1') => self.open_view(View::Catalog).await,
            KeyCode::Char('2') => self.open_view(View::Inventory).await,
            KeyCode::Char('3') => self.open_view(View::SellProduct).await,
            KeyCode::Char('4') => self.open_view(View::Drafts).await,
            KeyCode::Char('5') => self.open_view(View::Registration).await,
            KeyCode::Char('6') => self.open_view(View::Registrations).await,
            KeyCode::Char('7') => self.open_view(View::Users).await,
            KeyCode::Char('L') => self.toggle_login().await,
            KeyCode::Char('t') => self.toggle_theme(),
            _ => return false,
        }
        true
    }

    /// Navigate to a new view
    pub fn navigate(&mut self, view: View) {
        if self.state.current_view == view {
            return;
        }
        self.state.view_history.push(self.state.current_view);
        self.state.current_view = view;
        self.state.reset_selection();
    }

    /// Go back to the last non-form view
    pub fn go_back(&mut self) {
        while let Some(view) = self.state.view_history.pop() {
            if view.is_form_view() || view == View::ServerDown {
                continue;
            }
            self.state.current_view = view;
            self.state.reset_selection();
            return;
        }
        self.state.current_view = View::Catalog;
    }

    /// Open a view and load what it shows
    async fn open_view(&mut self, view: View) {
        match view {
            View::SellProduct => {
                if self.state.sell.is_none() {
                    match self.new_sell_wizard() {
                        Ok(wizard) => self.state.sell = Some(wizard),
                        Err(e) => return self.form_error(e),
                    }
                    self.state.active_draft = None;
                }
            }
            View::Registration => {
                if self.state.registration.is_none() {
                    match registration_wizard() {
                        Ok(wizard) => self.state.registration = Some(wizard),
                        Err(e) => return self.form_error(e),
                    }
                }
            }
            View::Login => {
                if self.state.login.is_none() {
                    match login_form() {
                        Ok(form) => self.state.login = Some(form),
                        Err(e) => return self.form_error(e),
                    }
                }
            }
            View::Signup => {
                if self.state.signup.is_none() {
                    match signup_form() {
                        Ok(form) => self.state.signup = Some(form),
                        Err(e) => return self.form_error(e),
                    }
                }
            }
            _ => {}
        }

        self.navigate(view);

        match view {
            View::Inventory => self.refresh_catalog().await,
            View::Drafts => self.load_drafts().await,
            View::Registrations => self.load_registrations().await,
            View::Users => self.load_users().await,
            _ => {}
        }
    }

    // Errors

    /// Server-down failures take over the screen; anything else is a notification
    fn report(&mut self, action: &str, error: &ApiError) {
        if error.is_server_down() {
            self.state.server_down = Some(error.user_message());
            self.navigate(View::ServerDown);
        } else {
            tracing::debug!(%action, error = %error, "request rejected");
            self.state
                .notifications
                .error(format!("{action} failed: {}", error.user_message()));
        }
    }

    fn form_error(&mut self, error: FormError) {
        tracing::error!(error = %error, "form could not be built");
        self.state.notifications.error(error.to_string());
    }

    fn submit_failed(&mut self, action: &str, error: SubmitError) {
        match error {
            SubmitError::Service(api) => self.report(action, &api),
            other => self.state.notifications.error(other.to_string()),
        }
    }

    async fn handle_server_down_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Enter => {
                self.state.server_down = None;
                self.refresh_catalog().await;
                if self.state.server_down.is_none() {
                    self.leave_server_down();
                    self.state.notifications.success("Reconnected");
                }
            }
            KeyCode::Esc => self.leave_server_down(),
            _ => {}
        }
    }

    /// Return to whatever was on screen, forms included
    fn leave_server_down(&mut self) {
        self.state.current_view = self.state.view_history.pop().unwrap_or_default();
    }

    // Session

    fn persist_session(&mut self) {
        if let Err(e) = self.store.save(&self.session) {
            tracing::warn!(error = %e, "failed to save session");
            self.state.notifications.error("Could not save session");
        }
    }

    fn toggle_theme(&mut self) {
        self.session.toggle_theme();
        self.persist_session();
    }

    async fn toggle_login(&mut self) {
        if !self.session.is_signed_in() {
            return self.open_view(View::Login).await;
        }
        if let Some(user) = self.session.user.take() {
            tracing::info!(user = %user.email, "signed out");
            self.persist_session();
            self.state.notifications.info("Signed out");
        }
    }

    fn signed_in(&mut self, user: AuthUser) {
        tracing::info!(user = %user.email, "signed in");
        self.state
            .notifications
            .success(format!("Welcome, {}", user.name));
        self.session.user = Some(user);
        self.persist_session();
        self.go_back();
    }

    // Catalog

    pub async fn refresh_catalog(&mut self) {
        match self.service.get_products().await {
            Ok(products) => {
                self.state.inventory.set_products(products);
                self.sync_catalog();
            }
            Err(e) => return self.report("Loading products", &e),
        }
        match self.service.get_categories().await {
            Ok(categories) => self.state.catalog.categories = categories,
            Err(e) => self.report("Loading categories", &e),
        }
    }

    fn sync_catalog(&mut self) {
        self.state.catalog.products = self.state.inventory.products.clone();
        let visible = self.state.catalog.visible(&self.session.favourites).len();
        if self.state.catalog.selected_index >= visible {
            self.state.catalog.selected_index = visible.saturating_sub(1);
        }
    }

    fn upsert_product(&mut self, product: Product) {
        let mut products = self.state.inventory.products.clone();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        self.state.inventory.set_products(products);
        self.sync_catalog();
    }

    async fn handle_catalog_key(&mut self, key: KeyEvent) {
        if self.state.catalog.searching {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.state.catalog.searching = false,
                KeyCode::Backspace => self.state.catalog.pop_search(),
                KeyCode::Char(c) => self.state.catalog.push_search(c),
                _ => {}
            }
            return;
        }

        let visible = self.state.catalog.visible(&self.session.favourites).len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.state.catalog.move_down(visible),
            KeyCode::Up | KeyCode::Char('k') => self.state.catalog.move_up(),
            KeyCode::Char('/') => self.state.catalog.searching = true,
            KeyCode::Char('c') => self.state.catalog.cycle_category(),
            KeyCode::Char('p') => self.state.catalog.cycle_price(),
            KeyCode::Char('s') => self.state.catalog.cycle_sort(),
            KeyCode::Char('F') => self.state.catalog.toggle_favourites_only(),
            KeyCode::Char('x') => self.state.catalog.clear_filters(),
            KeyCode::Char('f') => self.toggle_favourite(),
            KeyCode::Char('r') => self.refresh_catalog().await,
            _ => {}
        }
    }

    fn toggle_favourite(&mut self) {
        let Some(id) = self
            .state
            .catalog
            .selected(&self.session.favourites)
            .map(|p| p.id.clone())
        else {
            return;
        };
        let message = if self.session.toggle_favourite(&id) {
            "Added to favourites"
        } else {
            "Removed from favourites"
        };
        self.state.notifications.info(message);
        self.persist_session();
        self.sync_catalog();
    }

    // Inventory

    async fn handle_inventory_key(&mut self, key: KeyEvent) {
        let inventory = &mut self.state.inventory;
        if inventory.searching {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => inventory.searching = false,
                KeyCode::Backspace => inventory.pop_search(),
                KeyCode::Char(c) => inventory.push_search(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => inventory.move_down(),
            KeyCode::Up | KeyCode::Char('k') => inventory.move_up(),
            KeyCode::PageDown | KeyCode::Char('n') => inventory.next_page(),
            KeyCode::PageUp | KeyCode::Char('b') => inventory.prev_page(),
            KeyCode::Char('/') => inventory.searching = true,
            KeyCode::Char('f') => inventory.cycle_status_filter(),
            KeyCode::Char('s') => inventory.cycle_sort(),
            KeyCode::Char('S') => inventory.toggle_direction(),
            KeyCode::Char(' ') => inventory.toggle_current(),
            KeyCode::Char('a') => inventory.toggle_all_visible(),
            KeyCode::Char('A') => self.open_confirm(ConfirmTarget::Status(ProductStatus::Active)),
            KeyCode::Char('I') => {
                self.open_confirm(ConfirmTarget::Status(ProductStatus::Inactive))
            }
            KeyCode::Char('D') => self.open_confirm(ConfirmTarget::Status(ProductStatus::Draft)),
            KeyCode::Char('x') => self.open_confirm(ConfirmTarget::Delete),
            KeyCode::Char('e') | KeyCode::Enter => self.edit_current_product(),
            KeyCode::Char('E') => self.export_inventory(),
            KeyCode::Char('r') => self.refresh_catalog().await,
            _ => {}
        }
    }

    /// Confirm for the selection, or for the row under the cursor when nothing is selected
    fn open_confirm(&mut self, target: ConfirmTarget) {
        let inventory = &self.state.inventory;
        let request = if !inventory.selected.is_empty() {
            ConfirmDialogState::Bulk {
                ids: inventory.selected.iter().cloned().collect(),
                target,
            }
        } else if let Some(product) = inventory.current() {
            ConfirmDialogState::Single {
                id: product.id.clone(),
                name: product.name.clone(),
                target,
            }
        } else {
            return;
        };
        self.state.confirm = Some(ConfirmDialog::new(request));
    }

    async fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.state.confirm.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Char('h' | 'j' | 'k' | 'l') => dialog.toggle_selection(),
            KeyCode::Enter => {
                if let Some(dialog) = self.state.confirm.take() {
                    if dialog.confirm_selected {
                        self.execute_confirm(dialog.request).await;
                    }
                }
            }
            KeyCode::Char('y') => {
                if let Some(dialog) = self.state.confirm.take() {
                    self.execute_confirm(dialog.request).await;
                }
            }
            KeyCode::Esc | KeyCode::Char('n') => self.state.confirm = None,
            _ => {}
        }
    }

    /// Apply a confirmed change id by id, stopping at the first failure
    async fn execute_confirm(&mut self, request: ConfirmDialogState) {
        let target = request.target();
        let mut done = Vec::new();
        for id in request.ids() {
            let result = match target {
                ConfirmTarget::Status(status) => self
                    .service
                    .update_product_status(&id, status)
                    .await
                    .map(|_| ()),
                ConfirmTarget::Delete => self.service.delete_product(&id).await,
            };
            match result {
                Ok(()) => done.push(id),
                Err(e) => {
                    self.report("Updating products", &e);
                    break;
                }
            }
        }
        if done.is_empty() {
            return;
        }

        match target {
            ConfirmTarget::Status(status) => self.state.inventory.apply_status(&done, status),
            ConfirmTarget::Delete => self.state.inventory.remove(&done),
        }
        for id in &done {
            self.state.inventory.selected.remove(id);
        }
        self.sync_catalog();
        tracing::info!(count = done.len(), action = %target.verb(), "inventory updated");
        let noun = if done.len() == 1 { "product" } else { "products" };
        self.state
            .notifications
            .success(format!("{} {} updated", done.len(), noun));
    }

    fn edit_current_product(&mut self) {
        let Some(product) = self.state.inventory.current().cloned() else {
            return;
        };
        let result = sell_product_wizard(&self.state.catalog.categories).and_then(|mut wizard| {
            wizard.load(
                &SellProductForm::from_product(&product),
                SubmitMode::Update(product.id.clone()),
            )?;
            Ok(wizard)
        });
        match result {
            Ok(wizard) => {
                self.state.sell = Some(wizard);
                self.state.active_draft = None;
                self.navigate(View::SellProduct);
            }
            Err(e) => self.form_error(e),
        }
    }

    fn export_inventory(&mut self) {
        let dir = self.config.export_dir();
        let rows = self.state.inventory.visible();
        match export::export_to_dir(&dir, &rows) {
            Ok(path) => self
                .state
                .notifications
                .success(format!("Exported to {}", path.display())),
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.state.notifications.error(e.to_string());
            }
        }
    }

    // Sell product wizard

    /// New listing, pre-filled with the category the catalog is filtered to
    fn new_sell_wizard(&self) -> Result<Wizard<SellProductForm>, FormError> {
        let mut wizard = sell_product_wizard(&self.state.catalog.categories)?;
        if let Some(category) = &self.state.catalog.category {
            wizard.set_value(&FieldPath::parse("category")?, json!(category))?;
        }
        Ok(wizard)
    }

    async fn handle_sell_key(&mut self, key: KeyEvent) {
        let Some(wizard) = self.state.sell.as_mut() else {
            return self.go_back();
        };
        match form_key(wizard, key, &mut self.state.notifications) {
            FormAction::Submit => self.submit_sell().await,
            FormAction::SaveDraft => self.save_draft().await,
            FormAction::Cancel => self.go_back(),
            FormAction::None => {}
        }
    }

    async fn submit_sell(&mut self) {
        let Some(mut wizard) = self.state.sell.take() else {
            return;
        };
        let mode = wizard.mode().clone();
        let service = self.service.as_ref();
        let result = wizard
            .submit(move |form| async move {
                let input = form.to_input()?;
                let product = match mode {
                    SubmitMode::Create => service.create_product(input).await?,
                    SubmitMode::Update(id) => service.update_product(&id, input).await?,
                };
                Ok::<_, SubmitError>(product)
            })
            .await;

        match result {
            Ok(SubmitOutcome::Reset(product)) => {
                self.state
                    .notifications
                    .success(format!("\"{}\" is now listed", product.name));
                self.upsert_product(product);
                self.state.sell = Some(wizard);
                if let Some(draft) = self.state.active_draft.take() {
                    self.discard_draft(&draft).await;
                }
            }
            Ok(SubmitOutcome::Redirect(product)) => {
                self.state
                    .notifications
                    .success(format!("\"{}\" updated", product.name));
                self.upsert_product(product);
                self.go_back();
            }
            Err(e) => {
                self.state.sell = Some(wizard);
                self.submit_failed("Listing product", e);
            }
        }
    }

    /// Save the sell form as a draft. Failures are only logged.
    async fn save_draft(&mut self) {
        let Some(data) = self.state.sell.as_ref().map(|w| w.snapshot()) else {
            return;
        };
        let result = match self.state.active_draft.clone() {
            Some(id) => self.service.update_draft(&id, data).await,
            None => self.service.create_draft(data).await,
        };
        match result {
            Ok(draft) => {
                self.state.active_draft = Some(draft.id.clone());
                match self.state.drafts.iter_mut().find(|d| d.id == draft.id) {
                    Some(existing) => *existing = draft,
                    None => self.state.drafts.push(draft),
                }
                self.state.notifications.info("Draft saved");
            }
            Err(e) => tracing::warn!(error = %e, "failed to save draft"),
        }
    }

    async fn discard_draft(&mut self, id: &str) {
        match self.service.delete_draft(id).await {
            Ok(()) => self.state.drafts.retain(|d| d.id != id),
            Err(e) => tracing::warn!(draft = %id, error = %e, "failed to delete draft"),
        }
    }

    // Drafts

    async fn load_drafts(&mut self) {
        match self.service.get_drafts().await {
            Ok(drafts) => self.state.drafts = drafts,
            Err(e) => self.report("Loading drafts", &e),
        }
    }

    async fn handle_drafts_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.state.drafts.len();
                self.state.move_selection_down(len);
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.move_selection_up(),
            KeyCode::Enter => self.resume_draft(),
            KeyCode::Char('x') => {
                if let Some(id) = self
                    .state
                    .drafts
                    .get(self.state.selected_index)
                    .map(|d| d.id.clone())
                {
                    self.discard_draft(&id).await;
                    if self.state.active_draft.as_deref() == Some(id.as_str()) {
                        self.state.active_draft = None;
                    }
                    let len = self.state.drafts.len();
                    self.state.selected_index = self.state.selected_index.min(len.saturating_sub(1));
                }
            }
            KeyCode::Char('r') => self.load_drafts().await,
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    fn resume_draft(&mut self) {
        let Some(draft) = self.state.drafts.get(self.state.selected_index).cloned() else {
            return;
        };
        let result = sell_product_wizard(&self.state.catalog.categories).and_then(|mut wizard| {
            wizard.restore(draft.data, SubmitMode::Create)?;
            Ok(wizard)
        });
        match result {
            Ok(wizard) => {
                self.state.sell = Some(wizard);
                self.state.active_draft = Some(draft.id);
                self.navigate(View::SellProduct);
            }
            Err(e) => self.form_error(e),
        }
    }

    // Seller registration

    async fn handle_registration_key(&mut self, key: KeyEvent) {
        let Some(wizard) = self.state.registration.as_mut() else {
            return self.go_back();
        };
        match form_key(wizard, key, &mut self.state.notifications) {
            FormAction::Submit => self.submit_registration().await,
            FormAction::Cancel => self.go_back(),
            FormAction::SaveDraft | FormAction::None => {}
        }
    }

    async fn submit_registration(&mut self) {
        let Some(mut wizard) = self.state.registration.take() else {
            return;
        };
        let mode = wizard.mode().clone();
        let service = self.service.as_ref();
        let result = wizard
            .submit(move |form| async move {
                let registration = form.to_registration()?;
                let stored = match mode {
                    SubmitMode::Create => service.register_seller(registration).await?,
                    SubmitMode::Update(id) => {
                        service.update_registration(&id, registration).await?
                    }
                };
                Ok::<_, SubmitError>(stored)
            })
            .await;

        match result {
            Ok(SubmitOutcome::Reset(registration)) => {
                self.state.notifications.success("Registration submitted");
                self.state.registrations.push(registration);
                self.state.registration = Some(wizard);
            }
            Ok(SubmitOutcome::Redirect(registration)) => {
                self.state.notifications.success("Registration updated");
                match self
                    .state
                    .registrations
                    .iter_mut()
                    .find(|r| r.id == registration.id)
                {
                    Some(existing) => *existing = registration,
                    None => self.state.registrations.push(registration),
                }
                self.go_back();
            }
            Err(e) => {
                self.state.registration = Some(wizard);
                self.submit_failed("Registration", e);
            }
        }
    }

    async fn load_registrations(&mut self) {
        match self.service.get_registrations().await {
            Ok(registrations) => self.state.registrations = registrations,
            Err(e) => self.report("Loading registrations", &e),
        }
    }

    async fn handle_registrations_key(&mut self, key: KeyEvent) {
        let selected = self
            .state
            .registrations
            .get(self.state.selected_index)
            .map(|r| r.id.clone());
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.state.registrations.len();
                self.state.move_selection_down(len);
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.move_selection_up(),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = selected {
                    self.edit_registration(&id).await;
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = selected {
                    match self.service.delete_registration(&id).await {
                        Ok(()) => {
                            self.state.registrations.retain(|r| r.id != id);
                            let len = self.state.registrations.len();
                            self.state.selected_index =
                                self.state.selected_index.min(len.saturating_sub(1));
                            self.state.notifications.success("Registration deleted");
                        }
                        Err(e) => self.report("Deleting registration", &e),
                    }
                }
            }
            KeyCode::Char('n') => {
                self.state.registration = None;
                self.open_view(View::Registration).await;
            }
            KeyCode::Char('r') => self.load_registrations().await,
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    /// Fetch the latest copy and open it in the wizard in update mode
    async fn edit_registration(&mut self, id: &str) {
        let registration = match self.service.get_registration_by_id(id).await {
            Ok(registration) => registration,
            Err(e) => return self.report("Loading registration", &e),
        };
        let result = registration_wizard().and_then(|mut wizard| {
            wizard.load(
                &RegistrationForm::from_registration(&registration.details),
                SubmitMode::Update(registration.id.clone()),
            )?;
            Ok(wizard)
        });
        match result {
            Ok(wizard) => {
                self.state.registration = Some(wizard);
                self.navigate(View::Registration);
            }
            Err(e) => self.form_error(e),
        }
    }

    // Users

    async fn load_users(&mut self) {
        let search = self.state.user_search.trim();
        let query = UserQuery {
            search: (!search.is_empty()).then(|| search.to_string()),
            ..UserQuery::default()
        };
        match self.service.get_users(query).await {
            Ok(users) => {
                self.state.users = users;
                self.state.reset_selection();
            }
            Err(e) => self.report("Loading users", &e),
        }
    }

    async fn handle_users_key(&mut self, key: KeyEvent) {
        if self.state.user_searching {
            match key.code {
                KeyCode::Enter => {
                    self.state.user_searching = false;
                    self.load_users().await;
                }
                KeyCode::Esc => self.state.user_searching = false,
                KeyCode::Backspace => {
                    self.state.user_search.pop();
                }
                KeyCode::Char(c) => self.state.user_search.push(c),
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.state.users.len();
                self.state.move_selection_down(len);
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.move_selection_up(),
            KeyCode::Char('/') => self.state.user_searching = true,
            KeyCode::Char('r') => self.load_users().await,
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    // Auth

    async fn handle_login_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('u') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.open_view(View::Signup).await;
            return;
        }
        let Some(form) = self.state.login.as_mut() else {
            return self.go_back();
        };
        match form_key(form, key, &mut self.state.notifications) {
            FormAction::Submit => self.submit_login().await,
            FormAction::Cancel => self.go_back(),
            FormAction::SaveDraft | FormAction::None => {}
        }
    }

    async fn submit_login(&mut self) {
        let Some(mut form) = self.state.login.take() else {
            return;
        };
        let service = self.service.as_ref();
        let result = form
            .submit(move |login| async move {
                Ok::<_, SubmitError>(service.login(login.to_credentials()).await?)
            })
            .await;
        self.state.login = Some(form);
        match result {
            Ok(SubmitOutcome::Reset(user) | SubmitOutcome::Redirect(user)) => self.signed_in(user),
            Err(e) => self.submit_failed("Login", e),
        }
    }

    async fn handle_signup_key(&mut self, key: KeyEvent) {
        let Some(form) = self.state.signup.as_mut() else {
            return self.go_back();
        };
        match form_key(form, key, &mut self.state.notifications) {
            FormAction::Submit => self.submit_signup().await,
            FormAction::Cancel => self.go_back(),
            FormAction::SaveDraft | FormAction::None => {}
        }
    }

    async fn submit_signup(&mut self) {
        let Some(mut form) = self.state.signup.take() else {
            return;
        };
        let service = self.service.as_ref();
        let result = form
            .submit(move |signup| async move {
                Ok::<_, SubmitError>(service.signup(signup.to_signup()).await?)
            })
            .await;
        self.state.signup = Some(form);
        match result {
            Ok(SubmitOutcome::Reset(user) | SubmitOutcome::Redirect(user)) => self.signed_in(user),
            Err(e) => self.submit_failed("Sign up", e),
        }
    }
}

/// Keys shared by every wizard. Ctrl+letter drives rows and drafts.
fn form_key<T>(wizard: &mut Wizard<T>, key: KeyEvent, notifications: &mut Notifications) -> FormAction
where
    T: Serialize + DeserializeOwned,
{
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let focused = wizard.focused_field().map(|b| wizard.field(&b).clone());

    let edited = match key.code {
        KeyCode::Esc => return FormAction::Cancel,
        KeyCode::Char(c) if ctrl => return row_key(wizard, c, notifications),
        KeyCode::Tab | KeyCode::Down => {
            wizard.next_focus();
            Ok(true)
        }
        KeyCode::BackTab | KeyCode::Up => {
            wizard.prev_focus();
            Ok(true)
        }
        KeyCode::PageDown => {
            wizard.go_next();
            Ok(true)
        }
        KeyCode::PageUp => {
            wizard.go_back();
            Ok(true)
        }
        KeyCode::Char(c) if alt => {
            if let Some(step) = c.to_digit(10) {
                wizard.go_to_step((step as usize).saturating_sub(1));
            }
            Ok(true)
        }
        KeyCode::Left => wizard.cycle(false),
        KeyCode::Right => wizard.cycle(true),
        KeyCode::Enter if focused.as_ref().is_some_and(|f| f.is_multiline()) => {
            wizard.type_char('\n')
        }
        KeyCode::Enter if wizard.steps().is_last() => return FormAction::Submit,
        KeyCode::Enter => {
            wizard.go_next();
            Ok(true)
        }
        KeyCode::Backspace => wizard.backspace(),
        KeyCode::Char(' ') if focused.as_ref().is_some_and(|f| !f.accepts_text()) => {
            wizard.toggle()
        }
        KeyCode::Char(c) => wizard.type_char(c),
        _ => Ok(false),
    };
    if let Err(e) = edited {
        tracing::warn!(error = %e, "form edit failed");
        notifications.error(e.to_string());
    }
    FormAction::None
}

fn row_key<T>(wizard: &mut Wizard<T>, c: char, notifications: &mut Notifications) -> FormAction
where
    T: Serialize + DeserializeOwned,
{
    let result = match c {
        'a' => wizard.append_row().map(|_| "Entry added"),
        'n' => wizard.append_child_row().map(|_| "Entry added"),
        'd' => wizard.remove_row().map(|_| "Entry removed"),
        's' => wizard.save_row().map(|_| "Entry saved"),
        'e' => wizard.edit_row().map(|_| "Entry reopened"),
        'r' => {
            let active = wizard.steps().active();
            wizard.reset_step(active);
            Ok("Step reset")
        }
        'v' => {
            if wizard.validate_active() {
                Ok("Step looks good")
            } else {
                Err(RowError::Invalid {
                    label: wizard.steps().active_step().title.clone(),
                    errors: wizard.errors().clone(),
                })
            }
        }
        'w' => return FormAction::SaveDraft,
        _ => return FormAction::None,
    };
    match result {
        Ok(message) => notifications.info(message),
        Err(e) => notifications.error(e.to_string()),
    }
    FormAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Category, MockStorefrontService};
    use crate::state::{NotificationKind, WizardPhase};
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app(service: MockStorefrontService) -> App {
        App::with_parts(
            AppConfig::default(),
            Box::new(service),
            Box::new(MemorySessionStore::new()),
        )
    }

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            sku: format!("SKU-{id}"),
            category: "Lighting".to_string(),
            price: 10.0,
            stock: 1,
            status: ProductStatus::Active,
            image_url: None,
            tags: Vec::new(),
            accepts_returns: false,
            warehouses: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn last_notification(app: &App) -> Option<(NotificationKind, String)> {
        let mut notifications = app.state.notifications.clone();
        let mut last = None;
        while let Some(n) = notifications.current() {
            last = Some((n.kind, n.message.clone()));
            notifications.dismiss();
        }
        last
    }

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    /// A sell wizard filled in and parked on the review step
    fn ready_sell_wizard() -> Wizard<SellProductForm> {
        let categories = vec![Category {
            id: "c1".into(),
            name: "Lighting".into(),
        }];
        let mut wizard = sell_product_wizard(&categories).unwrap();
        for (path, value) in [
            ("name", "Desk Lamp"),
            ("description", "A lamp"),
            ("category", "Lighting"),
            ("sku", "LMP-1"),
            ("price", "49.99"),
            ("stock", "4"),
            ("warehouses.0.name", "Main"),
            ("warehouses.0.city", "Pune"),
            ("warehouses.0.postalCode", "411001"),
            ("warehouses.0.stock", "4"),
        ] {
            wizard.set_value(&p(path), json!(value)).unwrap();
        }
        let last = wizard.steps().count() - 1;
        wizard.go_to_step(last);
        wizard
    }

    mod navigation {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_navigate_saves_history() {
            let mut app = app(MockStorefrontService::new());
            app.navigate(View::Drafts);
            assert_eq!(app.state.current_view, View::Drafts);
            assert_eq!(app.state.view_history, vec![View::Catalog]);
        }

        #[test]
        fn test_go_back_skips_form_views() {
            let mut app = app(MockStorefrontService::new());
            app.navigate(View::Inventory);
            app.navigate(View::SellProduct);
            app.navigate(View::Login);
            app.go_back();
            assert_eq!(app.state.current_view, View::Inventory);
        }

        #[test]
        fn test_go_back_empty_history_lands_on_catalog() {
            let mut app = app(MockStorefrontService::new());
            app.state.current_view = View::Users;
            app.go_back();
            assert_eq!(app.state.current_view, View::Catalog);
        }

        #[tokio::test]
        async fn test_quit_key() {
            let mut app = app(MockStorefrontService::new());
            app.handle_key(key(KeyCode::Char('q'))).await.unwrap();
            assert!(app.should_quit());
        }
    }

    mod errors {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_server_down_escalates_to_full_screen() {
            let mut service = MockStorefrontService::new();
            service
                .expect_get_products()
                .returning(|| Err(ApiError::ServerDown("connection refused".into())));
            let mut app = app(service);
            app.refresh_catalog().await;
            assert_eq!(app.state.current_view, View::ServerDown);
            assert_eq!(
                app.state.server_down.as_deref(),
                Some("Server is unreachable. Please try again later.")
            );
            assert!(app.state.notifications.is_empty());
        }

        #[tokio::test]
        async fn test_retry_leaves_server_down_view() {
            let mut service = MockStorefrontService::new();
            let mut calls = 0;
            service.expect_get_products().returning(move || {
                calls += 1;
                if calls == 1 {
                    Err(ApiError::ServerDown("timeout".into()))
                } else {
                    Ok(vec![product("p1", "Lamp")])
                }
            });
            service.expect_get_categories().returning(|| Ok(Vec::new()));
            let mut app = app(service);
            app.navigate(View::Drafts);
            app.refresh_catalog().await;
            assert_eq!(app.state.current_view, View::ServerDown);

            app.handle_key(key(KeyCode::Char('r'))).await.unwrap();
            assert_eq!(app.state.current_view, View::Drafts);
            assert_eq!(app.state.catalog.products.len(), 1);
        }

        #[tokio::test]
        async fn test_rejected_submit_keeps_form_and_notifies() {
            let mut service = MockStorefrontService::new();
            service.expect_create_product().times(1).returning(|_| {
                Err(ApiError::Rejected {
                    status: 400,
                    custom_message: Some("SKU already exists".into()),
                })
            });
            let mut app = app(service);
            app.state.sell = Some(ready_sell_wizard());
            app.navigate(View::SellProduct);

            app.handle_key(key(KeyCode::Enter)).await.unwrap();

            assert_eq!(app.state.current_view, View::SellProduct);
            let (kind, message) = last_notification(&app).unwrap();
            assert_eq!(kind, NotificationKind::Error);
            assert_eq!(message, "Listing product failed: SKU already exists");
            let wizard = app.state.sell.as_ref().unwrap();
            assert_eq!(wizard.state().text(&p("name")), "Desk Lamp");
            assert!(matches!(wizard.phase(), WizardPhase::Editing(_)));
        }

        #[tokio::test]
        async fn test_server_down_submit_keeps_form_behind_error_view() {
            let mut service = MockStorefrontService::new();
            service
                .expect_create_product()
                .returning(|_| Err(ApiError::ServerDown("connection refused".into())));
            let mut app = app(service);
            app.state.sell = Some(ready_sell_wizard());
            app.navigate(View::SellProduct);

            app.handle_key(key(KeyCode::Enter)).await.unwrap();
            assert_eq!(app.state.current_view, View::ServerDown);

            app.handle_key(key(KeyCode::Esc)).await.unwrap();
            assert_eq!(app.state.current_view, View::SellProduct);
            assert!(app.state.sell.is_some());
        }
    }

    mod sell {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_successful_submit_lists_product_and_resets() {
            let mut service = MockStorefrontService::new();
            service
                .expect_create_product()
                .withf(|input| input.name == "Desk Lamp" && input.price == 49.99)
                .returning(|input| Ok(product("p9", &input.name)));
            service.expect_delete_draft().times(1).returning(|_| Ok(()));
            let mut app = app(service);
            app.state.sell = Some(ready_sell_wizard());
            app.state.active_draft = Some("d1".into());
            app.navigate(View::SellProduct);

            app.handle_key(key(KeyCode::Enter)).await.unwrap();

            assert_eq!(app.state.inventory.products.len(), 1);
            assert_eq!(app.state.catalog.products[0].id, "p9");
            assert_eq!(app.state.active_draft, None);
            let wizard = app.state.sell.as_ref().unwrap();
            assert_eq!(wizard.state().text(&p("name")), "");
            assert_eq!(wizard.steps().active(), 0);
        }

        #[tokio::test]
        async fn test_draft_failure_is_only_logged() {
            let mut service = MockStorefrontService::new();
            service.expect_create_draft().returning(|_| {
                Err(ApiError::Rejected {
                    status: 500,
                    custom_message: None,
                })
            });
            let mut app = app(service);
            app.state.sell = Some(ready_sell_wizard());
            app.navigate(View::SellProduct);

            app.handle_key(ctrl('w')).await.unwrap();

            assert_eq!(app.state.current_view, View::SellProduct);
            assert!(app.state.notifications.is_empty());
            assert_eq!(app.state.active_draft, None);
        }

        #[tokio::test]
        async fn test_draft_save_then_update() {
            let mut service = MockStorefrontService::new();
            service.expect_create_draft().times(1).returning(|data| {
                Ok(crate::api::Draft {
                    id: "d1".into(),
                    data,
                    updated_at: Utc::now(),
                })
            });
            service
                .expect_update_draft()
                .withf(|id, _| id == "d1")
                .times(1)
                .returning(|id, data| {
                    Ok(crate::api::Draft {
                        id: id.to_string(),
                        data,
                        updated_at: Utc::now(),
                    })
                });
            let mut app = app(service);
            app.state.sell = Some(ready_sell_wizard());
            app.navigate(View::SellProduct);

            app.handle_key(ctrl('w')).await.unwrap();
            app.handle_key(ctrl('w')).await.unwrap();
            assert_eq!(app.state.active_draft.as_deref(), Some("d1"));
            assert_eq!(app.state.drafts.len(), 1);
        }
    }

    mod inventory {
        use super::*;
        use pretty_assertions::assert_eq;

        fn app_with_products(service: MockStorefrontService) -> App {
            let mut app = app(service);
            app.state
                .inventory
                .set_products(vec![product("p1", "Lamp"), product("p2", "Chair")]);
            app.sync_catalog();
            app.state.current_view = View::Inventory;
            app
        }

        #[tokio::test]
        async fn test_bulk_status_change_through_confirm_dialog() {
            let mut service = MockStorefrontService::new();
            service
                .expect_update_product_status()
                .withf(|_, status| *status == ProductStatus::Inactive)
                .times(2)
                .returning(|id, status| {
                    let mut p = product(id, "x");
                    p.status = status;
                    Ok(p)
                });
            let mut app = app_with_products(service);

            app.handle_key(key(KeyCode::Char('a'))).await.unwrap();
            app.handle_key(key(KeyCode::Char('I'))).await.unwrap();
            assert!(matches!(
                app.state.confirm.as_ref().map(|d| &d.request),
                Some(ConfirmDialogState::Bulk { ids, .. }) if ids.len() == 2
            ));

            // Enter on the default Cancel button closes without changes
            app.handle_key(key(KeyCode::Enter)).await.unwrap();
            assert!(app.state.confirm.is_none());

            app.handle_key(key(KeyCode::Char('I'))).await.unwrap();
            app.handle_key(key(KeyCode::Right)).await.unwrap();
            app.handle_key(key(KeyCode::Enter)).await.unwrap();

            assert!(app
                .state
                .inventory
                .products
                .iter()
                .all(|p| p.status == ProductStatus::Inactive));
            assert!(app.state.inventory.selected.is_empty());
        }

        #[tokio::test]
        async fn test_single_delete_stops_on_rejection() {
            let mut service = MockStorefrontService::new();
            service.expect_delete_product().times(1).returning(|_| {
                Err(ApiError::Rejected {
                    status: 404,
                    custom_message: None,
                })
            });
            let mut app = app_with_products(service);

            app.handle_key(key(KeyCode::Char('x'))).await.unwrap();
            app.handle_key(key(KeyCode::Char('y'))).await.unwrap();

            assert_eq!(app.state.inventory.products.len(), 2);
            let (kind, message) = last_notification(&app).unwrap();
            assert_eq!(kind, NotificationKind::Error);
            assert_eq!(message, "Updating products failed: Not found");
        }

        #[tokio::test]
        async fn test_edit_opens_wizard_in_update_mode() {
            let mut app = app_with_products(MockStorefrontService::new());
            app.handle_key(key(KeyCode::Char('e'))).await.unwrap();
            assert_eq!(app.state.current_view, View::SellProduct);
            let wizard = app.state.sell.as_ref().unwrap();
            assert!(matches!(wizard.mode(), SubmitMode::Update(_)));
        }
    }

    mod session {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_favourite_toggle_persists() {
            let mut app = app(MockStorefrontService::new());
            app.state.inventory.set_products(vec![product("p1", "Lamp")]);
            app.sync_catalog();

            app.handle_key(key(KeyCode::Char('f'))).await.unwrap();
            assert!(app.session.is_favourite("p1"));
            assert!(app.store.load().unwrap().is_favourite("p1"));
        }

        #[tokio::test]
        async fn test_login_stores_user_and_logout_clears_it() {
            let mut service = MockStorefrontService::new();
            service.expect_login().returning(|c| {
                Ok(AuthUser {
                    id: "u1".into(),
                    name: "Ana".into(),
                    email: c.email,
                    token: "t".into(),
                })
            });
            let mut app = app(service);
            app.handle_key(key(KeyCode::Char('L'))).await.unwrap();
            assert_eq!(app.state.current_view, View::Login);

            let form = app.state.login.as_mut().unwrap();
            form.set_value(&p("email"), json!("ana@example.com")).unwrap();
            form.set_value(&p("password"), json!("long-enough")).unwrap();
            app.handle_key(key(KeyCode::Enter)).await.unwrap();

            assert_eq!(app.state.current_view, View::Catalog);
            assert!(app.store.load().unwrap().is_signed_in());

            app.handle_key(key(KeyCode::Char('L'))).await.unwrap();
            assert!(!app.session.is_signed_in());
            assert!(!app.store.load().unwrap().is_signed_in());
        }

        #[tokio::test]
        async fn test_theme_toggle_persists() {
            let mut app = app(MockStorefrontService::new());
            let before = app.session.theme;
            app.handle_key(key(KeyCode::Char('t'))).await.unwrap();
            assert_eq!(app.store.load().unwrap().theme, before.toggle());
        }
    }

    mod forms {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_typing_fills_focused_field() {
            let mut app = app(MockStorefrontService::new());
            app.handle_key(key(KeyCode::Char('3'))).await.unwrap();
            assert_eq!(app.state.current_view, View::SellProduct);
            for c in "Lamp".chars() {
                app.handle_key(key(KeyCode::Char(c))).await.unwrap();
            }
            let wizard = app.state.sell.as_ref().unwrap();
            assert_eq!(wizard.state().text(&p("name")), "Lamp");
        }

        #[tokio::test]
        async fn test_new_listing_uses_catalog_category() {
            let mut app = app(MockStorefrontService::new());
            app.state.catalog.category = Some("Lighting".into());
            app.handle_key(key(KeyCode::Char('3'))).await.unwrap();
            let wizard = app.state.sell.as_ref().unwrap();
            assert_eq!(wizard.state().text(&p("category")), "Lighting");
        }

        #[tokio::test]
        async fn test_step_check_reports_errors() {
            let mut app = app(MockStorefrontService::new());
            app.handle_key(key(KeyCode::Char('3'))).await.unwrap();
            app.handle_key(ctrl('v')).await.unwrap();
            let (kind, message) = last_notification(&app).unwrap();
            assert_eq!(kind, NotificationKind::Error);
            assert_eq!(message, "Fix the highlighted Basic info fields");
            assert!(app.state.sell.as_ref().unwrap().error_for(&p("name")).is_some());
        }

        #[tokio::test]
        async fn test_global_keys_are_text_inside_forms() {
            let mut app = app(MockStorefrontService::new());
            app.handle_key(key(KeyCode::Char('3'))).await.unwrap();
            app.handle_key(key(KeyCode::Char('q'))).await.unwrap();
            assert!(!app.should_quit());
        }

        #[tokio::test]
        async fn test_row_limit_reported_as_notification() {
            let mut app = app(MockStorefrontService::new());
            app.state.sell = Some(ready_sell_wizard());
            app.navigate(View::SellProduct);
            app.state.sell.as_mut().unwrap().go_to_step(2);

            for _ in 0..10 {
                app.handle_key(ctrl('a')).await.unwrap();
                let wizard = app.state.sell.as_mut().unwrap();
                let last = wizard.state().array_len(&p("warehouses")) - 1;
                for (field, value) in [
                    ("name", "Depot"),
                    ("city", "Goa"),
                    ("postalCode", "403001"),
                    ("stock", "1"),
                ] {
                    wizard
                        .set_value(&p(&format!("warehouses.{last}.{field}")), json!(value))
                        .unwrap();
                }
            }
            let wizard = app.state.sell.as_ref().unwrap();
            assert_eq!(wizard.state().array_len(&p("warehouses")), 5);
            let (kind, message) = last_notification(&app).unwrap();
            assert_eq!(kind, NotificationKind::Error);
            assert_eq!(message, "You can add at most 5 warehouses");
        }
    }
}
