//! Multi-step wizard: one form state driven by steps, rows and a final submit

use super::array::{Collection, RowError};
use super::field::{BoundField, FieldKind, FieldRegistry, Focus, FormField};
use super::form_state::{mark_all_rows_saved, FormError, FormState, SAVED_FLAG};
use super::path::{FieldPath, Segment};
use super::schema::{Schema, ValidationErrorMap};
use super::steps::{StepController, StepDefinition};
use crate::api::ApiError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Whether a successful submit creates a record or updates one
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmitMode {
    #[default]
    Create,
    Update(String),
}

/// Where the wizard currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Editing(usize),
    Submitting,
    /// An update was accepted; the caller should leave the wizard
    Redirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Editing,
    Submitting,
    Redirected,
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<R> {
    /// Created; the form is back to its defaults
    Reset(R),
    /// Updated; navigate away
    Redirect(R),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Complete the remaining steps before submitting")]
    NotOnFinalStep,

    #[error("{} field(s) need attention", .0.len())]
    Invalid(ValidationErrorMap),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Service(#[from] ApiError),
}

/// A row inside one of the wizard's collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRef {
    pub collection: usize,
    /// Concrete array path
    pub at: FieldPath,
    pub index: usize,
}

/// Form state plus everything needed to edit and submit it
pub struct Wizard<T> {
    title: String,
    state: FormState<T>,
    schema: Schema,
    registry: FieldRegistry,
    steps: StepController,
    collections: Vec<Collection>,
    errors: ValidationErrorMap,
    mode: SubmitMode,
    phase: Phase,
    focus: usize,
    choice: usize,
}

impl<T> Wizard<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        title: &str,
        defaults: &T,
        schema: Schema,
        registry: FieldRegistry,
        steps: Vec<StepDefinition>,
        collections: Vec<Collection>,
    ) -> Result<Self, FormError> {
        Ok(Self {
            title: title.to_string(),
            state: FormState::new(defaults)?,
            schema,
            registry,
            steps: StepController::new(steps)?,
            collections,
            errors: ValidationErrorMap::new(),
            mode: SubmitMode::Create,
            phase: Phase::Editing,
            focus: 0,
            choice: 0,
        })
    }

    /// Open an existing record for editing. Its rows start saved.
    pub fn load(&mut self, record: &T, mode: SubmitMode) -> Result<(), FormError> {
        self.state.load(record)?;
        mark_all_rows_saved(self.state.values_mut());
        self.mode = mode;
        self.restart();
        Ok(())
    }

    /// Restore a raw snapshot (a saved draft)
    pub fn restore(&mut self, snapshot: Value, mode: SubmitMode) -> Result<(), FormError> {
        self.state.load_value(snapshot)?;
        self.mode = mode;
        self.restart();
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> &FormState<T> {
        &self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn steps(&self) -> &StepController {
        &self.steps
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn mode(&self) -> &SubmitMode {
        &self.mode
    }

    pub fn errors(&self) -> &ValidationErrorMap {
        &self.errors
    }

    pub fn error_for(&self, path: &FieldPath) -> Option<&str> {
        self.registry.error(&self.errors, path)
    }

    pub fn phase(&self) -> WizardPhase {
        match self.phase {
            Phase::Editing => WizardPhase::Editing(self.steps.active()),
            Phase::Submitting => WizardPhase::Submitting,
            Phase::Redirected => WizardPhase::Redirected,
        }
    }

    /// Form tree without row flags, for drafts
    pub fn snapshot(&self) -> Value {
        self.state.snapshot()
    }

    // Fields

    /// Inputs of the active step, in display order
    pub fn visible_fields(&self) -> Vec<BoundField> {
        self.registry
            .bound(&self.state, &self.steps.active_step().fields)
    }

    pub fn field(&self, bound: &BoundField) -> &FormField {
        self.registry.field(bound)
    }

    pub fn focused_field(&self) -> Option<BoundField> {
        self.visible_fields().into_iter().nth(self.focus)
    }

    /// Option cursor inside a focused checkbox group
    pub fn choice_cursor(&self) -> usize {
        self.choice
    }

    /// Move focus to a concrete path if it is shown on the active step
    pub fn focus_path(&mut self, path: &FieldPath) -> bool {
        match self.visible_fields().iter().position(|b| b.path == *path) {
            Some(index) => {
                self.set_focused(index);
                true
            }
            None => false,
        }
    }

    /// Whether a path sits inside a saved row
    pub fn is_locked(&self, path: &FieldPath) -> bool {
        path.segments().iter().enumerate().any(|(depth, segment)| {
            matches!(segment, Segment::Index(_))
                && matches!(
                    self.state.get(&path.prefix(depth + 1).key(SAVED_FLAG)),
                    Some(Value::Bool(true))
                )
        })
    }

    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        self.state.set(path, value)?;
        self.errors.remove(&path.to_string());
        Ok(())
    }

    /// Type into the focused field. Returns false when nothing was edited.
    pub fn type_char(&mut self, c: char) -> Result<bool, FormError> {
        self.edit_focused(|field, state, at| field.push_char(state, at, c))
    }

    pub fn backspace(&mut self) -> Result<bool, FormError> {
        self.edit_focused(|field, state, at| field.pop_char(state, at))
    }

    /// Left/Right on a choice field
    pub fn cycle(&mut self, forward: bool) -> Result<bool, FormError> {
        let Some(bound) = self.focused_field() else {
            return Ok(false);
        };
        if let FieldKind::CheckboxGroup(choices) = &self.registry.field(&bound).kind {
            if !choices.is_empty() {
                self.choice = if forward {
                    (self.choice + 1) % choices.len()
                } else {
                    (self.choice + choices.len() - 1) % choices.len()
                };
            }
            return Ok(true);
        }
        self.edit_focused(|field, state, at| field.select_next(state, at, forward))
    }

    /// Space on a choice field
    pub fn toggle(&mut self) -> Result<bool, FormError> {
        let choice = self.choice;
        self.edit_focused(|field, state, at| match &field.kind {
            FieldKind::CheckboxGroup(_) => field.toggle_choice(state, at, choice),
            _ => field.select_next(state, at, true),
        })
    }

    fn edit_focused<F>(&mut self, edit: F) -> Result<bool, FormError>
    where
        F: FnOnce(&FormField, &mut FormState<T>, &FieldPath) -> Result<(), FormError>,
    {
        let Some(bound) = self.focused_field() else {
            return Ok(false);
        };
        if self.is_locked(&bound.path) {
            return Ok(false);
        }
        let field = self.registry.field(&bound);
        edit(field, &mut self.state, &bound.path)?;
        self.errors.remove(&bound.path.to_string());
        self.clamp_focus();
        Ok(true)
    }

    // Steps

    pub fn go_next(&mut self) {
        self.steps.go_next(&self.state, &self.schema);
        self.after_step_change();
    }

    pub fn go_back(&mut self) {
        self.steps.go_back(&self.state, &self.schema);
        self.after_step_change();
    }

    pub fn go_to_step(&mut self, target: usize) {
        let before = self.steps.active();
        self.steps.go_to_step(target, &self.state, &self.schema);
        if self.steps.active() != before {
            self.after_step_change();
        }
    }

    /// Validate the active step without moving
    pub fn validate_active(&mut self) -> bool {
        let active = self.steps.active();
        let valid = self.steps.validate_step(active, &self.state, &self.schema);
        self.show_step_errors();
        valid
    }

    pub fn reset_step(&mut self, index: usize) {
        self.steps.reset_step(index, &mut self.state);
        if index == self.steps.active() {
            self.errors.clear();
            self.focus = 0;
            self.choice = 0;
        }
    }

    /// Back to defaults, first step, no indicators
    pub fn reset(&mut self) {
        self.state.reset();
        self.restart();
    }

    fn restart(&mut self) {
        self.steps.restart();
        self.errors.clear();
        self.phase = Phase::Editing;
        self.focus = 0;
        self.choice = 0;
    }

    fn after_step_change(&mut self) {
        self.show_step_errors();
        self.focus = 0;
        self.choice = 0;
        tracing::debug!(wizard = %self.title, step = self.steps.active(), "step changed");
    }

    fn show_step_errors(&mut self) {
        self.errors = self
            .steps
            .errors(self.steps.active())
            .cloned()
            .unwrap_or_default();
    }

    // Rows

    /// Innermost collection row containing a path
    pub fn row_of(&self, path: &FieldPath) -> Option<RowRef> {
        let mut best: Option<RowRef> = None;
        for (collection, c) in self.collections.iter().enumerate() {
            for at in c.instances(&self.state) {
                if path.len() <= at.len() || !path.starts_with(&at) {
                    continue;
                }
                let Segment::Index(index) = path.segments()[at.len()] else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| b.at.len() < at.len()) {
                    best = Some(RowRef {
                        collection,
                        at,
                        index,
                    });
                }
            }
        }
        best
    }

    pub fn collection(&self, row: &RowRef) -> &Collection {
        &self.collections[row.collection]
    }

    pub fn is_row_saved(&self, row: &RowRef) -> bool {
        self.collections[row.collection].is_saved(&self.state, &row.at, row.index)
    }

    /// Collections edited on the active step with their concrete paths
    pub fn active_collections(&self) -> Vec<(usize, FieldPath)> {
        let step = self.steps.active_step();
        self.collections
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                step.fields
                    .iter()
                    .any(|f| f.starts_with(&c.pattern) || c.pattern.starts_with(f))
            })
            .flat_map(|(i, c)| c.instances(&self.state).into_iter().map(move |at| (i, at)))
            .collect()
    }

    fn focused_row(&self) -> Option<RowRef> {
        self.focused_field().and_then(|b| self.row_of(&b.path))
    }

    /// Add a row to the collection around the focused field, or to the
    /// first top-level collection of the step when focus is outside rows
    pub fn append_row(&mut self) -> Result<usize, RowError> {
        let target = match self.focused_row() {
            Some(row) => Some((row.collection, row.at)),
            None => self
                .active_collections()
                .into_iter()
                .find(|(i, _)| !self.collections[*i].pattern.is_pattern()),
        };
        let (collection, at) = target.ok_or(RowError::NoTarget)?;
        self.append_at(collection, at)
    }

    /// Add a row to a collection nested inside the focused row
    pub fn append_child_row(&mut self) -> Result<usize, RowError> {
        let row = self.focused_row().ok_or(RowError::NoTarget)?;
        let parent = row.at.index(row.index);
        let (collection, at) = self
            .active_collections()
            .into_iter()
            .find(|(_, at)| at.parent().as_ref() == Some(&parent))
            .ok_or(RowError::NoTarget)?;
        self.append_at(collection, at)
    }

    fn append_at(&mut self, collection: usize, at: FieldPath) -> Result<usize, RowError> {
        let result = self.collections[collection].append(&mut self.state, &self.schema, &at);
        match result {
            Ok(index) => {
                let row = at.index(index);
                if let Some(first) = self
                    .visible_fields()
                    .iter()
                    .find(|b| b.path.starts_with(&row))
                    .map(|b| b.path.clone())
                {
                    self.focus_path(&first);
                }
                Ok(index)
            }
            Err(e) => Err(self.absorb_row_error(e)),
        }
    }

    pub fn remove_row(&mut self) -> Result<(), RowError> {
        let row = self.focused_row().ok_or(RowError::NoTarget)?;
        let result = self.collections[row.collection].remove(&mut self.state, &row.at, row.index);
        match result {
            Ok(()) => {
                let prefix = row.at.to_string();
                self.errors.retain(|path, _| !path.starts_with(&prefix));
                self.clamp_focus();
                Ok(())
            }
            Err(e) => Err(self.absorb_row_error(e)),
        }
    }

    pub fn save_row(&mut self) -> Result<(), RowError> {
        let row = self.focused_row().ok_or(RowError::NoTarget)?;
        let result = self.collections[row.collection].save(
            &mut self.state,
            &self.schema,
            &row.at,
            row.index,
        );
        match result {
            Ok(()) => {
                let prefix = format!("{}.", row.at.index(row.index));
                self.errors.retain(|path, _| !path.starts_with(&prefix));
                Ok(())
            }
            Err(e) => Err(self.absorb_row_error(e)),
        }
    }

    pub fn edit_row(&mut self) -> Result<(), RowError> {
        let row = self.focused_row().ok_or(RowError::NoTarget)?;
        self.collections[row.collection].edit(&mut self.state, &row.at, row.index)
    }

    fn absorb_row_error(&mut self, error: RowError) -> RowError {
        if let Some(errors) = error.field_errors() {
            self.errors
                .extend(errors.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        error
    }

    fn clamp_focus(&mut self) {
        let count = self.focus_count();
        if count == 0 {
            self.focus = 0;
        } else if self.focus >= count {
            self.focus = count - 1;
        }
    }

    // Submit

    /// Submit from the last step. The whole form is validated, every row is
    /// marked saved, then the typed model is handed to `send`. A blocked
    /// submit leaves row flags untouched.
    pub async fn submit<R, F, Fut>(&mut self, send: F) -> Result<SubmitOutcome<R>, SubmitError>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R, SubmitError>>,
    {
        if !self.steps.is_last() {
            return Err(SubmitError::NotOnFinalStep);
        }
        self.phase = Phase::Submitting;

        self.steps.refresh(&self.state, &self.schema);
        let errors = self.schema.validate_all(&self.state);
        if !errors.is_empty() {
            tracing::debug!(wizard = %self.title, errors = errors.len(), "submit blocked by validation");
            self.errors = errors.clone();
            self.phase = Phase::Editing;
            return Err(SubmitError::Invalid(errors));
        }
        mark_all_rows_saved(self.state.values_mut());

        let model = match self.state.typed() {
            Ok(model) => model,
            Err(e) => {
                self.phase = Phase::Editing;
                return Err(e.into());
            }
        };

        match send(model).await {
            Ok(response) => {
                tracing::info!(wizard = %self.title, mode = ?self.mode, "submission accepted");
                match self.mode {
                    SubmitMode::Create => {
                        self.reset();
                        Ok(SubmitOutcome::Reset(response))
                    }
                    SubmitMode::Update(_) => {
                        self.phase = Phase::Redirected;
                        Ok(SubmitOutcome::Redirect(response))
                    }
                }
            }
            Err(e) => {
                match &e {
                    SubmitError::Service(api) if api.is_server_down() => {
                        tracing::error!(wizard = %self.title, error = %api, "submission failed, server down")
                    }
                    other => tracing::warn!(wizard = %self.title, error = %other, "submission failed"),
                }
                self.phase = Phase::Editing;
                Err(e)
            }
        }
    }
}

impl<T> Focus for Wizard<T>
where
    T: Serialize + DeserializeOwned,
{
    fn focus_count(&self) -> usize {
        self.visible_fields().len()
    }

    fn focused(&self) -> usize {
        self.focus
    }

    fn set_focused(&mut self, index: usize) {
        if index != self.focus {
            self.choice = 0;
        }
        self.focus = index;
    }
}
