//! Field registry: binds named inputs to paths in a form state

use super::form_state::{lookup, FormError, FormState};
use super::path::FieldPath;
use super::schema::{Predicate, ValidationErrorMap};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// One selectable option of a dropdown, radio or checkbox group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Input widget kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    /// Masked when rendered
    Secret,
    Dropdown(Vec<Choice>),
    Radio(Vec<Choice>),
    /// Stores a list of selected values
    CheckboxGroup(Vec<Choice>),
    Checkbox,
}

/// Represents a single form field with its configuration
#[derive(Debug, Clone)]
pub struct FormField {
    /// Path or path pattern (`warehouses.*.city`)
    pub path: FieldPath,
    pub label: String,
    pub kind: FieldKind,
    /// Only shown while a sibling satisfies the predicate
    visible_when: Option<(FieldPath, Predicate)>,
}

impl FormField {
    pub fn new(path: &str, label: &str, kind: FieldKind) -> Result<Self, FormError> {
        Ok(Self {
            path: FieldPath::parse(path)?,
            label: label.to_string(),
            kind,
            visible_when: None,
        })
    }

    /// Hide the field unless `sibling` satisfies `predicate`
    pub fn shown_when(mut self, sibling: &str, predicate: Predicate) -> Result<Self, FormError> {
        self.visible_when = Some((FieldPath::parse(sibling)?, predicate));
        Ok(self)
    }

    pub fn is_visible(&self, root: &Value, bindings: &[usize]) -> bool {
        match &self.visible_when {
            Some((sibling, predicate)) => predicate.holds(lookup(root, &sibling.bind(bindings))),
            None => true,
        }
    }

    /// Create a new text field
    pub fn text(path: &str, label: &str) -> Result<Self, FormError> {
        Self::new(path, label, FieldKind::Text)
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self.kind, FieldKind::Multiline)
    }

    /// Whether typed characters edit this field
    pub fn accepts_text(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Text | FieldKind::Multiline | FieldKind::Secret
        )
    }

    fn choices(&self) -> &[Choice] {
        match &self.kind {
            FieldKind::Dropdown(c) | FieldKind::Radio(c) | FieldKind::CheckboxGroup(c) => c,
            _ => &[],
        }
    }

    /// Push a character to a text field value
    pub fn push_char<T>(&self, state: &mut FormState<T>, at: &FieldPath, c: char) -> Result<(), FormError>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.accepts_text() {
            return Ok(());
        }
        let mut text = state.text(at);
        text.push(c);
        state.set(at, Value::String(text))
    }

    /// Remove the last character from a text field value
    pub fn pop_char<T>(&self, state: &mut FormState<T>, at: &FieldPath) -> Result<(), FormError>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.accepts_text() {
            return Ok(());
        }
        let mut text = state.text(at);
        text.pop();
        state.set(at, Value::String(text))
    }

    /// Cycle a dropdown/radio selection, or flip a checkbox
    pub fn select_next<T>(&self, state: &mut FormState<T>, at: &FieldPath, forward: bool) -> Result<(), FormError>
    where
        T: Serialize + DeserializeOwned,
    {
        match &self.kind {
            FieldKind::Dropdown(choices) | FieldKind::Radio(choices) if !choices.is_empty() => {
                let current = state.text(at);
                let position = choices.iter().position(|c| c.value == current);
                let next = match (position, forward) {
                    (None, true) => 0,
                    (None, false) => choices.len() - 1,
                    (Some(i), true) => (i + 1) % choices.len(),
                    (Some(0), false) => choices.len() - 1,
                    (Some(i), false) => i - 1,
                };
                state.set(at, Value::String(choices[next].value.clone()))
            }
            FieldKind::Checkbox => {
                let checked = matches!(state.get(at), Some(Value::Bool(true)));
                state.set(at, Value::Bool(!checked))
            }
            _ => Ok(()),
        }
    }

    /// Toggle one option of a checkbox group
    pub fn toggle_choice<T>(&self, state: &mut FormState<T>, at: &FieldPath, option: usize) -> Result<(), FormError>
    where
        T: Serialize + DeserializeOwned,
    {
        let FieldKind::CheckboxGroup(choices) = &self.kind else {
            return Ok(());
        };
        let Some(choice) = choices.get(option) else {
            return Ok(());
        };
        let mut selected: Vec<Value> = state
            .get(at)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let value = Value::String(choice.value.clone());
        if let Some(i) = selected.iter().position(|v| *v == value) {
            selected.remove(i);
        } else {
            selected.push(value);
        }
        state.set(at, Value::Array(selected))
    }

    /// Get the display value for rendering
    pub fn display_value<T>(&self, state: &FormState<T>, at: &FieldPath) -> String
    where
        T: Serialize + DeserializeOwned,
    {
        match &self.kind {
            FieldKind::Secret => "•".repeat(state.text(at).chars().count()),
            FieldKind::Checkbox => {
                let checked = matches!(state.get(at), Some(Value::Bool(true)));
                let mark = if checked { "[x]" } else { "[ ]" };
                mark.to_string()
            }
            FieldKind::Dropdown(_) | FieldKind::Radio(_) => {
                let current = state.text(at);
                self.choices()
                    .iter()
                    .find(|c| c.value == current)
                    .map(|c| c.label.clone())
                    .unwrap_or_default()
            }
            FieldKind::CheckboxGroup(choices) => {
                let selected = state.get(at).and_then(Value::as_array);
                choices
                    .iter()
                    .map(|c| {
                        let on = selected
                            .is_some_and(|s| s.iter().any(|v| v.as_str() == Some(c.value.as_str())));
                        format!("[{}] {}", if on { "x" } else { " " }, c.label)
                    })
                    .collect::<Vec<_>>()
                    .join("  ")
            }
            FieldKind::Text | FieldKind::Multiline => state.text(at),
        }
    }
}

/// Ordered set of field definitions for one form
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FormField>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Field definition governing a concrete path
    pub fn lookup(&self, concrete: &FieldPath) -> Option<&FormField> {
        self.fields.iter().find(|f| f.path.matches(concrete))
    }

    /// Concrete fields covered by the given patterns. Plain fields keep
    /// registration order; row fields are grouped row by row.
    pub fn bound<T>(&self, state: &FormState<T>, patterns: &[FieldPath]) -> Vec<BoundField>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut keyed = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            let selected = patterns
                .iter()
                .any(|p| p.matches(&field.path) || field.path.starts_with(p));
            if !selected {
                continue;
            }
            let group = field
                .path
                .collection_root()
                .and_then(|root| {
                    self.fields
                        .iter()
                        .position(|f| f.path.collection_root().as_ref() == Some(&root))
                })
                .unwrap_or(index);
            for path in state.expand(&field.path) {
                let rows = field.path.bindings(&path);
                if !field.is_visible(state.values(), &rows) {
                    continue;
                }
                keyed.push(((group, rows, index), BoundField { field: index, path }));
            }
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, bound)| bound).collect()
    }

    pub fn field(&self, bound: &BoundField) -> &FormField {
        &self.fields[bound.field]
    }

    /// Error surfaced for a concrete field
    pub fn error<'a>(&self, errors: &'a ValidationErrorMap, at: &FieldPath) -> Option<&'a str> {
        errors.get(&at.to_string()).map(String::as_str)
    }
}

/// A registry field bound to one concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundField {
    field: usize,
    pub path: FieldPath,
}

/// Trait for cycling focus through a form's inputs
pub trait Focus {
    fn focus_count(&self) -> usize;
    fn focused(&self) -> usize;
    fn set_focused(&mut self, index: usize);
    fn next_focus(&mut self) {
        let count = self.focus_count();
        if count == 0 {
            return;
        }
        let current = self.focused();
        self.set_focused((current + 1) % count);
    }
    fn prev_focus(&mut self) {
        let count = self.focus_count();
        if count == 0 {
            return;
        }
        let current = self.focused();
        if current == 0 {
            self.set_focused(count - 1);
        } else {
            self.set_focused(current - 1);
        }
    }
}
