//! Repeatable sub-records (warehouses, businesses, products per business)

use super::form_state::{FormError, FormState, SAVED_FLAG};
use super::path::FieldPath;
use super::schema::{Schema, ValidationErrorMap};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a row operation was rejected
#[derive(Debug, Error)]
pub enum RowError {
    #[error("You can add at most {max} {label}")]
    Full { label: String, max: usize },

    #[error("Complete the current {label} entry before adding another")]
    PreviousRowInvalid {
        label: String,
        errors: ValidationErrorMap,
    },

    #[error("At least {min} {label} required")]
    AtMinimum { label: String, min: usize },

    #[error("No {label} entry at position {index}")]
    OutOfRange { label: String, index: usize },

    #[error("Fix the highlighted {label} fields")]
    Invalid {
        label: String,
        errors: ValidationErrorMap,
    },

    #[error("Move focus into a list entry first")]
    NoTarget,

    #[error(transparent)]
    Form(#[from] FormError),
}

impl RowError {
    /// Field errors carried by the rejection, if any
    pub fn field_errors(&self) -> Option<&ValidationErrorMap> {
        match self {
            RowError::PreviousRowInvalid { errors, .. } | RowError::Invalid { errors, .. } => {
                Some(errors)
            }
            _ => None,
        }
    }
}

/// A bounded, ordered collection of rows inside a form
#[derive(Debug, Clone)]
pub struct Collection {
    /// Path of the array; may contain wildcards for nested collections
    pub pattern: FieldPath,
    /// Plural label used in messages ("warehouses")
    pub label: String,
    pub min_rows: usize,
    pub max_rows: usize,
    default_row: Value,
}

impl Collection {
    pub fn new(
        pattern: &str,
        label: &str,
        min_rows: usize,
        max_rows: usize,
        default_row: Value,
    ) -> Result<Self, FormError> {
        if !default_row.is_object() {
            return Err(FormError::NotAnObject(pattern.to_string()));
        }
        Ok(Self {
            pattern: FieldPath::parse(pattern)?,
            label: label.to_string(),
            min_rows,
            max_rows,
            default_row,
        })
    }

    /// A fresh, unsaved row
    pub fn blank_row(&self) -> Value {
        let mut row = self.default_row.clone();
        if let Value::Object(map) = &mut row {
            map.insert(SAVED_FLAG.to_string(), Value::Bool(false));
        }
        row
    }

    /// Concrete array paths this collection currently covers
    pub fn instances<T>(&self, state: &FormState<T>) -> Vec<FieldPath>
    where
        T: Serialize + DeserializeOwned,
    {
        state.expand(&self.pattern)
    }

    pub fn len<T>(&self, state: &FormState<T>, at: &FieldPath) -> usize
    where
        T: Serialize + DeserializeOwned,
    {
        state.array_len(at)
    }

    pub fn is_saved<T>(&self, state: &FormState<T>, at: &FieldPath, index: usize) -> bool
    where
        T: Serialize + DeserializeOwned,
    {
        matches!(
            state.get(&at.index(index).key(SAVED_FLAG)),
            Some(Value::Bool(true))
        )
    }

    /// Add a row. Rejected at capacity, or while the last row is invalid.
    pub fn append<T>(
        &self,
        state: &mut FormState<T>,
        schema: &Schema,
        at: &FieldPath,
    ) -> Result<usize, RowError>
    where
        T: Serialize + DeserializeOwned,
    {
        let len = self.len(state, at);
        if len >= self.max_rows {
            tracing::warn!(collection = %at, max = self.max_rows, "row limit reached");
            return Err(RowError::Full {
                label: self.label.clone(),
                max: self.max_rows,
            });
        }
        if len > 0 {
            let errors = schema.validate(state, &[at.index(len - 1)]);
            if !errors.is_empty() {
                tracing::warn!(collection = %at, "previous row incomplete");
                return Err(RowError::PreviousRowInvalid {
                    label: self.label.clone(),
                    errors,
                });
            }
        }
        state.array_mut(at)?.push(self.blank_row());
        tracing::debug!(collection = %at, index = len, "row appended");
        Ok(len)
    }

    /// Remove a row unless that would drop below the minimum
    pub fn remove<T>(&self, state: &mut FormState<T>, at: &FieldPath, index: usize) -> Result<(), RowError>
    where
        T: Serialize + DeserializeOwned,
    {
        let len = self.len(state, at);
        self.check_index(index, len)?;
        if len <= self.min_rows {
            tracing::warn!(collection = %at, min = self.min_rows, "row minimum reached");
            return Err(RowError::AtMinimum {
                label: self.label.clone(),
                min: self.min_rows,
            });
        }
        state.array_mut(at)?.remove(index);
        Ok(())
    }

    /// Validate one row and freeze it when valid
    pub fn save<T>(
        &self,
        state: &mut FormState<T>,
        schema: &Schema,
        at: &FieldPath,
        index: usize,
    ) -> Result<(), RowError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.check_index(index, self.len(state, at))?;
        let row = at.index(index);
        let errors = schema.validate(state, &[row.clone()]);
        if !errors.is_empty() {
            return Err(RowError::Invalid {
                label: self.label.clone(),
                errors,
            });
        }
        state.set(&row.key(SAVED_FLAG), Value::Bool(true))?;
        Ok(())
    }

    /// Re-open a saved row for editing
    pub fn edit<T>(&self, state: &mut FormState<T>, at: &FieldPath, index: usize) -> Result<(), RowError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.check_index(index, self.len(state, at))?;
        state.set(&at.index(index).key(SAVED_FLAG), Value::Bool(false))?;
        Ok(())
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), RowError> {
        if index >= len {
            return Err(RowError::OutOfRange {
                label: self.label.clone(),
                index,
            });
        }
        Ok(())
    }
}
