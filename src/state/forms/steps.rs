//! Step controller: partitions a form's fields into wizard pages

use super::form_state::{FormError, FormState};
use super::path::FieldPath;
use super::schema::{Schema, ValidationErrorMap};
use serde::{de::DeserializeOwned, Serialize};

/// One wizard page and the field patterns it owns
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub title: String,
    pub fields: Vec<FieldPath>,
}

impl StepDefinition {
    pub fn new(title: &str, fields: &[&str]) -> Result<Self, FormError> {
        let fields = fields
            .iter()
            .map(|raw| FieldPath::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            title: title.to_string(),
            fields,
        })
    }

    fn owns(&self, path: &FieldPath) -> bool {
        self.fields
            .iter()
            .any(|f| path.starts_with(f) || f.starts_with(path))
    }
}

/// Indicators shown by the stepper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStatus {
    pub has_error: bool,
    pub is_complete: bool,
}

#[derive(Debug, Clone)]
pub struct StepController {
    steps: Vec<StepDefinition>,
    active: usize,
    status: Vec<StepStatus>,
    errors: Vec<ValidationErrorMap>,
}

impl StepController {
    /// Fails when no steps are given or a field is claimed by two steps
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, FormError> {
        if steps.is_empty() {
            return Err(FormError::NoSteps);
        }
        for (i, step) in steps.iter().enumerate() {
            for later in &steps[i + 1..] {
                if let Some(field) = step.fields.iter().find(|f| later.owns(f)) {
                    return Err(FormError::OverlappingStep(field.to_string()));
                }
            }
        }
        let count = steps.len();
        Ok(Self {
            steps,
            active: 0,
            status: vec![StepStatus::default(); count],
            errors: vec![ValidationErrorMap::new(); count],
        })
    }

    pub fn count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_step(&self) -> &StepDefinition {
        &self.steps[self.active]
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 == self.steps.len()
    }

    pub fn status(&self, index: usize) -> StepStatus {
        self.status.get(index).copied().unwrap_or_default()
    }

    /// Errors recorded by the last validation of a step
    pub fn errors(&self, index: usize) -> Option<&ValidationErrorMap> {
        self.errors.get(index)
    }

    /// Validate only the fields of one step and record its indicators
    pub fn validate_step<T>(&mut self, index: usize, state: &FormState<T>, schema: &Schema) -> bool
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(step) = self.steps.get(index) else {
            return true;
        };
        let errors = schema.validate(state, &step.fields);
        let valid = errors.is_empty();
        tracing::debug!(step = index, title = %step.title, errors = errors.len(), "step validated");
        self.status[index] = StepStatus {
            has_error: !valid,
            is_complete: valid,
        };
        self.errors[index] = errors;
        valid
    }

    /// Re-validate every step without moving
    pub fn refresh<T>(&mut self, state: &FormState<T>, schema: &Schema) -> bool
    where
        T: Serialize + DeserializeOwned,
    {
        (0..self.steps.len()).fold(true, |all, i| self.validate_step(i, state, schema) && all)
    }

    /// Validate the active step, then advance even when it is invalid
    pub fn go_next<T>(&mut self, state: &FormState<T>, schema: &Schema)
    where
        T: Serialize + DeserializeOwned,
    {
        self.validate_step(self.active, state, schema);
        self.active = (self.active + 1).min(self.steps.len() - 1);
    }

    pub fn go_back<T>(&mut self, state: &FormState<T>, schema: &Schema)
    where
        T: Serialize + DeserializeOwned,
    {
        self.validate_step(self.active, state, schema);
        self.active = self.active.saturating_sub(1);
    }

    pub fn go_to_step<T>(&mut self, target: usize, state: &FormState<T>, schema: &Schema)
    where
        T: Serialize + DeserializeOwned,
    {
        if target == self.active || target >= self.steps.len() {
            return;
        }
        self.validate_step(self.active, state, schema);
        self.active = target;
    }

    /// Restore a step's fields to their defaults. Row patterns reset
    /// their whole collection.
    pub fn reset_step<T>(&mut self, index: usize, state: &mut FormState<T>)
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(step) = self.steps.get(index) else {
            return;
        };
        for pattern in &step.fields {
            let target = pattern.row_collection().unwrap_or_else(|| pattern.clone());
            for concrete in state.expand(&target) {
                if let Err(e) = state.reset_path(&concrete) {
                    tracing::warn!(field = %concrete, error = %e, "failed to reset field");
                }
            }
        }
        self.status[index] = StepStatus::default();
        self.errors[index].clear();
    }

    /// Go back to the first step and clear all indicators
    pub fn restart(&mut self) {
        self.active = 0;
        self.status.iter_mut().for_each(|s| *s = StepStatus::default());
        self.errors.iter_mut().for_each(ValidationErrorMap::clear);
    }
}
