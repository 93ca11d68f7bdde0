//! Form state: a JSON value tree addressed by field path

use super::path::{FieldPath, Segment};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use thiserror::Error;

/// Key of the transient per-row "saved" flag
pub const SAVED_FLAG: &str = "isSaved";

/// Errors raised by form state and form definitions
#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid field path: '{0}'")]
    InvalidPath(String),

    #[error("'{0}' is not an object")]
    NotAnObject(String),

    #[error("index {index} out of range at '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("field '{0}' is assigned to more than one step")]
    OverlappingStep(String),

    #[error("a wizard needs at least one step")]
    NoSteps,

    #[error("invalid rule for '{path}': {message}")]
    InvalidRule { path: String, message: String },

    #[error("cannot convert '{path}': {message}")]
    Conversion { path: String, message: String },

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// All current field values of one form instance.
///
/// `T` is the form model the tree round-trips to; values stay loosely typed
/// (text inputs hold strings) until [`FormState::typed`] is called.
#[derive(Debug, Clone)]
pub struct FormState<T> {
    values: Value,
    defaults: Value,
    _model: PhantomData<fn() -> T>,
}

impl<T> FormState<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a form state seeded with the given defaults
    pub fn new(defaults: &T) -> Result<Self, FormError> {
        let defaults = serde_json::to_value(defaults)?;
        if !defaults.is_object() {
            return Err(FormError::NotAnObject("<root>".to_string()));
        }
        Ok(Self {
            values: defaults.clone(),
            defaults,
            _model: PhantomData,
        })
    }

    /// Replace current values with an existing record (edit mode).
    /// Defaults are kept so a later reset still returns to a blank form.
    pub fn load(&mut self, record: &T) -> Result<(), FormError> {
        self.values = serde_json::to_value(record)?;
        Ok(())
    }

    /// Replace current values with a raw tree (a saved draft). The tree
    /// must convert into the form model.
    pub fn load_value(&mut self, value: Value) -> Result<(), FormError> {
        let mut probe = value.clone();
        strip_saved_flags(&mut probe);
        serde_json::from_value::<T>(probe)?;
        if !value.is_object() {
            return Err(FormError::NotAnObject("<root>".to_string()));
        }
        self.values = value;
        Ok(())
    }

    /// Current values without transient row flags
    pub fn snapshot(&self) -> Value {
        let mut payload = self.values.clone();
        strip_saved_flags(&mut payload);
        payload
    }

    /// Convert the current values into the form model
    pub fn typed(&self) -> Result<T, FormError> {
        Ok(serde_json::from_value(self.snapshot())?)
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        lookup(&self.values, path)
    }

    /// Text view of a leaf; missing and non-string leaves render as their JSON text
    pub fn text(&self, path: &FieldPath) -> String {
        match self.get(path) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn default_at(&self, path: &FieldPath) -> Option<&Value> {
        lookup(&self.defaults, path)
    }

    /// Write a value, creating intermediate objects as needed
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        let slot = slot_mut(&mut self.values, path)?;
        *slot = value;
        Ok(())
    }

    /// Mutable access to an existing array (collections)
    pub fn array_mut(&mut self, path: &FieldPath) -> Result<&mut Vec<Value>, FormError> {
        let slot = slot_mut(&mut self.values, path)?;
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut()
            .ok_or_else(|| FormError::InvalidPath(path.to_string()))
    }

    pub fn array_len(&self, path: &FieldPath) -> usize {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Restore one path to its default, or to a blank value of the same shape
    pub fn reset_path(&mut self, path: &FieldPath) -> Result<(), FormError> {
        let restored = match self.default_at(path) {
            Some(default) => default.clone(),
            None => self.get(path).map(blank_like).unwrap_or(Value::Null),
        };
        self.set(path, restored)
    }

    /// Restore every field to its default
    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
    }

    /// Expand a path pattern into the concrete paths present in the current values.
    /// Non-pattern paths always expand to themselves.
    pub fn expand(&self, pattern: &FieldPath) -> Vec<FieldPath> {
        if !pattern.is_pattern() {
            return vec![pattern.clone()];
        }
        let mut out = Vec::new();
        expand_into(
            Some(&self.values),
            pattern.segments(),
            FieldPath::root(),
            &mut out,
        );
        out
    }
}

fn expand_into(value: Option<&Value>, rest: &[Segment], prefix: FieldPath, out: &mut Vec<FieldPath>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(prefix);
        return;
    };
    match head {
        Segment::Key(key) => {
            let child = value.and_then(|v| v.get(key.as_str()));
            expand_into(child, tail, prefix.key(key), out);
        }
        Segment::Index(index) => {
            if let Some(child) = value.and_then(|v| v.get(*index)) {
                expand_into(Some(child), tail, prefix.index(*index), out);
            }
        }
        Segment::Any => {
            if let Some(items) = value.and_then(Value::as_array) {
                for (index, child) in items.iter().enumerate() {
                    expand_into(Some(child), tail, prefix.index(index), out);
                }
            }
        }
    }
}

pub(super) fn lookup<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            Segment::Key(key) => current.get(key.as_str())?,
            Segment::Index(index) => current.get(*index)?,
            Segment::Any => return None,
        };
    }
    Some(current)
}

fn slot_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Result<&'a mut Value, FormError> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            Segment::Key(key) => {
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let object = current
                    .as_object_mut()
                    .ok_or_else(|| FormError::NotAnObject(path.to_string()))?;
                object.entry(key.clone()).or_insert(Value::Null)
            }
            Segment::Index(index) => {
                let items = current
                    .as_array_mut()
                    .ok_or_else(|| FormError::InvalidPath(path.to_string()))?;
                let len = items.len();
                items.get_mut(*index).ok_or(FormError::IndexOutOfRange {
                    path: path.to_string(),
                    index: *index,
                    len,
                })?
            }
            Segment::Any => return Err(FormError::InvalidPath(path.to_string())),
        };
    }
    Ok(current)
}

fn blank_like(value: &Value) -> Value {
    match value {
        Value::String(_) => Value::String(String::new()),
        Value::Bool(_) => Value::Bool(false),
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Object(_) => Value::Object(Map::new()),
        Value::Number(_) | Value::Null => Value::Null,
    }
}

/// Remove transient row flags before the tree leaves the form layer
pub fn strip_saved_flags(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove(SAVED_FLAG);
            map.values_mut().for_each(strip_saved_flags);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_saved_flags),
        _ => {}
    }
}

/// Set the saved flag on every row object inside every array of the tree
pub fn mark_all_rows_saved(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(mark_all_rows_saved),
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Object(row) = item {
                    row.insert(SAVED_FLAG.to_string(), Value::Bool(true));
                }
                mark_all_rows_saved(item);
            }
        }
        _ => {}
    }
}

impl<T> FormState<T> {
    pub(super) fn values_mut(&mut self) -> &mut Value {
        &mut self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Warehouse {
        city: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Model {
        name: String,
        accepts_returns: bool,
        warehouses: Vec<Warehouse>,
    }

    impl Default for Model {
        fn default() -> Self {
            Self {
                name: String::new(),
                accepts_returns: false,
                warehouses: vec![Warehouse::default()],
            }
        }
    }

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_new_seeds_defaults() {
        let state = FormState::new(&Model::default()).unwrap();
        assert_eq!(state.text(&p("name")), "");
        assert_eq!(state.array_len(&p("warehouses")), 1);
    }

    #[test]
    fn test_set_and_get_nested() {
        let mut state = FormState::new(&Model::default()).unwrap();
        state.set(&p("warehouses.0.city"), json!("Pune")).unwrap();
        assert_eq!(state.text(&p("warehouses.0.city")), "Pune");
        assert_eq!(state.typed().unwrap().warehouses[0].city, "Pune");
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut state = FormState::new(&Model::default()).unwrap();
        state.set(&p("extra.nested.value"), json!("x")).unwrap();
        assert_eq!(state.text(&p("extra.nested.value")), "x");
    }

    #[test]
    fn test_set_past_end_of_array_fails() {
        let mut state = FormState::new(&Model::default()).unwrap();
        let err = state.set(&p("warehouses.3.city"), json!("x")).unwrap_err();
        assert!(matches!(err, FormError::IndexOutOfRange { index: 3, len: 1, .. }));
    }

    #[test]
    fn test_expand_wildcards() {
        let mut state = FormState::new(&Model::default()).unwrap();
        state
            .array_mut(&p("warehouses"))
            .unwrap()
            .push(json!({"city": ""}));
        let paths: Vec<String> = state
            .expand(&p("warehouses.*.city"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, vec!["warehouses.0.city", "warehouses.1.city"]);
        assert_eq!(state.expand(&p("name")), vec![p("name")]);
    }

    #[test]
    fn test_reset_path_uses_default_or_blank() {
        let mut state = FormState::new(&Model::default()).unwrap();
        state.set(&p("name"), json!("Lamp")).unwrap();
        state.reset_path(&p("name")).unwrap();
        assert_eq!(state.text(&p("name")), "");

        state
            .array_mut(&p("warehouses"))
            .unwrap()
            .push(json!({"city": "Delhi"}));
        state.reset_path(&p("warehouses.1.city")).unwrap();
        assert_eq!(state.text(&p("warehouses.1.city")), "");
    }

    #[test]
    fn test_typed_ignores_saved_flags() {
        let mut state = FormState::new(&Model::default()).unwrap();
        mark_all_rows_saved(state.values_mut());
        assert_eq!(state.get(&p("warehouses.0.isSaved")), Some(&json!(true)));
        let model = state.typed().unwrap();
        assert_eq!(model.warehouses.len(), 1);
    }

    #[test]
    fn test_strip_saved_flags_recurses() {
        let mut value = json!({
            "businesses": [{"isSaved": true, "products": [{"isSaved": false, "name": "a"}]}]
        });
        strip_saved_flags(&mut value);
        assert_eq!(value, json!({"businesses": [{"products": [{"name": "a"}]}]}));
    }

    #[test]
    fn test_load_value_checks_shape() {
        let mut state = FormState::new(&Model::default()).unwrap();
        let err = state.load_value(json!({"name": 5})).unwrap_err();
        assert!(matches!(err, FormError::Serde(_)));

        state
            .load_value(json!({"name": "Lamp", "warehouses": [{"city": "Pune", "isSaved": true}]}))
            .unwrap();
        assert_eq!(state.text(&p("name")), "Lamp");
        assert_eq!(
            state.snapshot(),
            json!({"name": "Lamp", "warehouses": [{"city": "Pune"}]})
        );
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = FormState::new(&Model::default()).unwrap();
        state.set(&p("name"), json!("Lamp")).unwrap();
        state.set(&p("acceptsReturns"), json!(true)).unwrap();
        state.reset();
        assert_eq!(state.typed().unwrap(), Model::default());
    }
}
