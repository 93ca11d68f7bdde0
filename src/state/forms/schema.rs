//! Declarative validation rules evaluated against a form snapshot

use super::form_state::{lookup, FormError, FormState};
use super::path::FieldPath;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Concrete field path -> message. A missing entry means the field is valid.
pub type ValidationErrorMap = BTreeMap<String, String>;

/// Condition on a sibling field's current value
#[derive(Debug, Clone)]
pub enum Predicate {
    Equals(String),
    NotEquals(String),
    IsTrue,
}

impl Predicate {
    pub fn holds(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Equals(expected) => value_text(value) == *expected,
            Predicate::NotEquals(expected) => value_text(value) != *expected,
            Predicate::IsTrue => matches!(value, Some(Value::Bool(true))),
        }
    }
}

/// A single check on a field value
#[derive(Debug, Clone)]
pub enum Check {
    Required(String),
    MinLen(usize, String),
    MaxLen(usize, String),
    Pattern(Regex, String),
    Number {
        positive: bool,
        not_a_number: String,
        not_positive: String,
    },
    Integer {
        non_negative: bool,
        message: String,
    },
    OneOf(Vec<String>, String),
    MinItems(usize, String),
    /// Must equal the value at another path (wildcards bound like the field's own)
    Matches(FieldPath, String),
}

impl Check {
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, FormError> {
        let regex = Regex::new(pattern).map_err(|e| FormError::InvalidRule {
            path: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Check::Pattern(regex, message.into()))
    }

    pub fn email(message: impl Into<String>) -> Result<Self, FormError> {
        Self::pattern(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$", message)
    }

    pub fn url(message: impl Into<String>) -> Result<Self, FormError> {
        Self::pattern(r"^https?://[^\s/$.?#][^\s]*\.[^\s]+$", message)
    }

    fn evaluate(&self, root: &Value, bindings: &[usize], value: Option<&Value>) -> Option<String> {
        if let Check::Required(message) = self {
            return is_empty(value).then(|| message.clone());
        }
        if let Check::MinItems(min, message) = self {
            let len = value.and_then(Value::as_array).map(Vec::len).unwrap_or(0);
            return (len < *min).then(|| message.clone());
        }
        if is_empty(value) {
            return None;
        }

        let text = value_text(value);
        let trimmed = text.trim();
        match self {
            Check::MinLen(min, message) => (trimmed.chars().count() < *min).then(|| message.clone()),
            Check::MaxLen(max, message) => (trimmed.chars().count() > *max).then(|| message.clone()),
            Check::Pattern(regex, message) => (!regex.is_match(trimmed)).then(|| message.clone()),
            Check::Number {
                positive,
                not_a_number,
                not_positive,
            } => match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => (*positive && n <= 0.0).then(|| not_positive.clone()),
                _ => Some(not_a_number.clone()),
            },
            Check::Integer {
                non_negative,
                message,
            } => match trimmed.parse::<i64>() {
                Ok(n) => (*non_negative && n < 0).then(|| message.clone()),
                Err(_) => Some(message.clone()),
            },
            Check::OneOf(allowed, message) => {
                (!allowed.iter().any(|a| a == trimmed)).then(|| message.clone())
            }
            Check::Matches(other, message) => {
                let other = lookup(root, &other.bind(bindings));
                (value_text(other) != text).then(|| message.clone())
            }
            Check::Required(_) | Check::MinItems(..) => None,
        }
    }
}

/// `Always(check)` or a check that only applies while a sibling satisfies a predicate
#[derive(Debug, Clone)]
pub enum Rule {
    Always(Check),
    When {
        sibling: FieldPath,
        predicate: Predicate,
        check: Check,
    },
}

impl Rule {
    fn applies(&self, root: &Value, bindings: &[usize]) -> bool {
        match self {
            Rule::Always(_) => true,
            Rule::When {
                sibling, predicate, ..
            } => predicate.holds(lookup(root, &sibling.bind(bindings))),
        }
    }

    fn check(&self) -> &Check {
        match self {
            Rule::Always(check) | Rule::When { check, .. } => check,
        }
    }
}

/// Make every rule conditional on a sibling's value
pub fn when(sibling: &str, predicate: Predicate, rules: Vec<Rule>) -> Result<Vec<Rule>, FormError> {
    let sibling = FieldPath::parse(sibling)?;
    Ok(rules
        .into_iter()
        .map(|rule| match rule {
            Rule::Always(check) => Rule::When {
                sibling: sibling.clone(),
                predicate: predicate.clone(),
                check,
            },
            conditional => conditional,
        })
        .collect())
}

/// Rule table for one form
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(FieldPath, Vec<Rule>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rules for a field path (may contain `*` for array rows)
    pub fn field(mut self, path: &str, rules: Vec<Rule>) -> Result<Self, FormError> {
        let path = FieldPath::parse(path)?;
        match self.fields.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, existing)) => existing.extend(rules),
            None => self.fields.push((path, rules)),
        }
        Ok(self)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.iter().map(|(path, _)| path)
    }

    /// Validate only the fields selected by `targets`. A target selects a
    /// concrete field when it matches the field or is one of its ancestors.
    pub fn validate<T>(&self, state: &FormState<T>, targets: &[FieldPath]) -> ValidationErrorMap
    where
        T: Serialize + DeserializeOwned,
    {
        self.validate_where(state, |concrete| {
            targets
                .iter()
                .any(|t| t.matches(concrete) || concrete.starts_with(t))
        })
    }

    pub fn validate_all<T>(&self, state: &FormState<T>) -> ValidationErrorMap
    where
        T: Serialize + DeserializeOwned,
    {
        self.validate_where(state, |_| true)
    }

    fn validate_where<T, F>(&self, state: &FormState<T>, selected: F) -> ValidationErrorMap
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&FieldPath) -> bool,
    {
        let root = state.values();
        let mut errors = ValidationErrorMap::new();
        for (pattern, rules) in &self.fields {
            for concrete in state.expand(pattern) {
                if !selected(&concrete) {
                    continue;
                }
                let bindings = pattern.bindings(&concrete);
                let value = state.get(&concrete);
                let failure = rules
                    .iter()
                    .filter(|rule| rule.applies(root, &bindings))
                    .find_map(|rule| rule.check().evaluate(root, &bindings, value));
                if let Some(message) = failure {
                    tracing::debug!(field = %concrete, %message, "validation failed");
                    errors.insert(concrete.to_string(), message);
                }
            }
        }
        errors
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

/// Rule sets shared by the storefront forms
pub mod rules {
    use super::{Check, FormError, Rule};

    pub const NAME_MAX_LEN: usize = 50;

    pub fn required(label: &str) -> Vec<Rule> {
        vec![Rule::Always(Check::Required(format!("{label} is required")))]
    }

    /// Letters and spaces only, bounded length
    pub fn name(label: &str) -> Result<Vec<Rule>, FormError> {
        Ok(vec![
            Rule::Always(Check::Required(format!("{label} is required"))),
            Rule::Always(Check::pattern(
                r"^[A-Za-z ]+$",
                format!("{label} must contain only letters and spaces"),
            )?),
            Rule::Always(Check::MaxLen(
                NAME_MAX_LEN,
                format!("{label} must be at most {NAME_MAX_LEN} characters"),
            )),
        ])
    }

    pub fn phone() -> Result<Vec<Rule>, FormError> {
        Ok(vec![
            Rule::Always(Check::Required("Phone number is required".into())),
            Rule::Always(Check::pattern(
                r"^[0-9]{10}$",
                "Phone number must be exactly 10 digits",
            )?),
        ])
    }

    pub fn postal_code() -> Result<Vec<Rule>, FormError> {
        Ok(vec![
            Rule::Always(Check::Required("Postal code is required".into())),
            Rule::Always(Check::pattern(
                r"^[0-9]{6}$",
                "Postal code must be exactly 6 digits",
            )?),
        ])
    }

    pub fn price() -> Vec<Rule> {
        vec![
            Rule::Always(Check::Required("Price is required".into())),
            Rule::Always(Check::Number {
                positive: true,
                not_a_number: "Price must be a number".into(),
                not_positive: "Price must be positive".into(),
            }),
        ]
    }

    pub fn stock() -> Vec<Rule> {
        vec![
            Rule::Always(Check::Required("Stock is required".into())),
            Rule::Always(Check::Integer {
                non_negative: true,
                message: "Stock must be a non-negative integer".into(),
            }),
        ]
    }

    pub fn email() -> Result<Vec<Rule>, FormError> {
        Ok(vec![
            Rule::Always(Check::Required("Email is required".into())),
            Rule::Always(Check::email("Enter a valid email address")?),
        ])
    }

    /// Optional URL
    pub fn url(label: &str) -> Result<Vec<Rule>, FormError> {
        Ok(vec![Rule::Always(Check::url(format!(
            "{label} must be a valid URL"
        ))?)])
    }
}
