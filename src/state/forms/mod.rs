//! Form domain layer
//!
//! Multi-step wizards over a JSON-backed form state: field paths, rule
//! schemas, repeatable row collections and the concrete storefront forms.

mod array;
mod auth;
mod field;
mod form_state;
mod path;
mod registration;
mod schema;
mod sell_product;
mod steps;
mod wizard;

pub use array::RowError;
pub use auth::{login_form, signup_form, LoginForm, SignupForm};
pub use field::{BoundField, FieldKind, Focus};
pub use form_state::FormError;
pub use path::FieldPath;
pub use registration::{registration_wizard, RegistrationForm};
pub use sell_product::{sell_product_wizard, SellProductForm};
pub use wizard::{SubmitError, SubmitMode, SubmitOutcome, Wizard, WizardPhase};
