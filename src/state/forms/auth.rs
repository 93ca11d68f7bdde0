//! Login and signup forms

use super::field::{FieldKind, FieldRegistry, FormField};
use super::form_state::FormError;
use super::path::FieldPath;
use super::schema::{rules, Check, Rule, Schema};
use super::steps::StepDefinition;
use super::wizard::Wizard;
use crate::api::{Credentials, SignupRequest};
use serde::{Deserialize, Serialize};

pub const PASSWORD_MIN_LEN: usize = 8;

fn password_rules() -> Vec<Rule> {
    vec![
        Rule::Always(Check::Required("Password is required".into())),
        Rule::Always(Check::MinLen(
            PASSWORD_MIN_LEN,
            format!("Password must be at least {PASSWORD_MIN_LEN} characters"),
        )),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn to_credentials(&self) -> Credentials {
        Credentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn to_signup(&self) -> SignupRequest {
        SignupRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

pub fn login_form() -> Result<Wizard<LoginForm>, FormError> {
    let schema = Schema::new()
        .field("email", rules::email()?)?
        .field("password", password_rules())?;
    let registry = FieldRegistry::new()
        .register(FormField::text("email", "Email")?)
        .register(FormField::new("password", "Password", FieldKind::Secret)?);
    Wizard::new(
        "Log in",
        &LoginForm::default(),
        schema,
        registry,
        vec![StepDefinition::new("Log in", &["email", "password"])?],
        Vec::new(),
    )
}

pub fn signup_form() -> Result<Wizard<SignupForm>, FormError> {
    let mut confirm = vec![Rule::Always(Check::Required(
        "Confirm your password".into(),
    ))];
    confirm.push(Rule::Always(Check::Matches(
        FieldPath::parse("password")?,
        "Passwords do not match".into(),
    )));

    let schema = Schema::new()
        .field("name", rules::name("Name")?)?
        .field("email", rules::email()?)?
        .field("phone", rules::phone()?)?
        .field("password", password_rules())?
        .field("confirmPassword", confirm)?;
    let registry = FieldRegistry::new()
        .register(FormField::text("name", "Name")?)
        .register(FormField::text("email", "Email")?)
        .register(FormField::text("phone", "Phone")?)
        .register(FormField::new("password", "Password", FieldKind::Secret)?)
        .register(FormField::new(
            "confirmPassword",
            "Confirm password",
            FieldKind::Secret,
        )?);
    Wizard::new(
        "Sign up",
        &SignupForm::default(),
        schema,
        registry,
        vec![StepDefinition::new(
            "Sign up",
            &["name", "email", "phone", "password", "confirmPassword"],
        )?],
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, AuthUser, MockStorefrontService, StorefrontService};
    use crate::state::forms::wizard::{SubmitError, SubmitOutcome};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_short_password_rejected() {
        let mut form = login_form().unwrap();
        form.set_value(&p("email"), json!("ana@example.com")).unwrap();
        form.set_value(&p("password"), json!("short")).unwrap();
        assert!(!form.validate_active());
        assert_eq!(
            form.error_for(&p("password")),
            Some("Password must be at least 8 characters")
        );
        assert_eq!(form.error_for(&p("email")), None);
    }

    #[test]
    fn test_signup_passwords_must_match() {
        let mut form = signup_form().unwrap();
        for (path, value) in [
            ("name", "Ana Rao"),
            ("email", "ana@example.com"),
            ("phone", "9876543210"),
            ("password", "correct-horse"),
            ("confirmPassword", "correct-horsf"),
        ] {
            form.set_value(&p(path), json!(value)).unwrap();
        }
        assert!(!form.validate_active());
        assert_eq!(
            form.error_for(&p("confirmPassword")),
            Some("Passwords do not match")
        );

        form.set_value(&p("confirmPassword"), json!("correct-horse"))
            .unwrap();
        assert!(form.validate_active());
    }

    #[test]
    fn test_password_field_is_masked() {
        let form = login_form().unwrap();
        let password = form
            .visible_fields()
            .into_iter()
            .find(|b| b.path == p("password"))
            .unwrap();
        assert!(matches!(form.field(&password).kind, FieldKind::Secret));
    }

    #[tokio::test]
    async fn test_login_submits_trimmed_credentials() {
        let mut service = MockStorefrontService::new();
        service
            .expect_login()
            .withf(|c| c.email == "ana@example.com" && c.password == "hunter2hunter2")
            .times(1)
            .returning(|c| {
                Ok(AuthUser {
                    id: "u1".into(),
                    name: "Ana".into(),
                    email: c.email,
                    token: "t".into(),
                })
            });
        let service: &dyn StorefrontService = &service;

        let mut form = login_form().unwrap();
        form.set_value(&p("email"), json!(" ana@example.com ")).unwrap();
        form.set_value(&p("password"), json!("hunter2hunter2")).unwrap();
        let outcome = form
            .submit(|login| async move { Ok(service.login(login.to_credentials()).await?) })
            .await
            .unwrap();
        let SubmitOutcome::Reset(user) = outcome else {
            panic!("login runs in create mode");
        };
        assert_eq!(user.id, "u1");
        assert_eq!(form.state().text(&p("email")), "");
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_input() {
        let mut service = MockStorefrontService::new();
        service.expect_login().returning(|_| {
            Err(ApiError::Rejected {
                status: 401,
                custom_message: Some("Invalid email or password".into()),
            })
        });
        let service: &dyn StorefrontService = &service;

        let mut form = login_form().unwrap();
        form.set_value(&p("email"), json!("ana@example.com")).unwrap();
        form.set_value(&p("password"), json!("wrong-password")).unwrap();
        let err = form
            .submit(|login| async move { Ok(service.login(login.to_credentials()).await?) })
            .await
            .unwrap_err();
        let SubmitError::Service(api) = err else {
            panic!("expected service error");
        };
        assert_eq!(api.user_message(), "Invalid email or password");
        assert_eq!(form.state().text(&p("email")), "ana@example.com");
    }
}
