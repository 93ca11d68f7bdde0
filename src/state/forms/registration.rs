//! Seller registration wizard with nested businesses and products

use super::array::Collection;
use super::field::{Choice, FieldKind, FieldRegistry, FormField};
use super::form_state::FormError;
use super::schema::{rules, when, Check, Predicate, Rule, Schema};
use super::steps::StepDefinition;
use super::wizard::Wizard;
use crate::api::{
    Address, Business, BusinessProduct, PaymentDetails, SellerRegistration, SellerType,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MIN_BUSINESSES: usize = 1;
pub const MAX_BUSINESSES: usize = 3;
pub const MAX_PRODUCTS_PER_BUSINESS: usize = 10;

const BUSINESS_CATEGORIES: [(&str, &str); 5] = [
    ("electronics", "Electronics"),
    ("fashion", "Fashion"),
    ("home", "Home & Kitchen"),
    ("grocery", "Grocery"),
    ("other", "Other"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductRow {
    pub name: String,
    pub price: String,
    pub stock: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessRow {
    pub name: String,
    pub category: String,
    pub website: String,
    pub products: Vec<ProductRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressFields {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

/// Form model of the registration wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub seller_type: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub tax_id: String,
    pub address: AddressFields,
    pub businesses: Vec<BusinessRow>,
    pub payment_method: String,
    pub account_holder: String,
    pub account_number: String,
    pub ifsc: String,
    pub upi_id: String,
    pub accept_terms: bool,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self {
            seller_type: "individual".to_string(),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            company_name: String::new(),
            tax_id: String::new(),
            address: AddressFields::default(),
            businesses: vec![BusinessRow::default()],
            payment_method: "bank".to_string(),
            account_holder: String::new(),
            account_number: String::new(),
            ifsc: String::new(),
            upi_id: String::new(),
            accept_terms: false,
        }
    }
}

fn conversion(path: String, raw: &str) -> FormError {
    FormError::Conversion {
        path,
        message: format!("'{raw}' is not a valid number"),
    }
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl RegistrationForm {
    pub fn to_registration(&self) -> Result<SellerRegistration, FormError> {
        let seller_type = match self.seller_type.as_str() {
            "business" => SellerType::Business,
            "individual" => SellerType::Individual,
            other => {
                return Err(FormError::Conversion {
                    path: "sellerType".to_string(),
                    message: format!("unknown seller type '{other}'"),
                })
            }
        };
        let payment = match self.payment_method.as_str() {
            "upi" => PaymentDetails::Upi {
                upi_id: self.upi_id.trim().to_string(),
            },
            "bank" => PaymentDetails::Bank {
                account_holder: self.account_holder.trim().to_string(),
                account_number: self.account_number.trim().to_string(),
                ifsc: self.ifsc.trim().to_string(),
            },
            other => {
                return Err(FormError::Conversion {
                    path: "paymentMethod".to_string(),
                    message: format!("unknown payment method '{other}'"),
                })
            }
        };

        let mut businesses = Vec::with_capacity(self.businesses.len());
        for (b, business) in self.businesses.iter().enumerate() {
            let mut products = Vec::with_capacity(business.products.len());
            for (i, product) in business.products.iter().enumerate() {
                let prefix = format!("businesses.{b}.products.{i}");
                products.push(BusinessProduct {
                    name: product.name.trim().to_string(),
                    price: product
                        .price
                        .trim()
                        .parse()
                        .map_err(|_| conversion(format!("{prefix}.price"), &product.price))?,
                    stock: product
                        .stock
                        .trim()
                        .parse()
                        .map_err(|_| conversion(format!("{prefix}.stock"), &product.stock))?,
                });
            }
            businesses.push(Business {
                name: business.name.trim().to_string(),
                category: business.category.clone(),
                website: optional(&business.website),
                products,
            });
        }

        let is_business = seller_type == SellerType::Business;
        Ok(SellerRegistration {
            seller_type,
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            company_name: optional(&self.company_name).filter(|_| is_business),
            tax_id: optional(&self.tax_id).filter(|_| is_business),
            address: Address {
                street: self.address.street.trim().to_string(),
                city: self.address.city.trim().to_string(),
                postal_code: self.address.postal_code.trim().to_string(),
            },
            businesses,
            payment,
        })
    }

    /// Pre-fill from a stored registration (edit mode)
    pub fn from_registration(registration: &SellerRegistration) -> Self {
        let mut form = Self {
            seller_type: match registration.seller_type {
                SellerType::Business => "business",
                SellerType::Individual => "individual",
            }
            .to_string(),
            full_name: registration.full_name.clone(),
            email: registration.email.clone(),
            phone: registration.phone.clone(),
            company_name: registration.company_name.clone().unwrap_or_default(),
            tax_id: registration.tax_id.clone().unwrap_or_default(),
            address: AddressFields {
                street: registration.address.street.clone(),
                city: registration.address.city.clone(),
                postal_code: registration.address.postal_code.clone(),
            },
            businesses: registration
                .businesses
                .iter()
                .map(|b| BusinessRow {
                    name: b.name.clone(),
                    category: b.category.clone(),
                    website: b.website.clone().unwrap_or_default(),
                    products: b
                        .products
                        .iter()
                        .map(|p| ProductRow {
                            name: p.name.clone(),
                            price: p.price.to_string(),
                            stock: p.stock.to_string(),
                        })
                        .collect(),
                })
                .collect(),
            accept_terms: true,
            ..Self::default()
        };
        match &registration.payment {
            PaymentDetails::Bank {
                account_holder,
                account_number,
                ifsc,
            } => {
                form.payment_method = "bank".to_string();
                form.account_holder = account_holder.clone();
                form.account_number = account_number.clone();
                form.ifsc = ifsc.clone();
            }
            PaymentDetails::Upi { upi_id } => {
                form.payment_method = "upi".to_string();
                form.upi_id = upi_id.clone();
            }
        }
        form
    }
}

fn schema() -> Result<Schema, FormError> {
    let is_business = || Predicate::Equals("business".into());
    let is_bank = || Predicate::Equals("bank".into());
    let is_upi = || Predicate::Equals("upi".into());

    Schema::new()
        .field(
            "sellerType",
            vec![Rule::Always(Check::OneOf(
                vec!["individual".into(), "business".into()],
                "Choose a seller type".into(),
            ))],
        )?
        .field("fullName", rules::name("Full name")?)?
        .field("email", rules::email()?)?
        .field("phone", rules::phone()?)?
        .field(
            "companyName",
            when("sellerType", is_business(), rules::required("Company name"))?,
        )?
        .field(
            "companyName",
            vec![Rule::Always(Check::MaxLen(
                100,
                "Company name must be at most 100 characters".into(),
            ))],
        )?
        .field(
            "taxId",
            when(
                "sellerType",
                is_business(),
                vec![
                    Rule::Always(Check::Required("GSTIN is required".into())),
                    Rule::Always(Check::pattern(
                        r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$",
                        "Enter a valid GSTIN",
                    )?),
                ],
            )?,
        )?
        .field("address.street", rules::required("Street"))?
        .field("address.city", rules::name("City")?)?
        .field("address.postalCode", rules::postal_code()?)?
        .field(
            "businesses",
            vec![Rule::Always(Check::MinItems(
                MIN_BUSINESSES,
                "Add at least one business".into(),
            ))],
        )?
        .field("businesses.*.name", rules::name("Business name")?)?
        .field("businesses.*.category", rules::required("Business category"))?
        .field("businesses.*.website", rules::url("Website")?)?
        .field("businesses.*.products.*.name", rules::required("Product name"))?
        .field("businesses.*.products.*.price", rules::price())?
        .field("businesses.*.products.*.stock", rules::stock())?
        .field(
            "paymentMethod",
            vec![Rule::Always(Check::OneOf(
                vec!["bank".into(), "upi".into()],
                "Choose a payment method".into(),
            ))],
        )?
        .field(
            "accountHolder",
            when("paymentMethod", is_bank(), rules::name("Account holder")?)?,
        )?
        .field(
            "accountNumber",
            when(
                "paymentMethod",
                is_bank(),
                vec![
                    Rule::Always(Check::Required("Account number is required".into())),
                    Rule::Always(Check::pattern(
                        r"^[0-9]{9,18}$",
                        "Account number must be 9 to 18 digits",
                    )?),
                ],
            )?,
        )?
        .field(
            "ifsc",
            when(
                "paymentMethod",
                is_bank(),
                vec![
                    Rule::Always(Check::Required("IFSC code is required".into())),
                    Rule::Always(Check::pattern(
                        r"^[A-Z]{4}0[A-Z0-9]{6}$",
                        "Enter a valid IFSC code",
                    )?),
                ],
            )?,
        )?
        .field(
            "upiId",
            when(
                "paymentMethod",
                is_upi(),
                vec![
                    Rule::Always(Check::Required("UPI ID is required".into())),
                    Rule::Always(Check::pattern(
                        r"^[A-Za-z0-9._-]{2,256}@[A-Za-z]{2,64}$",
                        "Enter a valid UPI ID",
                    )?),
                ],
            )?,
        )?
        .field(
            "acceptTerms",
            vec![Rule::Always(Check::Required(
                "You must accept the terms".into(),
            ))],
        )
}

fn registry() -> Result<FieldRegistry, FormError> {
    let seller_types = vec![
        Choice::new("individual", "Individual"),
        Choice::new("business", "Business"),
    ];
    let methods = vec![
        Choice::new("bank", "Bank transfer"),
        Choice::new("upi", "UPI"),
    ];
    let categories = BUSINESS_CATEGORIES
        .iter()
        .map(|(v, l)| Choice::new(v, l))
        .collect();
    let business = Predicate::Equals("business".into());
    let bank = Predicate::Equals("bank".into());

    Ok(FieldRegistry::new()
        .register(FormField::new("sellerType", "Seller type", FieldKind::Radio(seller_types))?)
        .register(FormField::text("fullName", "Full name")?)
        .register(FormField::text("email", "Email")?)
        .register(FormField::text("phone", "Phone")?)
        .register(
            FormField::text("companyName", "Company name")?
                .shown_when("sellerType", business.clone())?,
        )
        .register(FormField::text("taxId", "GSTIN")?.shown_when("sellerType", business)?)
        .register(FormField::text("address.street", "Street")?)
        .register(FormField::text("address.city", "City")?)
        .register(FormField::text("address.postalCode", "Postal code")?)
        .register(FormField::text("businesses.*.name", "Business name")?)
        .register(FormField::new(
            "businesses.*.category",
            "Category",
            FieldKind::Dropdown(categories),
        )?)
        .register(FormField::text("businesses.*.website", "Website")?)
        .register(FormField::text("businesses.*.products.*.name", "Product name")?)
        .register(FormField::text("businesses.*.products.*.price", "Price")?)
        .register(FormField::text("businesses.*.products.*.stock", "Stock")?)
        .register(FormField::new("paymentMethod", "Payment method", FieldKind::Radio(methods))?)
        .register(
            FormField::text("accountHolder", "Account holder")?
                .shown_when("paymentMethod", bank.clone())?,
        )
        .register(
            FormField::text("accountNumber", "Account number")?
                .shown_when("paymentMethod", bank.clone())?,
        )
        .register(FormField::text("ifsc", "IFSC code")?.shown_when("paymentMethod", bank)?)
        .register(
            FormField::text("upiId", "UPI ID")?
                .shown_when("paymentMethod", Predicate::Equals("upi".into()))?,
        )
        .register(FormField::new("acceptTerms", "I accept the seller terms", FieldKind::Checkbox)?))
}

/// Build the seller registration wizard
pub fn registration_wizard() -> Result<Wizard<RegistrationForm>, FormError> {
    let steps = vec![
        StepDefinition::new(
            "Seller details",
            &["sellerType", "fullName", "email", "phone", "companyName", "taxId"],
        )?,
        StepDefinition::new("Address", &["address"])?,
        StepDefinition::new("Businesses", &["businesses"])?,
        StepDefinition::new(
            "Payment",
            &["paymentMethod", "accountHolder", "accountNumber", "ifsc", "upiId", "acceptTerms"],
        )?,
        StepDefinition::new("Review", &[])?,
    ];
    let collections = vec![
        Collection::new(
            "businesses",
            "businesses",
            MIN_BUSINESSES,
            MAX_BUSINESSES,
            json!({"name": "", "category": "", "website": "", "products": []}),
        )?,
        Collection::new(
            "businesses.*.products",
            "products",
            0,
            MAX_PRODUCTS_PER_BUSINESS,
            json!({"name": "", "price": "", "stock": ""}),
        )?,
    ];
    Wizard::new(
        "Seller registration",
        &RegistrationForm::default(),
        schema()?,
        registry()?,
        steps,
        collections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::forms::array::RowError;
    use crate::state::forms::path::FieldPath;
    use pretty_assertions::assert_eq;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn seller_errors(wizard: &mut Wizard<RegistrationForm>) -> Vec<String> {
        wizard.validate_active();
        wizard.errors().keys().cloned().collect()
    }

    mod conditional_fields {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_individual_seller_skips_company_name() {
            let mut wizard = registration_wizard().unwrap();
            let errors = seller_errors(&mut wizard);
            assert!(!errors.contains(&"companyName".to_string()));
            assert!(wizard.focus_path(&p("fullName")));
            assert!(!wizard.focus_path(&p("companyName")));
        }

        #[test]
        fn test_business_seller_requires_company_name() {
            let mut wizard = registration_wizard().unwrap();
            wizard.set_value(&p("sellerType"), json!("business")).unwrap();
            wizard.validate_active();
            assert_eq!(
                wizard.error_for(&p("companyName")),
                Some("Company name is required")
            );
            assert!(wizard.focus_path(&p("companyName")));
        }

        #[test]
        fn test_payment_fields_follow_method() {
            let mut wizard = registration_wizard().unwrap();
            wizard.go_to_step(3);
            wizard.validate_active();
            assert!(wizard.error_for(&p("ifsc")).is_some());
            assert!(wizard.error_for(&p("upiId")).is_none());

            wizard.set_value(&p("paymentMethod"), json!("upi")).unwrap();
            wizard.validate_active();
            assert!(wizard.error_for(&p("ifsc")).is_none());
            assert_eq!(wizard.error_for(&p("upiId")), Some("UPI ID is required"));
        }

        #[test]
        fn test_upi_id_shape() {
            let mut wizard = registration_wizard().unwrap();
            wizard.go_to_step(3);
            wizard.set_value(&p("paymentMethod"), json!("upi")).unwrap();
            for (upi, expected) in [
                ("ana.rao-1@okaxis", None),
                ("ana rao@okaxis", Some("Enter a valid UPI ID")),
                ("анна@okaxis", Some("Enter a valid UPI ID")),
                ("ana@ok1", Some("Enter a valid UPI ID")),
            ] {
                wizard.set_value(&p("upiId"), json!(upi)).unwrap();
                wizard.validate_active();
                assert_eq!(wizard.error_for(&p("upiId")), expected, "upi {upi}");
            }
        }
    }

    #[test]
    fn test_wizard_and_schema_build() {
        assert!(schema().is_ok());
        let wizard = registration_wizard().unwrap();
        assert_eq!(wizard.steps().count(), 5);
        assert_eq!(wizard.state().array_len(&p("businesses")), 1);
    }

    mod businesses {
        use super::*;
        use pretty_assertions::assert_eq;

        fn on_businesses() -> Wizard<RegistrationForm> {
            let mut wizard = registration_wizard().unwrap();
            wizard.go_to_step(2);
            wizard
        }

        fn fill_business(wizard: &mut Wizard<RegistrationForm>, index: usize) {
            wizard
                .set_value(&p(&format!("businesses.{index}.name")), json!("Acme Traders"))
                .unwrap();
            wizard
                .set_value(&p(&format!("businesses.{index}.category")), json!("home"))
                .unwrap();
        }

        #[test]
        fn test_last_business_cannot_be_removed() {
            let mut wizard = on_businesses();
            let err = wizard.remove_row().unwrap_err();
            assert!(matches!(err, RowError::AtMinimum { min: 1, .. }));
        }

        #[test]
        fn test_at_most_three_businesses() {
            let mut wizard = on_businesses();
            for i in 0..MAX_BUSINESSES {
                fill_business(&mut wizard, i);
                if i + 1 < MAX_BUSINESSES {
                    wizard.append_row().unwrap();
                }
            }
            let err = wizard.append_row().unwrap_err();
            assert!(matches!(err, RowError::Full { max: 3, .. }));
            assert_eq!(wizard.state().array_len(&p("businesses")), 3);
        }

        #[test]
        fn test_product_price_rules_in_nested_rows() {
            let mut wizard = on_businesses();
            fill_business(&mut wizard, 0);
            wizard.append_child_row().unwrap();
            wizard
                .set_value(&p("businesses.0.products.0.name"), json!("Kettle"))
                .unwrap();
            wizard
                .set_value(&p("businesses.0.products.0.stock"), json!("4"))
                .unwrap();

            for (price, expected) in [
                ("-5", Some("Price must be positive")),
                ("abc", Some("Price must be a number")),
                ("49.99", None),
            ] {
                wizard
                    .set_value(&p("businesses.0.products.0.price"), json!(price))
                    .unwrap();
                let result = wizard.save_row();
                let message = result
                    .err()
                    .and_then(|e| e.field_errors().cloned())
                    .and_then(|errors| errors.get("businesses.0.products.0.price").cloned());
                assert_eq!(message.as_deref(), expected, "price {price}");
            }
        }

        #[test]
        fn test_products_limit_per_business() {
            let mut wizard = on_businesses();
            fill_business(&mut wizard, 0);
            for i in 0..MAX_PRODUCTS_PER_BUSINESS {
                wizard.focus_path(&p("businesses.0.name"));
                wizard.append_child_row().unwrap();
                for (field, value) in [("name", "Item"), ("price", "1"), ("stock", "1")] {
                    wizard
                        .set_value(
                            &p(&format!("businesses.0.products.{i}.{field}")),
                            json!(value),
                        )
                        .unwrap();
                }
            }
            wizard.focus_path(&p("businesses.0.name"));
            let err = wizard.append_child_row().unwrap_err();
            assert!(matches!(err, RowError::Full { max: 10, .. }));
        }
    }

    #[tokio::test]
    async fn test_submit_blocks_business_without_company_name() {
        use crate::api::MockStorefrontService;
        use crate::state::forms::wizard::SubmitError;

        let mut service = MockStorefrontService::new();
        service.expect_register_seller().never();
        let service: &dyn crate::api::StorefrontService = &service;

        let mut wizard = registration_wizard().unwrap();
        wizard.set_value(&p("sellerType"), json!("business")).unwrap();
        wizard.go_to_step(4);
        let err = wizard
            .submit(|form| async move {
                let registration = form.to_registration()?;
                Ok(service.register_seller(registration).await?)
            })
            .await
            .unwrap_err();
        let SubmitError::Invalid(errors) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors.get("companyName").map(String::as_str),
            Some("Company name is required")
        );
        assert!(wizard.steps().status(0).has_error);
    }

    #[test]
    fn test_to_registration_for_business_with_upi() {
        let form = RegistrationForm {
            seller_type: "business".into(),
            full_name: "Ana Rao".into(),
            company_name: "Acme".into(),
            payment_method: "upi".into(),
            upi_id: "acme@bank".into(),
            account_number: "123456789".into(),
            businesses: vec![BusinessRow {
                name: "Acme".into(),
                products: vec![ProductRow {
                    name: "Kettle".into(),
                    price: "49.99".into(),
                    stock: "4".into(),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let registration = form.to_registration().unwrap();
        assert_eq!(registration.seller_type, SellerType::Business);
        assert_eq!(registration.company_name.as_deref(), Some("Acme"));
        assert_eq!(
            registration.payment,
            PaymentDetails::Upi {
                upi_id: "acme@bank".into()
            }
        );
        assert_eq!(registration.businesses[0].products[0].price, 49.99);
        assert_eq!(registration.businesses[0].website, None);
    }

    #[test]
    fn test_individual_drops_company_fields() {
        let form = RegistrationForm {
            company_name: "Leftover".into(),
            ..Default::default()
        };
        let registration = form.to_registration().unwrap();
        assert_eq!(registration.company_name, None);
    }

    #[test]
    fn test_from_registration_round_trips() {
        let form = RegistrationForm {
            seller_type: "business".into(),
            full_name: "Ana Rao".into(),
            email: "ana@example.com".into(),
            phone: "9876543210".into(),
            company_name: "Acme".into(),
            account_holder: "Ana Rao".into(),
            account_number: "123456789".into(),
            ifsc: "HDFC0001234".into(),
            accept_terms: true,
            ..Default::default()
        };
        let registration = form.to_registration().unwrap();
        assert_eq!(RegistrationForm::from_registration(&registration), form);
    }
}
