//! Sell-a-product wizard

use super::array::Collection;
use super::field::{Choice, FieldKind, FieldRegistry, FormField};
use super::form_state::FormError;
use super::schema::{rules, Check, Rule, Schema};
use super::steps::StepDefinition;
use super::wizard::Wizard;
use crate::api::{Category, Product, ProductInput, ProductStatus, Warehouse};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MIN_WAREHOUSES: usize = 1;
pub const MAX_WAREHOUSES: usize = 5;

const TAGS: [(&str, &str); 4] = [
    ("new", "New arrival"),
    ("sale", "On sale"),
    ("handmade", "Handmade"),
    ("eco", "Eco friendly"),
];

/// One warehouse row as typed by the seller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarehouseRow {
    pub name: String,
    pub city: String,
    pub postal_code: String,
    pub stock: String,
}

/// Form model of the sell-product wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellProductForm {
    pub name: String,
    pub description: String,
    pub category: String,
    pub sku: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub price: String,
    pub stock: String,
    pub status: String,
    pub accepts_returns: bool,
    pub warehouses: Vec<WarehouseRow>,
}

impl Default for SellProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            category: String::new(),
            sku: String::new(),
            image_url: String::new(),
            tags: Vec::new(),
            price: String::new(),
            stock: String::new(),
            status: ProductStatus::Active.as_str().to_string(),
            accepts_returns: false,
            warehouses: vec![WarehouseRow::default()],
        }
    }
}

fn parse_number<N: std::str::FromStr>(path: &str, raw: &str) -> Result<N, FormError> {
    raw.trim().parse().map_err(|_| FormError::Conversion {
        path: path.to_string(),
        message: format!("'{raw}' is not a valid number"),
    })
}

impl SellProductForm {
    /// Convert validated input into an API request
    pub fn to_input(&self) -> Result<ProductInput, FormError> {
        let status = ProductStatus::parse(&self.status).ok_or_else(|| FormError::Conversion {
            path: "status".to_string(),
            message: format!("unknown status '{}'", self.status),
        })?;
        let warehouses = self
            .warehouses
            .iter()
            .enumerate()
            .map(|(i, w)| {
                Ok(Warehouse {
                    name: w.name.trim().to_string(),
                    city: w.city.trim().to_string(),
                    postal_code: w.postal_code.trim().to_string(),
                    stock: parse_number(&format!("warehouses.{i}.stock"), &w.stock)?,
                })
            })
            .collect::<Result<Vec<_>, FormError>>()?;
        let image_url = self.image_url.trim();
        Ok(ProductInput {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            sku: self.sku.trim().to_string(),
            category: self.category.clone(),
            price: parse_number("price", &self.price)?,
            stock: parse_number("stock", &self.stock)?,
            status,
            image_url: (!image_url.is_empty()).then(|| image_url.to_string()),
            tags: self.tags.clone(),
            accepts_returns: self.accepts_returns,
            warehouses,
        })
    }

    /// Pre-fill from an existing product (edit mode)
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            sku: product.sku.clone(),
            image_url: product.image_url.clone().unwrap_or_default(),
            tags: product.tags.clone(),
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            status: product.status.as_str().to_string(),
            accepts_returns: product.accepts_returns,
            warehouses: product
                .warehouses
                .iter()
                .map(|w| WarehouseRow {
                    name: w.name.clone(),
                    city: w.city.clone(),
                    postal_code: w.postal_code.clone(),
                    stock: w.stock.to_string(),
                })
                .collect(),
        }
    }
}

fn schema() -> Result<Schema, FormError> {
    let statuses = ProductStatus::ALL
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    Schema::new()
        .field("name", rules::required("Product name"))?
        .field(
            "name",
            vec![Rule::Always(Check::MaxLen(
                100,
                "Product name must be at most 100 characters".into(),
            ))],
        )?
        .field(
            "description",
            vec![Rule::Always(Check::MaxLen(
                500,
                "Description must be at most 500 characters".into(),
            ))],
        )?
        .field("category", rules::required("Category"))?
        .field(
            "sku",
            vec![
                Rule::Always(Check::Required("SKU is required".into())),
                Rule::Always(Check::pattern(
                    r"^[A-Z0-9-]{3,20}$",
                    "SKU must be 3-20 uppercase letters, digits or dashes",
                )?),
            ],
        )?
        .field("imageUrl", rules::url("Image URL")?)?
        .field("price", rules::price())?
        .field("stock", rules::stock())?
        .field(
            "status",
            vec![Rule::Always(Check::OneOf(statuses, "Choose a status".into()))],
        )?
        .field("warehouses", vec![Rule::Always(Check::MinItems(
            MIN_WAREHOUSES,
            "Add at least one warehouse".into(),
        ))])?
        .field("warehouses.*.name", rules::required("Warehouse name"))?
        .field("warehouses.*.city", rules::name("City")?)?
        .field("warehouses.*.postalCode", rules::postal_code()?)?
        .field("warehouses.*.stock", rules::stock())
}

fn registry(categories: &[Category]) -> Result<FieldRegistry, FormError> {
    let category = if categories.is_empty() {
        FormField::text("category", "Category")?
    } else {
        FormField::new(
            "category",
            "Category",
            FieldKind::Dropdown(
                categories
                    .iter()
                    .map(|c| Choice::new(&c.name, &c.name))
                    .collect(),
            ),
        )?
    };
    let statuses = ProductStatus::ALL
        .iter()
        .map(|s| Choice::new(s.as_str(), s.label()))
        .collect();
    let tags = TAGS.iter().map(|(v, l)| Choice::new(v, l)).collect();

    Ok(FieldRegistry::new()
        .register(FormField::text("name", "Product name")?)
        .register(FormField::new("description", "Description", FieldKind::Multiline)?)
        .register(category)
        .register(FormField::text("sku", "SKU")?)
        .register(FormField::text("imageUrl", "Image URL")?)
        .register(FormField::new("tags", "Tags", FieldKind::CheckboxGroup(tags))?)
        .register(FormField::text("price", "Price")?)
        .register(FormField::text("stock", "Stock")?)
        .register(FormField::new("status", "Status", FieldKind::Dropdown(statuses))?)
        .register(FormField::new("acceptsReturns", "Accepts returns", FieldKind::Checkbox)?)
        .register(FormField::text("warehouses.*.name", "Warehouse name")?)
        .register(FormField::text("warehouses.*.city", "City")?)
        .register(FormField::text("warehouses.*.postalCode", "Postal code")?)
        .register(FormField::text("warehouses.*.stock", "Stock")?))
}

/// Build the sell-product wizard
pub fn sell_product_wizard(categories: &[Category]) -> Result<Wizard<SellProductForm>, FormError> {
    let steps = vec![
        StepDefinition::new(
            "Basic info",
            &["name", "description", "category", "sku", "imageUrl", "tags"],
        )?,
        StepDefinition::new("Pricing & stock", &["price", "stock", "status", "acceptsReturns"])?,
        StepDefinition::new("Warehouses", &["warehouses"])?,
        StepDefinition::new("Review", &[])?,
    ];
    let warehouses = Collection::new(
        "warehouses",
        "warehouses",
        MIN_WAREHOUSES,
        MAX_WAREHOUSES,
        json!({"name": "", "city": "", "postalCode": "", "stock": ""}),
    )?;
    Wizard::new(
        "Sell a product",
        &SellProductForm::default(),
        schema()?,
        registry(categories)?,
        steps,
        vec![warehouses],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockStorefrontService, StorefrontService};
    use crate::state::forms::array::RowError;
    use crate::state::forms::path::FieldPath;
    use crate::state::forms::wizard::{SubmitError, SubmitOutcome, WizardPhase};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn categories() -> Vec<Category> {
        vec![Category {
            id: "c1".into(),
            name: "Lighting".into(),
        }]
    }

    fn filled() -> Wizard<SellProductForm> {
        let mut wizard = sell_product_wizard(&categories()).unwrap();
        for (path, value) in [
            ("name", json!("Desk Lamp")),
            ("category", json!("Lighting")),
            ("sku", json!("LAMP-01")),
            ("price", json!("49.99")),
            ("stock", json!("12")),
            ("warehouses.0.name", json!("Main")),
            ("warehouses.0.city", json!("Pune")),
            ("warehouses.0.postalCode", json!("411001")),
            ("warehouses.0.stock", json!("12")),
        ] {
            wizard.set_value(&p(path), value).unwrap();
        }
        for _ in 0..3 {
            wizard.go_next();
        }
        wizard
    }

    fn product(input: &ProductInput) -> Product {
        Product {
            id: "p1".into(),
            name: input.name.clone(),
            description: input.description.clone(),
            sku: input.sku.clone(),
            category: input.category.clone(),
            price: input.price,
            stock: input.stock,
            status: input.status,
            image_url: input.image_url.clone(),
            tags: input.tags.clone(),
            accepts_returns: input.accepts_returns,
            warehouses: input.warehouses.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    mod price_rules {
        use super::*;
        use pretty_assertions::assert_eq;

        fn price_error(value: serde_json::Value) -> Option<String> {
            let mut wizard = sell_product_wizard(&[]).unwrap();
            wizard.set_value(&p("price"), value).unwrap();
            wizard.go_to_step(1);
            wizard.go_to_step(0);
            wizard.steps().errors(1).unwrap().get("price").cloned()
        }

        #[test]
        fn test_negative_price() {
            assert_eq!(price_error(json!("-5")).as_deref(), Some("Price must be positive"));
        }

        #[test]
        fn test_non_numeric_price() {
            assert_eq!(price_error(json!("abc")).as_deref(), Some("Price must be a number"));
        }

        #[test]
        fn test_valid_price() {
            assert_eq!(price_error(json!("49.99")), None);
        }
    }

    mod warehouses {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_last_warehouse_cannot_be_removed() {
            let mut wizard = filled();
            wizard.go_back();
            assert_eq!(wizard.steps().active_step().title, "Warehouses");
            let err = wizard.remove_row().unwrap_err();
            assert!(matches!(err, RowError::AtMinimum { min: 1, .. }));
            assert_eq!(wizard.state().array_len(&p("warehouses")), 1);
        }

        #[test]
        fn test_at_most_five_warehouses() {
            let mut wizard = filled();
            wizard.go_back();
            for i in 1..MAX_WAREHOUSES {
                wizard.append_row().unwrap();
                for (field, value) in [
                    ("name", "Spare"),
                    ("city", "Goa"),
                    ("postalCode", "403001"),
                    ("stock", "1"),
                ] {
                    wizard
                        .set_value(&p(&format!("warehouses.{i}.{field}")), json!(value))
                        .unwrap();
                }
            }
            let err = wizard.append_row().unwrap_err();
            assert!(matches!(err, RowError::Full { max: 5, .. }));
            assert_eq!(err.to_string(), "You can add at most 5 warehouses");
        }

        #[test]
        fn test_postal_code_checked_on_save() {
            let mut wizard = filled();
            wizard.go_back();
            wizard
                .set_value(&p("warehouses.0.postalCode"), json!("4110"))
                .unwrap();
            let err = wizard.save_row().unwrap_err();
            assert_eq!(
                err.field_errors().unwrap().get("warehouses.0.postalCode").map(String::as_str),
                Some("Postal code must be exactly 6 digits")
            );
        }
    }

    mod submit {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_single_valid_warehouse_submits() {
            let mut service = MockStorefrontService::new();
            service
                .expect_create_product()
                .withf(|input| input.warehouses.len() == 1 && input.price == 49.99)
                .times(1)
                .returning(|input| Ok(product(&input)));

            let service: &dyn StorefrontService = &service;
            let mut wizard = filled();
            assert!(wizard.steps().is_last());
            let outcome = wizard
                .submit(|form| async move {
                    let input = form.to_input()?;
                    Ok(service.create_product(input).await?)
                })
                .await
                .unwrap();
            let SubmitOutcome::Reset(created) = outcome else {
                panic!("create should reset");
            };
            assert_eq!(created.sku, "LAMP-01");
            assert_eq!(wizard.state().text(&p("name")), "");
            assert_eq!(wizard.phase(), WizardPhase::Editing(0));
        }

        #[tokio::test]
        async fn test_rejected_submit_keeps_values() {
            let mut service = MockStorefrontService::new();
            service.expect_create_product().returning(|_| {
                Err(ApiError::Rejected {
                    status: 400,
                    custom_message: Some("SKU already exists".into()),
                })
            });

            let service: &dyn StorefrontService = &service;
            let mut wizard = filled();
            let err = wizard
                .submit(|form| async move {
                    let input = form.to_input()?;
                    Ok(service.create_product(input).await?)
                })
                .await
                .unwrap_err();
            let SubmitError::Service(api) = err else {
                panic!("expected service error");
            };
            assert_eq!(api.user_message(), "SKU already exists");
            assert_eq!(wizard.state().text(&p("sku")), "LAMP-01");
            assert_eq!(wizard.phase(), WizardPhase::Editing(3));
        }
    }

    #[test]
    fn test_to_input_converts_numbers() {
        let form = SellProductForm {
            name: " Lamp ".into(),
            price: "10.5".into(),
            stock: "3".into(),
            warehouses: vec![WarehouseRow {
                stock: "3".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let input = form.to_input().unwrap();
        assert_eq!(input.name, "Lamp");
        assert_eq!(input.price, 10.5);
        assert_eq!(input.warehouses[0].stock, 3);
        assert_eq!(input.image_url, None);
    }

    #[test]
    fn test_to_input_reports_bad_number() {
        let form = SellProductForm {
            price: "ten".into(),
            ..Default::default()
        };
        assert!(matches!(form.to_input(), Err(FormError::Conversion { .. })));
    }

    #[test]
    fn test_from_product_round_trips() {
        let form = SellProductForm {
            name: "Lamp".into(),
            sku: "LAMP-01".into(),
            price: "10.5".into(),
            stock: "3".into(),
            warehouses: vec![WarehouseRow {
                name: "Main".into(),
                city: "Pune".into(),
                postal_code: "411001".into(),
                stock: "3".into(),
            }],
            ..Default::default()
        };
        let product = product(&form.to_input().unwrap());
        assert_eq!(SellProductForm::from_product(&product), form);
    }

    #[test]
    fn test_category_falls_back_to_text_without_categories() {
        let wizard = sell_product_wizard(&[]).unwrap();
        let category = wizard
            .visible_fields()
            .into_iter()
            .find(|b| b.path == p("category"))
            .unwrap();
        assert!(wizard.field(&category).accepts_text());
    }
}
