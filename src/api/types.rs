//! Wire types exchanged with the storefront REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Listing status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Draft,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 3] = [Self::Active, Self::Inactive, Self::Draft];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Draft => "Draft",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Draft => "draft",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stocking location for a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Warehouse {
    pub name: String,
    pub city: String,
    pub postal_code: String,
    pub stock: u32,
}

/// Product as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub accepts_returns: bool,
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create/update product requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub category: String,
    pub price: f64,
    pub stock: u32,
    pub status: ProductStatus,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub accepts_returns: bool,
    pub warehouses: Vec<Warehouse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A saved, unfinished sell-product form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerType {
    #[default]
    Individual,
    Business,
}

/// One product listed under a registered business
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProduct {
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub name: String,
    pub category: String,
    pub website: Option<String>,
    pub products: Vec<BusinessProduct>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

/// Payout details, tagged by method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentDetails {
    #[serde(rename_all = "camelCase")]
    Bank {
        account_holder: String,
        account_number: String,
        ifsc: String,
    },
    #[serde(rename_all = "camelCase")]
    Upi { upi_id: String },
}

/// Body of a seller registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRegistration {
    pub seller_type: SellerType,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Address,
    pub businesses: Vec<Business>,
    pub payment: PaymentDetails,
}

/// A stored registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: SellerRegistration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: String,
}

/// Query parameters for listing users
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Authenticated user, kept in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_status_round_trip() {
        assert_eq!(ProductStatus::parse("inactive"), Some(ProductStatus::Inactive));
        assert_eq!(ProductStatus::parse("archived"), None);
        assert_eq!(
            serde_json::to_value(ProductStatus::Draft).unwrap(),
            json!("draft")
        );
    }

    #[test]
    fn test_product_defaults_optional_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1",
            "name": "Desk Lamp",
            "price": 24.5,
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-02T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(product.status, ProductStatus::Active);
        assert!(product.warehouses.is_empty());
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn test_payment_details_tagged_by_method() {
        let upi = PaymentDetails::Upi {
            upi_id: "shop@bank".into(),
        };
        assert_eq!(
            serde_json::to_value(&upi).unwrap(),
            json!({"method": "upi", "upiId": "shop@bank"})
        );
    }

    #[test]
    fn test_user_query_skips_unset_params() {
        let query = UserQuery {
            search: Some("ana".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({"search": "ana"}));
    }
}
