//! Trait abstraction for the storefront API to enable mocking in tests

use super::error::ApiError;
use super::types::{
    AuthUser, Category, Credentials, Draft, NewUser, Product, ProductInput, ProductStatus,
    Registration, SellerRegistration, SignupRequest, User, UserQuery,
};
use async_trait::async_trait;
use serde_json::Value;

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations the storefront exposes to this client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorefrontService: Send + Sync {
    async fn get_products(&self) -> ApiResult<Vec<Product>>;

    async fn get_categories(&self) -> ApiResult<Vec<Category>>;

    async fn create_product(&self, input: ProductInput) -> ApiResult<Product>;

    async fn update_product(&self, id: &str, input: ProductInput) -> ApiResult<Product>;

    async fn update_product_status(&self, id: &str, status: ProductStatus) -> ApiResult<Product>;

    async fn delete_product(&self, id: &str) -> ApiResult<()>;

    async fn get_drafts(&self) -> ApiResult<Vec<Draft>>;

    async fn create_draft(&self, data: Value) -> ApiResult<Draft>;

    async fn update_draft(&self, id: &str, data: Value) -> ApiResult<Draft>;

    async fn delete_draft(&self, id: &str) -> ApiResult<()>;

    async fn register_seller(&self, registration: SellerRegistration) -> ApiResult<Registration>;

    async fn get_registrations(&self) -> ApiResult<Vec<Registration>>;

    async fn get_registration_by_id(&self, id: &str) -> ApiResult<Registration>;

    async fn update_registration(
        &self,
        id: &str,
        registration: SellerRegistration,
    ) -> ApiResult<Registration>;

    async fn delete_registration(&self, id: &str) -> ApiResult<()>;

    async fn get_users(&self, query: UserQuery) -> ApiResult<Vec<User>>;

    async fn create_user(&self, user: NewUser) -> ApiResult<User>;

    async fn login(&self, credentials: Credentials) -> ApiResult<AuthUser>;

    async fn signup(&self, request: SignupRequest) -> ApiResult<AuthUser>;
}
