//! REST client for the storefront API
//!
//! Thin JSON-over-HTTP pass-through. Every failure is classified into an
//! [`ApiError`] so callers can tell an unreachable server from a rejection.

use super::error::ApiError;
use super::traits::{ApiResult, StorefrontService};
use super::types::{
    AuthUser, Category, Credentials, Draft, NewUser, Product, ProductInput, ProductStatus,
    Registration, SellerRegistration, SignupRequest, User, UserQuery,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Correlates a client log line with the server's access log
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Client for the storefront REST API
pub struct RestClient {
    base_url: String,
    http: Client,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::debug!(%method, path, %request_id, "api request");
        self.http
            .request(method, self.url(path))
            .header(REQUEST_ID_HEADER, request_id.to_string())
    }

    fn with_body<B: Serialize>(&self, method: Method, path: &str, body: &B) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    /// Send and decode a JSON response
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let text = self.send_raw(request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send, ignoring any response body
    async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send_raw(request).await.map(|_| ())
    }

    async fn send_raw(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await.map_err(|e| {
            let err = ApiError::from(e);
            if err.is_server_down() {
                tracing::error!(error = %err, "storefront API unreachable");
            }
            err
        })?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;
        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), message = %err.user_message(), "request rejected");
            return Err(err);
        }
        Ok(text)
    }
}

#[async_trait]
impl StorefrontService for RestClient {
    async fn get_products(&self) -> ApiResult<Vec<Product>> {
        self.send(self.request(Method::GET, "/products")).await
    }

    async fn get_categories(&self) -> ApiResult<Vec<Category>> {
        self.send(self.request(Method::GET, "/categories")).await
    }

    async fn create_product(&self, input: ProductInput) -> ApiResult<Product> {
        self.send(self.with_body(Method::POST, "/products", &input))
            .await
    }

    async fn update_product(&self, id: &str, input: ProductInput) -> ApiResult<Product> {
        self.send(self.with_body(Method::PUT, &format!("/products/{id}"), &input))
            .await
    }

    async fn update_product_status(&self, id: &str, status: ProductStatus) -> ApiResult<Product> {
        let body = json!({ "status": status });
        self.send(self.with_body(Method::PATCH, &format!("/products/{id}/status"), &body))
            .await
    }

    async fn delete_product(&self, id: &str) -> ApiResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/products/{id}")))
            .await
    }

    async fn get_drafts(&self) -> ApiResult<Vec<Draft>> {
        self.send(self.request(Method::GET, "/drafts")).await
    }

    async fn create_draft(&self, data: Value) -> ApiResult<Draft> {
        let body = json!({ "data": data });
        self.send(self.with_body(Method::POST, "/drafts", &body)).await
    }

    async fn update_draft(&self, id: &str, data: Value) -> ApiResult<Draft> {
        let body = json!({ "data": data });
        self.send(self.with_body(Method::PUT, &format!("/drafts/{id}"), &body))
            .await
    }

    async fn delete_draft(&self, id: &str) -> ApiResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/drafts/{id}")))
            .await
    }

    async fn register_seller(&self, registration: SellerRegistration) -> ApiResult<Registration> {
        self.send(self.with_body(Method::POST, "/sellers/register", &registration))
            .await
    }

    async fn get_registrations(&self) -> ApiResult<Vec<Registration>> {
        self.send(self.request(Method::GET, "/registrations")).await
    }

    async fn get_registration_by_id(&self, id: &str) -> ApiResult<Registration> {
        self.send(self.request(Method::GET, &format!("/registrations/{id}")))
            .await
    }

    async fn update_registration(
        &self,
        id: &str,
        registration: SellerRegistration,
    ) -> ApiResult<Registration> {
        self.send(self.with_body(
            Method::PUT,
            &format!("/registrations/{id}"),
            &registration,
        ))
        .await
    }

    async fn delete_registration(&self, id: &str) -> ApiResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/registrations/{id}")))
            .await
    }

    async fn get_users(&self, query: UserQuery) -> ApiResult<Vec<User>> {
        self.send(self.request(Method::GET, "/users").query(&query))
            .await
    }

    async fn create_user(&self, user: NewUser) -> ApiResult<User> {
        self.send(self.with_body(Method::POST, "/users", &user)).await
    }

    async fn login(&self, credentials: Credentials) -> ApiResult<AuthUser> {
        self.send(self.with_body(Method::POST, "/auth/login", &credentials))
            .await
    }

    async fn signup(&self, request: SignupRequest) -> ApiResult<AuthUser> {
        self.send(self.with_body(Method::POST, "/auth/signup", &request))
            .await
    }
}
