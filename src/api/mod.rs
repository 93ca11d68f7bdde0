//! Storefront REST API boundary

mod client;
mod error;
mod traits;
mod types;

pub use client::RestClient;
pub use error::ApiError;
pub use traits::{ApiResult, StorefrontService};
pub use types::*;

#[cfg(test)]
pub use traits::MockStorefrontService;
