//! Upstream data providers
//!
//! The catalog and the user directory live in neighbouring services. Each is
//! reached through a trait so the cache and the handlers can be exercised
//! against in-memory fakes.
use crate::{error::AppResult, models::CatalogEntry};

pub mod content_service;
pub mod user_service;

pub use content_service::ContentServiceClient;
pub use user_service::UserServiceClient;

/// Source of the live podcast catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetches and normalizes the full current catalog.
    ///
    /// An error or an empty list both mean "no data"; callers fall back to
    /// whatever they already hold.
    async fn fetch_catalog(&self) -> AppResult<Vec<CatalogEntry>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Source of known user identifiers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn fetch_user_ids(&self) -> AppResult<Vec<String>>;
}
