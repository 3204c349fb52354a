/// Content service catalog provider
///
/// Reads the internal podcast listing and runs it through the field-name
/// normalization table.
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::CatalogEntry,
    services::{normalize::normalize_catalog, providers::CatalogProvider},
};

const CATALOG_PATH: &str = "/api/internal/podcasts";
const FIRST_PAGE: u32 = 1;

#[derive(Clone)]
pub struct ContentServiceClient {
    http_client: HttpClient,
    base_url: String,
    page_size: u32,
}

impl ContentServiceClient {
    pub fn new(base_url: String, page_size: u32, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }
}

#[async_trait::async_trait]
impl CatalogProvider for ContentServiceClient {
    async fn fetch_catalog(&self) -> AppResult<Vec<CatalogEntry>> {
        let url = format!("{}{}", self.base_url, CATALOG_PATH);
        let response = self
            .http_client
            .get(&url)
            .query(&[("page", FIRST_PAGE), ("pageSize", self.page_size)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(
                status = %status,
                provider = self.name(),
                "Content service returned non-success status"
            );
            return Err(AppError::ExternalApi(format!(
                "Content service returned status {}",
                status
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        let entries = normalize_catalog(&payload);

        tracing::info!(
            count = entries.len(),
            provider = self.name(),
            "Fetched podcast catalog"
        );

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "content_service"
    }
}
