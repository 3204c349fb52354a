use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where the ranking pipeline draws its candidates from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Live catalog from the content service, cached and GUID-filtered
    #[default]
    Live,
    /// Catalog shipped with the training artifacts
    Training,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the user directory service
    #[serde(default = "default_user_service_url")]
    pub user_service_url: String,

    /// Base URL of the content catalog service
    #[serde(default = "default_content_service_url")]
    pub content_service_url: String,

    /// Directory holding mappings, training catalog, ratings, metadata and model
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default)]
    pub catalog_source: CatalogSource,

    /// Maximum age of the cached catalog before a refresh is attempted
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    /// Page size requested from the content service; large enough for the full catalog
    #[serde(default = "default_catalog_page_size")]
    pub catalog_page_size: u32,

    /// Per-request timeout for upstream calls
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Enables the batch-model `/recommend/{user_id}` route; requires the model file
    #[serde(default)]
    pub legacy_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_user_service_url() -> String {
    "http://userservice-api".to_string()
}

fn default_content_service_url() -> String {
    "http://contentservice-api".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_catalog_ttl_secs() -> u64 {
    300
}

fn default_catalog_page_size() -> u32 {
    1000
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user_service_url: default_user_service_url(),
            content_service_url: default_content_service_url(),
            model_dir: default_model_dir(),
            catalog_source: CatalogSource::default(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            catalog_page_size: default_catalog_page_size(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            legacy_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.catalog_source, CatalogSource::Live);
        assert_eq!(config.catalog_ttl(), Duration::from_secs(300));
        assert!(!config.legacy_enabled);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_overrides_from_environment() {
        let vars = vec![
            ("PORT".to_string(), "9100".to_string()),
            ("CATALOG_SOURCE".to_string(), "training".to_string()),
            ("LEGACY_ENABLED".to_string(), "true".to_string()),
            ("MODEL_DIR".to_string(), "/srv/models".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.catalog_source, CatalogSource::Training);
        assert!(config.legacy_enabled);
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
    }
}
