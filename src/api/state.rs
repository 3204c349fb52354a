use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::cache::CatalogCache;
use crate::config::{CatalogSource, Config};
use crate::services::artifacts::{model_path, Artifacts};
use crate::services::providers::{
    CatalogProvider, ContentServiceClient, UserDirectory, UserServiceClient,
};
use crate::services::{
    Candidates, LegacyRecommender, MatrixFactorizationModel, RecommendationService, SeededScorer,
};

pub const SERVICE_NAME: &str = "podcast-recommendation";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

/// Everything a request handler may need, built once at startup
#[derive(Clone)]
pub struct AppStateInner {
    pub artifacts: Artifacts,
    pub recommendations: RecommendationService,
    /// Present only when the batch-model route is enabled
    pub legacy: Option<LegacyRecommender>,
    pub catalog_provider: Arc<dyn CatalogProvider>,
    pub user_directory: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wires the live-data pipeline around the given artifacts and upstreams
    pub fn new(
        artifacts: Artifacts,
        catalog_provider: Arc<dyn CatalogProvider>,
        user_directory: Arc<dyn UserDirectory>,
        source: CatalogSource,
        catalog_ttl: Duration,
    ) -> Self {
        let candidates = match source {
            CatalogSource::Live => Candidates::Live {
                cache: CatalogCache::new(Arc::clone(&catalog_provider)),
                ttl: catalog_ttl,
            },
            CatalogSource::Training => {
                Candidates::Training(Arc::clone(&artifacts.training_catalog))
            }
        };
        let scorer = Arc::new(SeededScorer::new(Arc::clone(&artifacts.mapping)));
        let recommendations = RecommendationService::new(candidates, scorer, artifacts.loaded);

        Self {
            inner: Arc::new(AppStateInner {
                artifacts,
                recommendations,
                legacy: None,
                catalog_provider,
                user_directory,
            }),
        }
    }

    /// Enables the batch-model route
    pub fn with_legacy(self, legacy: LegacyRecommender) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.inner);
        inner.legacy = Some(legacy);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Builds the full state from configuration.
    ///
    /// Missing artifacts degrade to defaults. When the legacy route is
    /// enabled, a missing or unreadable model file is an error.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let artifacts = Artifacts::load_or_unloaded(&config.model_dir);

        let catalog_provider = Arc::new(ContentServiceClient::new(
            config.content_service_url.clone(),
            config.catalog_page_size,
            config.upstream_timeout(),
        )?);
        let user_directory = Arc::new(UserServiceClient::new(
            config.user_service_url.clone(),
            config.upstream_timeout(),
        )?);

        let legacy = if config.legacy_enabled {
            let path = model_path(&config.model_dir);
            let model = MatrixFactorizationModel::load(&path)
                .with_context(|| format!("failed to load batch model from {}", path.display()))?;
            Some(LegacyRecommender::new(Arc::new(model), &artifacts))
        } else {
            None
        };

        let state = Self::new(
            artifacts,
            catalog_provider,
            user_directory,
            config.catalog_source,
            config.catalog_ttl(),
        );

        Ok(match legacy {
            Some(legacy) => state.with_legacy(legacy),
            None => state,
        })
    }
}
