use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, IdentityMapping, Rating},
};

pub const MAPPINGS_FILE: &str = "mappings.json";
pub const PODCASTS_FILE: &str = "podcasts.json";
pub const RATINGS_FILE: &str = "ratings.json";
pub const METADATA_FILE: &str = "model_metadata.json";
pub const MODEL_FILE: &str = "collaborative_filtering_model.json";

/// Training artifacts loaded once at startup
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub mapping: Arc<IdentityMapping>,
    pub training_catalog: Arc<Vec<CatalogEntry>>,
    pub ratings: Arc<Vec<Rating>>,
    pub metadata: Value,
    /// False when a present artifact could not be read
    pub loaded: bool,
    pub loaded_at: DateTime<Utc>,
}

impl Artifacts {
    /// Loads every artifact under `dir`.
    ///
    /// Missing files fall back to empty defaults with a warning. A file that
    /// exists but cannot be parsed is an error.
    pub fn load(dir: &Path) -> AppResult<Self> {
        tracing::info!(dir = %dir.display(), "Loading model artifacts");

        let mapping = match read_optional(&dir.join(MAPPINGS_FILE))? {
            Some(raw) => IdentityMapping::from_json(&raw)
                .map_err(|e| AppError::Artifact(format!("{}: {}", MAPPINGS_FILE, e)))?,
            None => IdentityMapping::default(),
        };
        tracing::info!(
            users = mapping.user_count(),
            podcasts = mapping.podcast_count(),
            "Identity mapping ready"
        );

        let training_catalog: Vec<CatalogEntry> =
            parse_optional(dir, PODCASTS_FILE)?.unwrap_or_default();
        tracing::info!(count = training_catalog.len(), "Training catalog ready");

        let ratings: Vec<Rating> = parse_optional(dir, RATINGS_FILE)?.unwrap_or_default();
        tracing::info!(count = ratings.len(), "Training ratings ready");

        let metadata: Value = parse_optional(dir, METADATA_FILE)?.unwrap_or_else(default_metadata);

        Ok(Self {
            mapping: Arc::new(mapping),
            training_catalog: Arc::new(training_catalog),
            ratings: Arc::new(ratings),
            metadata,
            loaded: true,
            loaded_at: Utc::now(),
        })
    }

    /// Loads artifacts, degrading to an unloaded placeholder on failure
    pub fn load_or_unloaded(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load model artifacts; serving in reduced mode");
                Self::unloaded()
            }
        }
    }

    /// Empty artifacts flagged as not loaded
    pub fn unloaded() -> Self {
        Self {
            loaded: false,
            ..Self::empty()
        }
    }

    /// Empty but usable artifacts
    pub fn empty() -> Self {
        Self {
            mapping: Arc::new(IdentityMapping::default()),
            training_catalog: Arc::new(Vec::new()),
            ratings: Arc::new(Vec::new()),
            metadata: default_metadata(),
            loaded: true,
            loaded_at: Utc::now(),
        }
    }

    pub fn metadata_section(&self, key: &str) -> Value {
        self.metadata.get(key).cloned().unwrap_or_else(|| json!({}))
    }
}

pub fn model_path(dir: &Path) -> PathBuf {
    dir.join(MODEL_FILE)
}

fn default_metadata() -> Value {
    json!({ "model_info": { "version": "unknown" } })
}

fn read_optional(path: &Path) -> AppResult<Option<String>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Artifact not found, using empty default");
        return Ok(None);
    }

    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| AppError::Artifact(format!("{}: {}", path.display(), e)))
}

fn parse_optional<T: DeserializeOwned>(dir: &Path, file: &str) -> AppResult<Option<T>> {
    match read_optional(&dir.join(file))? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AppError::Artifact(format!("{}: {}", file, e))),
        None => Ok(None),
    }
}
