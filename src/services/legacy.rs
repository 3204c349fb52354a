//! Batch-model recommendations over the training catalog.
//!
//! The user is scored against every encoded podcast in a single predict call;
//! podcasts the user already rated are excluded.
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, IdentityMapping, Rating},
    services::artifacts::Artifacts,
};

pub const DEFAULT_LEGACY_COUNT: usize = 10;

/// A trained model that predicts ratings for one user over many items
pub trait BatchModel: Send + Sync {
    /// One prediction per entry of `podcast_indices`, in the same order
    fn predict(&self, user_index: usize, podcast_indices: &[usize]) -> AppResult<Vec<f32>>;
}

/// Matrix-factorization weights exported from training.
///
/// `rating = global_bias + user_bias[u] + item_bias[i] + <user_emb[u], item_emb[i]>`
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixFactorizationModel {
    user_embeddings: Vec<Vec<f32>>,
    item_embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    user_bias: Vec<f32>,
    #[serde(default)]
    item_bias: Vec<f32>,
    #[serde(default)]
    global_bias: f32,
}

impl MatrixFactorizationModel {
    pub fn new(user_embeddings: Vec<Vec<f32>>, item_embeddings: Vec<Vec<f32>>) -> AppResult<Self> {
        let model = Self {
            user_embeddings,
            item_embeddings,
            user_bias: Vec::new(),
            item_bias: Vec::new(),
            global_bias: 0.0,
        };
        model.validate()?;
        Ok(model)
    }

    /// Reads and validates the exported model file
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Artifact(format!("{}: {}", path.display(), e)))?;
        let model: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Artifact(format!("{}: {}", path.display(), e)))?;
        model.validate()?;

        tracing::info!(
            users = model.user_embeddings.len(),
            items = model.item_embeddings.len(),
            dim = model.dimension(),
            "Loaded batch model"
        );

        Ok(model)
    }

    fn dimension(&self) -> usize {
        self.user_embeddings
            .first()
            .or(self.item_embeddings.first())
            .map_or(0, Vec::len)
    }

    fn validate(&self) -> AppResult<()> {
        let dim = self.dimension();
        let ragged = self
            .user_embeddings
            .iter()
            .chain(self.item_embeddings.iter())
            .any(|row| row.len() != dim);
        if ragged {
            return Err(AppError::Artifact(
                "embedding rows have inconsistent dimensions".to_string(),
            ));
        }

        if !self.user_bias.is_empty() && self.user_bias.len() != self.user_embeddings.len() {
            return Err(AppError::Artifact("user_bias length mismatch".to_string()));
        }
        if !self.item_bias.is_empty() && self.item_bias.len() != self.item_embeddings.len() {
            return Err(AppError::Artifact("item_bias length mismatch".to_string()));
        }

        Ok(())
    }
}

impl BatchModel for MatrixFactorizationModel {
    fn predict(&self, user_index: usize, podcast_indices: &[usize]) -> AppResult<Vec<f32>> {
        let user = self.user_embeddings.get(user_index).ok_or_else(|| {
            AppError::Internal(format!("user index {} outside model", user_index))
        })?;
        let user_bias = self.user_bias.get(user_index).copied().unwrap_or(0.0);

        podcast_indices
            .iter()
            .map(|&item_index| {
                let item = self.item_embeddings.get(item_index).ok_or_else(|| {
                    AppError::Internal(format!("podcast index {} outside model", item_index))
                })?;
                let item_bias = self.item_bias.get(item_index).copied().unwrap_or(0.0);
                let dot: f32 = user.iter().zip(item).map(|(u, i)| u * i).sum();
                Ok(self.global_bias + user_bias + item_bias + dot)
            })
            .collect()
    }
}

/// Scores unrated training-catalog podcasts with a [`BatchModel`]
#[derive(Clone)]
pub struct LegacyRecommender {
    model: Arc<dyn BatchModel>,
    mapping: Arc<IdentityMapping>,
    rated: Arc<HashMap<String, HashSet<usize>>>,
    catalog: Arc<HashMap<String, CatalogEntry>>,
}

impl LegacyRecommender {
    pub fn new(model: Arc<dyn BatchModel>, artifacts: &Artifacts) -> Self {
        Self {
            model,
            mapping: Arc::clone(&artifacts.mapping),
            rated: Arc::new(index_ratings(&artifacts.ratings, &artifacts.mapping)),
            catalog: Arc::new(
                artifacts
                    .training_catalog
                    .iter()
                    .map(|entry| (entry.podcast_id.clone(), entry.clone()))
                    .collect(),
            ),
        }
    }

    /// Returns catalog records for the user's top `count` unrated podcasts.
    ///
    /// Users unknown to the identity mapping are `NotFound`.
    pub fn recommend(&self, user_id: &str, count: usize) -> AppResult<Vec<CatalogEntry>> {
        let user_index = self.mapping.user_index(user_id).ok_or_else(|| {
            AppError::NotFound(format!("User {} not found in the training data.", user_id))
        })?;

        let heard = self.rated.get(user_id);
        let candidates: Vec<usize> = self
            .mapping
            .podcast_indices()
            .into_iter()
            .filter(|index| heard.map_or(true, |h| !h.contains(index)))
            .collect();

        tracing::debug!(user_id = %user_id, candidates = candidates.len(), "Running batch prediction");
        let predictions = self.model.predict(user_index, &candidates)?;
        if predictions.len() != candidates.len() {
            return Err(AppError::Internal(format!(
                "model returned {} predictions for {} podcasts",
                predictions.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<(usize, f32)> = candidates.into_iter().zip(predictions).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let records: Vec<CatalogEntry> = scored
            .into_iter()
            .take(count)
            .filter_map(|(index, _)| self.mapping.podcast_id(index))
            .filter_map(|podcast_id| self.catalog.get(podcast_id).cloned())
            .collect();

        tracing::info!(user_id = %user_id, returned = records.len(), "Generated batch recommendations");

        Ok(records)
    }
}

fn index_ratings(ratings: &[Rating], mapping: &IdentityMapping) -> HashMap<String, HashSet<usize>> {
    let mut rated: HashMap<String, HashSet<usize>> = HashMap::new();
    for rating in ratings {
        if let Some(index) = mapping.podcast_index(&rating.podcast_id) {
            rated.entry(rating.user_id.clone()).or_default().insert(index);
        }
    }
    rated
}
