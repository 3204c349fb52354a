use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    cache::CatalogCache,
    error::{AppError, AppResult},
    models::{CatalogEntry, Recommendation},
    services::scoring::Scorer,
};

static GUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("valid regex")
});

/// Where ranking candidates come from
#[derive(Clone)]
pub enum Candidates {
    /// Cached live catalog; only GUID identifiers are kept
    Live { cache: CatalogCache, ttl: Duration },
    /// Catalog shipped with the training artifacts, used as-is
    Training(Arc<Vec<CatalogEntry>>),
}

/// Ranks catalog entries for a user
#[derive(Clone)]
pub struct RecommendationService {
    candidates: Candidates,
    scorer: Arc<dyn Scorer>,
    model_loaded: bool,
}

impl RecommendationService {
    pub fn new(candidates: Candidates, scorer: Arc<dyn Scorer>, model_loaded: bool) -> Self {
        Self {
            candidates,
            scorer,
            model_loaded,
        }
    }

    /// Returns up to `count` recommendations, best first.
    ///
    /// Fails with `NotFound` when no usable candidates exist. The live path
    /// never substitutes training data for an empty or invalid catalog.
    pub async fn recommend(&self, user_id: &str, count: usize) -> AppResult<Vec<Recommendation>> {
        if !self.model_loaded {
            return Err(AppError::ModelNotLoaded);
        }

        if count == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.load_candidates().await;
        if candidates.is_empty() {
            tracing::warn!(user_id = %user_id, "No candidate podcasts available");
            return Err(AppError::NotFound("No podcasts available".to_string()));
        }

        let recommendations = rank(user_id, &candidates, self.scorer.as_ref(), count);

        tracing::info!(
            user_id = %user_id,
            candidates = candidates.len(),
            returned = recommendations.len(),
            "Generated recommendations"
        );

        Ok(recommendations)
    }

    async fn load_candidates(&self) -> Vec<CatalogEntry> {
        match &self.candidates {
            Candidates::Live { cache, ttl } => {
                let catalog = cache.get(*ttl).await;
                let valid: Vec<CatalogEntry> = catalog
                    .iter()
                    .filter(|entry| is_guid(&entry.podcast_id))
                    .cloned()
                    .collect();

                let discarded = catalog.len() - valid.len();
                if discarded > 0 {
                    tracing::warn!(
                        discarded,
                        kept = valid.len(),
                        "Dropped catalog entries without a GUID identifier"
                    );
                }
                valid
            }
            Candidates::Training(catalog) => catalog.as_ref().clone(),
        }
    }
}

/// Scores every candidate, sorts by rating descending and keeps the top `count`.
///
/// Ties keep catalog order.
pub fn rank(
    user_id: &str,
    candidates: &[CatalogEntry],
    scorer: &dyn Scorer,
    count: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .map(|entry| Recommendation::from_entry(entry, scorer.score(user_id, &entry.podcast_id)))
        .collect();

    scored.sort_by(|a, b| b.predicted_rating.total_cmp(&a.predicted_rating));
    scored.truncate(count);
    scored
}

/// Strict 8-4-4-4-12 hexadecimal GUID check
pub fn is_guid(id: &str) -> bool {
    GUID_PATTERN.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdentityMapping;
    use crate::services::providers::MockCatalogProvider;
    use crate::services::scoring::SeededScorer;
    use std::collections::HashMap;

    struct FixedScorer(HashMap<String, f64>);

    impl Scorer for FixedScorer {
        fn score(&self, _user_id: &str, podcast_id: &str) -> f64 {
            self.0.get(podcast_id).copied().unwrap_or(0.0)
        }
    }

    fn guid(n: u32) -> String {
        format!("00000000-0000-4000-8000-{:012x}", n)
    }

    fn training_service(entries: Vec<CatalogEntry>, mapping: IdentityMapping) -> RecommendationService {
        RecommendationService::new(
            Candidates::Training(Arc::new(entries)),
            Arc::new(SeededScorer::new(Arc::new(mapping))),
            true,
        )
    }

    fn live_service(entries: Vec<CatalogEntry>) -> RecommendationService {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_fetch_catalog()
            .returning(move || Ok(entries.clone()));
        provider.expect_name().return_const("mock");

        RecommendationService::new(
            Candidates::Live {
                cache: CatalogCache::new(Arc::new(provider)),
                ttl: Duration::from_secs(60),
            },
            Arc::new(SeededScorer::new(Arc::new(IdentityMapping::default()))),
            true,
        )
    }

    #[test]
    fn test_guid_pattern() {
        assert!(is_guid("0f8fad5b-d9cb-469f-a165-70867728950e"));
        assert!(is_guid("0F8FAD5B-D9CB-469F-A165-70867728950E"));
        assert!(!is_guid("p_00001"));
        assert!(!is_guid("{0f8fad5b-d9cb-469f-a165-70867728950e}"));
        assert!(!is_guid("0f8fad5bd9cb469fa16570867728950e"));
        assert!(!is_guid("0f8fad5b-d9cb-469f-a165-70867728950e-"));
        assert!(!is_guid("zf8fad5b-d9cb-469f-a165-70867728950e"));
    }

    #[test]
    fn test_rank_sorts_descending_and_keeps_ties_in_catalog_order() {
        let entries: Vec<CatalogEntry> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| CatalogEntry::new(*id, id.to_uppercase()))
            .collect();
        let scorer = FixedScorer(HashMap::from([
            ("a".to_string(), 3.0),
            ("b".to_string(), 4.5),
            ("c".to_string(), 3.0),
            ("d".to_string(), 1.2),
        ]));

        let ranked = rank("user", &entries, &scorer, 10);
        let ids: Vec<&str> = ranked.iter().map(|r| r.podcast_id.as_str()).collect();

        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_rank_truncates() {
        let entries: Vec<CatalogEntry> =
            (0..8).map(|i| CatalogEntry::new(format!("p{}", i), "t")).collect();
        let scorer = FixedScorer(HashMap::new());

        assert_eq!(rank("u", &entries, &scorer, 3).len(), 3);
        assert_eq!(rank("u", &entries, &scorer, 20).len(), 8);
        assert!(rank("u", &entries, &scorer, 0).is_empty());
    }

    #[tokio::test]
    async fn test_known_user_gets_ranked_known_podcasts() {
        let podcasts: Vec<(String, usize)> =
            (1..=10).map(|i| (format!("p_{:05}", i), i - 1)).collect();
        let entries: Vec<CatalogEntry> = podcasts
            .iter()
            .map(|(id, _)| CatalogEntry::new(id.clone(), format!("Title {}", id)))
            .collect();
        let mapping = IdentityMapping::new(vec![("user_1".to_string(), 3)], podcasts.clone());
        let service = training_service(entries, mapping);

        let recs = service.recommend("user_1", 5).await.unwrap();

        assert_eq!(recs.len(), 5);
        assert!(recs
            .windows(2)
            .all(|pair| pair[0].predicted_rating >= pair[1].predicted_rating));
        assert!(recs
            .iter()
            .all(|r| podcasts.iter().any(|(id, _)| *id == r.podcast_id)));
        assert!(recs.iter().all(|r| (1.0..=5.0).contains(&r.predicted_rating)));
    }

    #[tokio::test]
    async fn test_count_zero_is_empty() {
        let service = training_service(
            vec![CatalogEntry::new("p_00001", "t")],
            IdentityMapping::default(),
        );
        assert!(service.recommend("user_1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_path_filters_non_guid_entries() {
        let service = live_service(vec![
            CatalogEntry::new(guid(1), "one"),
            CatalogEntry::new("p_00001", "legacy id"),
            CatalogEntry::new(guid(2), "two"),
        ]);

        let recs = service.recommend("someone", 10).await.unwrap();

        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| is_guid(&r.podcast_id)));
        // Rounding can lift a draw just under 4.5 onto the bound.
        assert!(recs.iter().all(|r| (2.5..=4.5).contains(&r.predicted_rating)));
    }

    #[tokio::test]
    async fn test_live_path_without_guid_candidates_is_not_found() {
        let service = live_service(vec![
            CatalogEntry::new("p_00001", "a"),
            CatalogEntry::new("17", "b"),
        ]);

        let result = service.recommend("someone", 5).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unloaded_model_is_error() {
        let service = RecommendationService::new(
            Candidates::Training(Arc::new(vec![CatalogEntry::new("p", "t")])),
            Arc::new(SeededScorer::new(Arc::new(IdentityMapping::default()))),
            false,
        );

        let result = service.recommend("user_1", 5).await;
        assert!(matches!(result, Err(AppError::ModelNotLoaded)));
    }
}
