use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use xxhash_rust::xxh3::xxh3_64;

use crate::models::IdentityMapping;

const SEED_MODULUS: u64 = 10_000;
const USER_SEED_FACTOR: u64 = 7;
const ITEM_SEED_FACTOR: u64 = 11;

const MAPPED_MEAN: f64 = 4.0;
const MAPPED_STD_DEV: f64 = 0.8;
pub const MAPPED_RANGE: (f64, f64) = (1.0, 5.0);

pub const UNMAPPED_RANGE: (f64, f64) = (2.5, 4.5);

/// Predicts how much a user will like a podcast
pub trait Scorer: Send + Sync {
    fn score(&self, user_id: &str, podcast_id: &str) -> f64;
}

/// Deterministic stand-in for a trained model.
///
/// Pairs known to the identity mapping draw from a normal distribution seeded
/// by their encoded indices; anything else draws uniformly from a narrower
/// band seeded by a hash of the raw identifiers. Same inputs, same score.
#[derive(Clone)]
pub struct SeededScorer {
    mapping: Arc<IdentityMapping>,
}

impl SeededScorer {
    pub fn new(mapping: Arc<IdentityMapping>) -> Self {
        Self { mapping }
    }

    fn mapped_score(user_index: usize, podcast_index: usize) -> f64 {
        let seed = (user_index as u64)
            .wrapping_mul(USER_SEED_FACTOR)
            .wrapping_add((podcast_index as u64).wrapping_mul(ITEM_SEED_FACTOR))
            % SEED_MODULUS;
        let mut rng = StdRng::seed_from_u64(seed);

        let draw = Normal::new(MAPPED_MEAN, MAPPED_STD_DEV)
            .map(|normal| normal.sample(&mut rng))
            .unwrap_or(MAPPED_MEAN);

        draw.clamp(MAPPED_RANGE.0, MAPPED_RANGE.1)
    }

    fn unmapped_score(user_id: &str, podcast_id: &str) -> f64 {
        let mut key = String::with_capacity(user_id.len() + podcast_id.len());
        key.push_str(user_id);
        key.push_str(podcast_id);

        let seed = xxh3_64(key.as_bytes()) % SEED_MODULUS;
        let mut rng = StdRng::seed_from_u64(seed);

        rng.random_range(UNMAPPED_RANGE.0..UNMAPPED_RANGE.1)
    }
}

impl Scorer for SeededScorer {
    fn score(&self, user_id: &str, podcast_id: &str) -> f64 {
        match (
            self.mapping.user_index(user_id),
            self.mapping.podcast_index(podcast_id),
        ) {
            (Some(user_index), Some(podcast_index)) => Self::mapped_score(user_index, podcast_index),
            _ => Self::unmapped_score(user_id, podcast_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SeededScorer {
        let users = (0..20).map(|i| (format!("user_{}", i), i));
        let podcasts = (0..50).map(|i| (format!("p_{:05}", i), i));
        SeededScorer::new(Arc::new(IdentityMapping::new(users, podcasts)))
    }

    #[test]
    fn test_scores_are_deterministic() {
        let scorer = scorer();
        assert_eq!(scorer.score("user_1", "p_00003"), scorer.score("user_1", "p_00003"));
        assert_eq!(
            scorer.score("stranger", "0f8fad5b-d9cb-469f-a165-70867728950e"),
            scorer.score("stranger", "0f8fad5b-d9cb-469f-a165-70867728950e")
        );

        let other = self::scorer();
        assert_eq!(scorer.score("user_4", "p_00010"), other.score("user_4", "p_00010"));
    }

    #[test]
    fn test_mapped_scores_stay_in_range() {
        let scorer = scorer();
        for u in 0..20 {
            for p in 0..50 {
                let score = scorer.score(&format!("user_{}", u), &format!("p_{:05}", p));
                assert!((MAPPED_RANGE.0..=MAPPED_RANGE.1).contains(&score), "{}", score);
            }
        }
    }

    #[test]
    fn test_unmapped_scores_stay_in_range() {
        let scorer = scorer();
        for i in 0..500 {
            let score = scorer.score("user_1", &format!("unknown-{}", i));
            assert!((UNMAPPED_RANGE.0..UNMAPPED_RANGE.1).contains(&score), "{}", score);

            let score = scorer.score(&format!("new-user-{}", i), "p_00001");
            assert!((UNMAPPED_RANGE.0..UNMAPPED_RANGE.1).contains(&score), "{}", score);
        }
    }

    #[test]
    fn test_pairs_with_equal_seeds_score_equally() {
        let scorer = scorer();
        let a = scorer.score("user_11", "p_00000"); // 77
        let b = scorer.score("user_0", "p_00007"); // 77
        assert_eq!(a, b);
    }
}
