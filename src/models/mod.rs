use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod mapping;

pub use mapping::IdentityMapping;

/// One podcast's public record, as normalized from the content service or
/// loaded from the training catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub podcast_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// Upstream fields with no normalized counterpart
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    pub fn new(podcast_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            podcast_id: podcast_id.into(),
            title: title.into(),
            category: None,
            topics: None,
            duration_minutes: None,
            content_url: None,
            extra: Map::new(),
        }
    }
}

/// A catalog entry paired with its synthesized score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub podcast_id: String,
    pub title: String,
    /// Rounded to two decimal places
    pub predicted_rating: f64,
    pub category: Option<String>,
    pub topics: Option<String>,
    pub duration_minutes: Option<u32>,
    pub content_url: Option<String>,
}

impl Recommendation {
    pub fn from_entry(entry: &CatalogEntry, score: f64) -> Self {
        Self {
            podcast_id: entry.podcast_id.clone(),
            title: entry.title.clone(),
            predicted_rating: round_rating(score),
            category: entry.category.clone(),
            topics: entry.topics.clone(),
            duration_minutes: entry.duration_minutes,
            content_url: entry.content_url.clone(),
        }
    }
}

/// A historical rating from the training data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: String,
    pub podcast_id: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

fn round_rating(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_rounds_to_two_decimals() {
        let entry = CatalogEntry::new("p_00001", "Morning Habits");
        let rec = Recommendation::from_entry(&entry, 3.14159);
        assert_eq!(rec.predicted_rating, 3.14);

        let rec = Recommendation::from_entry(&entry, 4.005_1);
        assert_eq!(rec.predicted_rating, 4.01);
    }

    #[test]
    fn test_catalog_entry_skips_absent_fields() {
        let entry = CatalogEntry::new("p_00001", "Morning Habits");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "podcast_id": "p_00001", "title": "Morning Habits" })
        );
    }

    #[test]
    fn test_catalog_entry_deserializes_training_record() {
        let entry: CatalogEntry = serde_json::from_value(serde_json::json!({
            "podcast_id": "p_00003",
            "title": "Lesson 4",
            "category": "Career",
            "topics": "Topic about career",
            "duration_minutes": 18
        }))
        .unwrap();

        assert_eq!(entry.category.as_deref(), Some("Career"));
        assert_eq!(entry.duration_minutes, Some(18));
        assert_eq!(entry.content_url, None);
        assert!(entry.extra.is_empty());
    }

    #[test]
    fn test_catalog_entry_flattens_extra_fields() {
        let mut entry = CatalogEntry::new("p_00001", "Morning Habits");
        entry.extra.insert("host".to_string(), serde_json::json!("Ana"));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "podcast_id": "p_00001", "title": "Morning Habits", "host": "Ana" })
        );
        assert_eq!(serde_json::from_value::<CatalogEntry>(json).unwrap(), entry);
    }
}
