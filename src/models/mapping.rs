use std::collections::HashMap;

use serde::Deserialize;

/// Bidirectional association between raw user/podcast identifiers and the
/// dense indices the model was trained with.
///
/// Built once at load time and never mutated afterwards. Lookups for unknown
/// identifiers return `None`.
#[derive(Debug, Clone, Default)]
pub struct IdentityMapping {
    user_to_index: HashMap<String, usize>,
    index_to_user: HashMap<usize, String>,
    podcast_to_index: HashMap<String, usize>,
    index_to_podcast: HashMap<usize, String>,
}

/// On-disk shape of the mapping artifact
#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    user2user_encoded: HashMap<String, usize>,
    #[serde(default)]
    podcast2podcast_encoded: HashMap<String, usize>,
}

impl IdentityMapping {
    pub fn new(
        users: impl IntoIterator<Item = (String, usize)>,
        podcasts: impl IntoIterator<Item = (String, usize)>,
    ) -> Self {
        let user_to_index: HashMap<String, usize> = users.into_iter().collect();
        let podcast_to_index: HashMap<String, usize> = podcasts.into_iter().collect();
        let index_to_user = user_to_index
            .iter()
            .map(|(id, idx)| (*idx, id.clone()))
            .collect();
        let index_to_podcast = podcast_to_index
            .iter()
            .map(|(id, idx)| (*idx, id.clone()))
            .collect();

        Self {
            user_to_index,
            index_to_user,
            podcast_to_index,
            index_to_podcast,
        }
    }

    /// Parses the JSON mapping artifact (`user2user_encoded` / `podcast2podcast_encoded`)
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let file: MappingFile = serde_json::from_str(json)?;
        Ok(Self::new(file.user2user_encoded, file.podcast2podcast_encoded))
    }

    pub fn user_index(&self, user_id: &str) -> Option<usize> {
        self.user_to_index.get(user_id).copied()
    }

    pub fn podcast_index(&self, podcast_id: &str) -> Option<usize> {
        self.podcast_to_index.get(podcast_id).copied()
    }

    pub fn user_id(&self, index: usize) -> Option<&str> {
        self.index_to_user.get(&index).map(String::as_str)
    }

    pub fn podcast_id(&self, index: usize) -> Option<&str> {
        self.index_to_podcast.get(&index).map(String::as_str)
    }

    /// Every encoded podcast index, ascending
    pub fn podcast_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.podcast_to_index.values().copied().collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn user_count(&self) -> usize {
        self.user_to_index.len()
    }

    pub fn podcast_count(&self) -> usize {
        self.podcast_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_to_index.is_empty() && self.podcast_to_index.is_empty()
    }
}
