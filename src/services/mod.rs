pub mod artifacts;
pub mod duration;
pub mod legacy;
pub mod normalize;
pub mod providers;
pub mod recommendations;
pub mod scoring;

pub use artifacts::Artifacts;
pub use legacy::{BatchModel, LegacyRecommender, MatrixFactorizationModel};
pub use recommendations::{Candidates, RecommendationService};
pub use scoring::{Scorer, SeededScorer};
