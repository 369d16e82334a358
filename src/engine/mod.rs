pub mod cache;
pub mod confidence;
pub mod kelly;
pub mod probability;
pub mod recommend;
pub mod simulation;
pub mod strategy;
pub mod value;

pub use cache::{AnalysisCache, CacheSnapshot, CacheStatus};
pub use confidence::ConfidenceTier;
pub use recommend::{AnalysisFilters, Recommendation};
pub use strategy::{EngineSettings, RecommendationEngine};
pub use value::ValueThresholds;
