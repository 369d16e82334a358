use async_trait::async_trait;

use super::models::{Match, MatchStats, OddsQuote};
use crate::error::EngineError;

/// Trait that every match-data provider must implement.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Return today's fixtures. Network, auth and rate-limit failures are
    /// reported as `EngineError::UpstreamUnavailable`.
    async fn fetch_todays_matches(&self) -> Result<Vec<Match>, EngineError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Source of per-match statistics and three-way odds.
///
/// Deterministic from the engine's point of view: the same fixture always
/// yields the same stats, the same forms always yield the same quote.
#[async_trait]
pub trait MatchAnalyst: Send + Sync {
    async fn stats_for(&self, m: &Match) -> Result<MatchStats, EngineError>;

    fn odds_for(&self, form_home: u8, form_away: u8) -> Result<OddsQuote, EngineError>;
}
