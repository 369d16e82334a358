use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::cache::{AnalysisCache, CacheEntry, CacheSnapshot, CacheStatus};
use super::probability::ProbabilityModel;
use super::recommend::{build_recommendations, AnalysisFilters, Recommendation};
use super::simulation::simulate;
use crate::error::EngineError;
use crate::ledger::{BankrollLedger, BetOutcome, BetRecord, LedgerStatistics};
use crate::matches::models::Match;
use crate::matches::provider::{MatchAnalyst, MatchProvider};

/// Tuning knobs of the recommendation engine that do not change per call.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Fractional Kelly multiplier (0 < f ≤ 1)
    pub kelly_fraction: f64,
    /// Maximum matches scored concurrently during a refresh
    pub workers: usize,
    /// Budget for scoring one match
    pub worker_timeout: Duration,
    /// How long a refresh stays fresh
    pub cache_ttl: chrono::Duration,
    /// Monte Carlo runs per match; 0 disables the three-way simulation
    pub simulation_runs: u32,
    /// Also consider the draw when the simulation priced it
    pub include_draw: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            kelly_fraction: 0.25,
            workers: 8,
            worker_timeout: Duration::from_secs(10),
            cache_ttl: chrono::Duration::seconds(3600),
            simulation_runs: 10_000,
            include_draw: false,
        }
    }
}

/// The recommendation engine. Cheap to clone; clones share the cache, the
/// ledger and the refresh gate.
///
/// `analyze` reads the cache and refreshes it first when stale. The refresh
/// runs in its own task, so a caller that gives up waiting does not cancel
/// it. Only `settle` writes to the ledger.
#[derive(Clone)]
pub struct RecommendationEngine {
    provider: Arc<dyn MatchProvider>,
    analyst: Arc<dyn MatchAnalyst>,
    model: ProbabilityModel,
    cache: AnalysisCache,
    ledger: BankrollLedger,
    settings: EngineSettings,
    /// Held for the whole refresh; one refresh at a time.
    refresh_gate: Arc<Mutex<()>>,
}

impl RecommendationEngine {
    pub fn new(
        provider: Arc<dyn MatchProvider>,
        analyst: Arc<dyn MatchAnalyst>,
        ledger: BankrollLedger,
        settings: EngineSettings,
    ) -> Self {
        RecommendationEngine {
            provider,
            analyst,
            model: ProbabilityModel::new(),
            cache: AnalysisCache::new(settings.cache_ttl),
            ledger,
            settings,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Ranked recommendations for today's matches.
    ///
    /// `bankroll` sizes the stakes; `None` uses the ledger balance. Upstream
    /// and per-match failures only shrink the result. Never touches the
    /// ledger.
    pub async fn analyze(
        &self,
        bankroll: Option<f64>,
        filters: &AnalysisFilters,
    ) -> Result<Vec<Recommendation>, EngineError> {
        if let Some(b) = bankroll {
            if !b.is_finite() || b < 0.0 {
                return Err(EngineError::invalid(format!(
                    "bankroll must be a non-negative amount, got {}",
                    b
                )));
            }
        }
        filters.validate()?;

        self.ensure_fresh().await;

        let bankroll = bankroll.unwrap_or_else(|| self.ledger.balance());
        let entries = self.cache.entries().await;
        let recs = build_recommendations(
            &entries,
            bankroll,
            filters,
            self.settings.kelly_fraction,
            self.settings.include_draw,
        );
        debug!(
            "Analysis: {} recommendation(s) from {} cached match(es), bankroll {:.2}",
            recs.len(),
            entries.len(),
            bankroll
        );
        Ok(recs)
    }

    /// Refresh the cache if it is not fresh, waiting for the result.
    async fn ensure_fresh(&self) {
        if self.cache.status().await == CacheStatus::Fresh {
            return;
        }
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            // The caller may be gone by now; nobody else would leave Refreshing.
            if AssertUnwindSafe(engine.refresh()).catch_unwind().await.is_err() {
                error!("Cache refresh panicked, cache left stale");
                engine.cache.abort_refresh().await;
            }
        });
        if let Err(e) = handle.await {
            error!("Cache refresh task failed: {}", e);
            self.cache.abort_refresh().await;
        }
    }

    /// Fetch today's matches and score them into the cache. Returns the number
    /// of cached entries, or `None` when no refresh was performed (already
    /// fresh, or the provider failed).
    pub async fn refresh(&self) -> Option<usize> {
        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited for the gate.
        if !self.cache.begin_refresh(Utc::now()).await {
            return None;
        }

        let started = Instant::now();
        let matches = match self.provider.fetch_todays_matches().await {
            Ok(matches) => matches,
            Err(e) => {
                let kept = self.cache.len().await;
                warn!(
                    "{} unavailable, keeping {} cached match(es): {}",
                    self.provider.name(),
                    kept,
                    e
                );
                self.cache.abort_refresh().await;
                return None;
            }
        };
        let total = matches.len();
        info!("Fetched {} match(es) from {}", total, self.provider.name());

        let timeout = self.settings.worker_timeout;
        let scored: Vec<(usize, Option<CacheEntry>)> = stream::iter(matches.into_iter().enumerate())
            .map(|(idx, m)| async move {
                let label = m.label();
                match tokio::time::timeout(timeout, self.score_match(m)).await {
                    Ok(Ok(entry)) => (idx, Some(entry)),
                    Ok(Err(e)) => {
                        warn!("Skipping {}: {}", label, e);
                        (idx, None)
                    }
                    Err(_) => {
                        warn!("Scoring {} timed out after {:?}", label, timeout);
                        (idx, None)
                    }
                }
            })
            .buffer_unordered(self.settings.workers.max(1))
            .collect()
            .await;

        // Each worker owns one slot; fixture order is restored here.
        let mut slots: Vec<Option<CacheEntry>> = vec![None; total];
        for (idx, entry) in scored {
            slots[idx] = entry;
        }
        let entries: Vec<CacheEntry> = slots.into_iter().flatten().collect();
        let count = entries.len();

        self.cache.complete_refresh(entries, Utc::now()).await;
        info!(
            "Cache refreshed: {}/{} match(es) scored in {} ms",
            count,
            total,
            started.elapsed().as_millis()
        );
        Some(count)
    }

    /// Full per-match pipeline: stats → probability → odds → simulation.
    async fn score_match(&self, m: Match) -> Result<CacheEntry, EngineError> {
        let stats = self.analyst.stats_for(&m).await?;
        stats.validate()?;
        let home_probability = self.model.estimate_or_neutral(&stats);
        let odds = self.analyst.odds_for(stats.form_home, stats.form_away)?;
        let simulation = simulate(&stats, &m.id, self.settings.simulation_runs);

        Ok(CacheEntry {
            fixture: m,
            stats,
            odds,
            home_probability,
            simulation,
            fetched_at: Utc::now(),
        })
    }

    /// Record the realised outcome of one of our recommendations.
    ///
    /// When the fixture is still cached, the quoted odds must match the
    /// cached price for the picked outcome.
    pub async fn settle(
        &self,
        recommendation: &Recommendation,
        outcome: BetOutcome,
    ) -> Result<f64, EngineError> {
        if let Some(entry) = self.cache.get(&recommendation.match_id).await {
            let quoted = entry.odds.price(recommendation.outcome);
            if (quoted - recommendation.odds).abs() > 1e-9 {
                return Err(EngineError::invalid(format!(
                    "odds {:.2} for {} do not match the cached price {:.2}",
                    recommendation.odds, recommendation.label, quoted
                )));
            }
        }
        self.ledger.settle_outcome(
            &recommendation.label,
            recommendation.stake,
            outcome,
            recommendation.odds,
        )
    }

    pub fn statistics(&self) -> LedgerStatistics {
        self.ledger.statistics()
    }

    pub fn bets(&self) -> Vec<BetRecord> {
        self.ledger.bets()
    }

    pub async fn cache_snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot().await
    }

    pub fn ledger(&self) -> &BankrollLedger {
        &self.ledger
    }
}
