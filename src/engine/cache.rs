//! In-memory TTL cache of per-match analysis records.
//!
//! A refresh replaces the whole set and stamps the refresh time; the set is
//! considered fresh for `ttl` after that. Lifecycle:
//!
//!   Stale ──begin_refresh──▶ Refreshing ──complete_refresh──▶ Fresh
//!     ▲                           │                             │
//!     └──────abort_refresh────────┘◀──────── ttl elapsed ───────┘
//!
//! An aborted refresh (provider down) keeps the previous entries and the
//! previous stamp, so the cache stays stale and the next call retries.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::simulation::SimulationResult;
use crate::matches::models::{Match, MatchStats, OddsQuote};

/// Everything the engine needs to rank one fixture, computed once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub fixture: Match,
    pub stats: MatchStats,
    pub odds: OddsQuote,
    /// Home-win probability from the form model
    pub home_probability: f64,
    pub simulation: Option<SimulationResult>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Stale,
    Refreshing,
    Fresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub status: CacheStatus,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub ttl_secs: i64,
    pub entries: usize,
}

/// Thread-safe analysis cache.
#[derive(Clone)]
pub struct AnalysisCache {
    inner: Arc<RwLock<CacheInner>>,
    ttl: Duration,
}

struct CacheInner {
    /// In fixture order as delivered by the provider
    entries: Vec<CacheEntry>,
    refreshed_at: Option<DateTime<Utc>>,
    refreshing: bool,
}

impl CacheInner {
    fn status_at(&self, now: DateTime<Utc>, ttl: Duration) -> CacheStatus {
        if self.refreshing {
            return CacheStatus::Refreshing;
        }
        match self.refreshed_at {
            Some(at) if now - at < ttl => CacheStatus::Fresh,
            _ => CacheStatus::Stale,
        }
    }
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        AnalysisCache {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: Vec::new(),
                refreshed_at: None,
                refreshing: false,
            })),
            ttl,
        }
    }

    pub async fn status_at(&self, now: DateTime<Utc>) -> CacheStatus {
        self.inner.read().await.status_at(now, self.ttl)
    }

    pub async fn status(&self) -> CacheStatus {
        self.status_at(Utc::now()).await
    }

    /// Mark the cache as refreshing. Returns `false` when it is not stale at
    /// `now` (fresh, or another refresh already in flight).
    pub async fn begin_refresh(&self, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.status_at(now, self.ttl) != CacheStatus::Stale {
            return false;
        }
        inner.refreshing = true;
        true
    }

    /// Replace all entries and stamp the refresh time. Later duplicates of a
    /// fixture ID are dropped.
    pub async fn complete_refresh(&self, entries: Vec<CacheEntry>, at: DateTime<Utc>) {
        let mut seen = HashSet::new();
        let entries: Vec<CacheEntry> = entries
            .into_iter()
            .filter(|e| seen.insert(e.fixture.id.clone()))
            .collect();

        let mut inner = self.inner.write().await;
        inner.entries = entries;
        inner.refreshed_at = Some(at);
        inner.refreshing = false;
        debug!("AnalysisCache: {} entries, refreshed at {}", inner.entries.len(), at);
    }

    /// Leave the refreshing state without touching entries or the stamp.
    pub async fn abort_refresh(&self) {
        self.inner.write().await.refreshing = false;
    }

    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.inner.read().await.entries.clone()
    }

    pub async fn get(&self, match_id: &str) -> Option<CacheEntry> {
        self.inner
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.fixture.id == match_id)
            .cloned()
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let inner = self.inner.read().await;
        CacheSnapshot {
            status: inner.status_at(Utc::now(), self.ttl),
            refreshed_at: inner.refreshed_at,
            ttl_secs: self.ttl.num_seconds(),
            entries: inner.entries.len(),
        }
    }

    /// Number of cached fixtures.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
