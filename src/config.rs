use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::engine::{AnalysisFilters, EngineSettings, ValueThresholds};

/// Where the bankroll ledger is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerBackend {
    Json,
    Sqlite,
}

/// Value-bet recommendation engine for football fixtures
#[derive(Parser, Debug, Clone)]
#[command(name = "valuebet-engine", version, about)]
pub struct Config {
    /// Bankroll a fresh ledger starts with
    #[arg(long, env = "INITIAL_BALANCE", default_value = "50000.0")]
    pub initial_balance: f64,

    /// Ledger file (JSON document or SQLite database, per LEDGER_BACKEND)
    #[arg(long, env = "LEDGER_PATH", default_value = "bankroll_history.json")]
    pub ledger_path: String,

    /// Ledger storage backend
    #[arg(long, env = "LEDGER_BACKEND", value_enum, default_value = "json")]
    pub ledger_backend: LedgerBackend,

    /// API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// football-data.org API base URL
    #[arg(
        long,
        env = "FOOTBALL_DATA_URL",
        default_value = "https://api.football-data.org/v4"
    )]
    pub football_data_url: String,

    /// football-data.org API token (sent as X-Auth-Token)
    #[arg(long, env = "FOOTBALL_DATA_API_KEY")]
    pub football_data_api_key: Option<String>,

    /// Fractional Kelly multiplier (0.0–1.0)
    #[arg(long, env = "KELLY_FRACTION", default_value = "0.25")]
    pub kelly_fraction: f64,

    /// Stake cap as a fraction of bankroll (e.g. 0.05 = 5%)
    #[arg(long, env = "MAX_BET_PERCENT", default_value = "0.05")]
    pub max_bet_percent: f64,

    /// Minimum expected value per unit staked to call a bet value
    #[arg(long, env = "MIN_VALUE_THRESHOLD", default_value = "0.05")]
    pub min_value_threshold: f64,

    /// Minimum margin of our probability over the implied probability
    #[arg(long, env = "MIN_EDGE_MARGIN", default_value = "0.03")]
    pub min_edge_margin: f64,

    /// Minimum confidence rank to recommend (0 = avoid … 5 = five stars)
    #[arg(long, env = "MIN_CONFIDENCE", default_value = "1")]
    pub min_confidence: u8,

    /// Minimum probability of the chosen outcome
    #[arg(long, env = "MIN_PROBABILITY", default_value = "0.55")]
    pub min_probability: f64,

    /// Seconds a refreshed analysis stays valid
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "3600")]
    pub cache_ttl_secs: u64,

    /// Matches scored concurrently during a refresh
    #[arg(long, env = "WORKERS", default_value = "8")]
    pub workers: usize,

    /// Per-match scoring timeout in seconds
    #[arg(long, env = "WORKER_TIMEOUT_SECS", default_value = "10")]
    pub worker_timeout_secs: u64,

    /// Monte Carlo runs per match for the three-way simulation (0 = off)
    #[arg(long, env = "SIMULATION_RUNS", default_value = "10000")]
    pub simulation_runs: u32,

    /// Also recommend draws when the simulation prices them
    #[arg(long, env = "INCLUDE_DRAW", default_value = "false")]
    pub include_draw: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            anyhow::bail!("initial_balance must be positive");
        }
        if !(self.kelly_fraction > 0.0 && self.kelly_fraction <= 1.0) {
            anyhow::bail!("kelly_fraction must be in (0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&self.max_bet_percent) {
            anyhow::bail!("max_bet_percent must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            anyhow::bail!("min_probability must be between 0.0 and 1.0");
        }
        if self.min_confidence > 5 {
            anyhow::bail!("min_confidence must be between 0 and 5");
        }
        if !self.min_value_threshold.is_finite() || !self.min_edge_margin.is_finite() {
            anyhow::bail!("value thresholds must be finite");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.worker_timeout_secs == 0 {
            anyhow::bail!("worker_timeout_secs must be at least 1");
        }
        if self.cache_ttl().is_none() {
            anyhow::bail!("cache_ttl_secs is out of range");
        }
        if self.ledger_path.trim().is_empty() {
            anyhow::bail!("ledger_path must not be empty");
        }
        Ok(())
    }

    fn cache_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::from_std(Duration::from_secs(self.cache_ttl_secs)).ok()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            kelly_fraction: self.kelly_fraction,
            workers: self.workers,
            worker_timeout: Duration::from_secs(self.worker_timeout_secs),
            cache_ttl: self.cache_ttl().unwrap_or_else(chrono::Duration::zero),
            simulation_runs: self.simulation_runs,
            include_draw: self.include_draw,
        }
    }

    /// Filters applied when an API caller does not override them.
    pub fn default_filters(&self) -> AnalysisFilters {
        AnalysisFilters {
            min_confidence: self.min_confidence,
            min_probability: self.min_probability,
            thresholds: ValueThresholds {
                min_value: self.min_value_threshold,
                min_edge: self.min_edge_margin,
            },
            max_bet_percent: self.max_bet_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["valuebet-engine"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger_backend, LedgerBackend::Json);
        let filters = config.default_filters();
        assert_eq!(filters, AnalysisFilters::default());
    }

    #[test]
    fn test_engine_settings_mapping() {
        let config = parse(&["--workers", "3", "--cache-ttl-secs", "60", "--include-draw"]);
        let settings = config.engine_settings();
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.cache_ttl, chrono::Duration::seconds(60));
        assert!(settings.include_draw);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(parse(&["--kelly-fraction", "1.5"]).validate().is_err());
        assert!(parse(&["--kelly-fraction", "0"]).validate().is_err());
        assert!(parse(&["--max-bet-percent", "2"]).validate().is_err());
        assert!(parse(&["--min-confidence", "6"]).validate().is_err());
        assert!(parse(&["--workers", "0"]).validate().is_err());
        assert!(parse(&["--initial-balance=-10"]).validate().is_err());
    }

    #[test]
    fn test_sqlite_backend_flag() {
        let config = parse(&["--ledger-backend", "sqlite", "--ledger-path", "ledger.db"]);
        assert_eq!(config.ledger_backend, LedgerBackend::Sqlite);
    }
}
