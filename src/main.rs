use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod engine;
mod error;
mod ledger;
mod matches;

use api::AppState;
use config::{Config, LedgerBackend};
use engine::RecommendationEngine;
use ledger::{BankrollLedger, JsonLedgerStore, LedgerStore, SqliteLedgerStore};
use matches::{FootballDataProvider, FormTableAnalyst, MatchAnalyst, MatchProvider};

/// Picks logged after the startup warm-up.
const STARTUP_PICKS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.football_data_api_key.is_none() {
        warn!("FOOTBALL_DATA_API_KEY not set; football-data.org may reject or throttle requests");
    }

    // Open the bankroll ledger
    let store: Arc<dyn LedgerStore> = match config.ledger_backend {
        LedgerBackend::Json => Arc::new(JsonLedgerStore::new(&config.ledger_path)),
        LedgerBackend::Sqlite => Arc::new(SqliteLedgerStore::open(&config.ledger_path)?),
    };
    let ledger = BankrollLedger::load(store, config.initial_balance);
    let (bet_count, balance) = ledger.summary();
    info!("Bankroll: {:.2} after {} settled bet(s)", balance, bet_count);

    // Collaborators: fixtures from football-data.org, stats and odds from the form table
    let provider: Arc<dyn MatchProvider> = Arc::new(FootballDataProvider::new(
        config.football_data_api_key.clone(),
        &config.football_data_url,
    )?);
    let analyst: Arc<dyn MatchAnalyst> = Arc::new(FormTableAnalyst::default());

    let engine = RecommendationEngine::new(provider, analyst, ledger, config.engine_settings());
    let default_filters = config.default_filters();

    // Warm the cache so the first API call is served from it
    match engine.analyze(None, &default_filters).await {
        Ok(recs) if recs.is_empty() => info!("No value bets today"),
        Ok(recs) => {
            info!("{} value bet(s) today", recs.len());
            for r in recs.iter().take(STARTUP_PICKS) {
                info!(
                    "  {} {} | {} @ {:.2} | p={:.2} EV={:+.3} | stake {:.2}",
                    r.confidence, r.label, r.pick, r.odds, r.probability, r.expected_value, r.stake
                );
            }
        }
        Err(e) => warn!("Startup analysis failed: {}", e),
    }

    // Run the JSON API (blocks until shutdown)
    let app = api::router(AppState {
        engine,
        default_filters,
    });
    let addr: SocketAddr = config.api_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
