use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::{AnalysisFilters, Recommendation, RecommendationEngine, ValueThresholds};
use crate::error::EngineError;
use crate::ledger::BetOutcome;

#[derive(Clone)]
pub struct AppState {
    pub engine: RecommendationEngine,
    /// Filters used when a query leaves a field out
    pub default_filters: AnalysisFilters,
}

/// Build the Axum router for the JSON API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/recommendations", get(recommendations_handler))
        .route("/api/settle", post(settle_handler))
        .route("/api/statistics", get(statistics_handler))
        .route("/api/bets", get(bets_handler))
        .route("/api/cache", get(cache_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn error_response(e: EngineError) -> (StatusCode, String) {
    if e.is_fatal() {
        error!("API request failed: {}", e);
    }
    let status = match e {
        EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        EngineError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub bankroll: Option<f64>,
    pub min_confidence: Option<u8>,
    pub min_probability: Option<f64>,
    pub min_value: Option<f64>,
    pub min_edge: Option<f64>,
    pub max_bet_percent: Option<f64>,
}

impl RecommendationQuery {
    fn filters(&self, defaults: &AnalysisFilters) -> AnalysisFilters {
        AnalysisFilters {
            min_confidence: self.min_confidence.unwrap_or(defaults.min_confidence),
            min_probability: self.min_probability.unwrap_or(defaults.min_probability),
            thresholds: ValueThresholds {
                min_value: self.min_value.unwrap_or(defaults.thresholds.min_value),
                min_edge: self.min_edge.unwrap_or(defaults.thresholds.min_edge),
            },
            max_bet_percent: self.max_bet_percent.unwrap_or(defaults.max_bet_percent),
        }
    }
}

/// GET /api/recommendations?bankroll=50000&min_confidence=2
async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filters = query.filters(&state.default_filters);
    state
        .engine
        .analyze(query.bankroll, &filters)
        .await
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub recommendation: Recommendation,
    /// "won", "lost" or "void"
    pub outcome: String,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub balance: f64,
}

/// POST /api/settle
async fn settle_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let outcome: BetOutcome = req.outcome.parse().map_err(error_response)?;
    state
        .engine
        .settle(&req.recommendation, outcome)
        .await
        .map(|balance| Json(SettleResponse { balance }))
        .map_err(error_response)
}

/// GET /api/statistics
async fn statistics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.statistics())
}

/// GET /api/bets
async fn bets_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.bets())
}

/// GET /api/cache
async fn cache_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.cache_snapshot().await)
}
