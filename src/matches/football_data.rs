use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::models::Match;
use super::provider::MatchProvider;
use crate::error::EngineError;

/// Fixture provider backed by the football-data.org v4 API.
/// Docs: <https://www.football-data.org/documentation/api>
pub struct FootballDataProvider {
    http: Client,
    api_key: Option<String>,
    /// Base URL for overriding in tests
    base_url: String,
}

impl FootballDataProvider {
    pub fn new(api_key: Option<String>, base_url: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(FootballDataProvider {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn matches_url(&self, day: NaiveDate) -> Result<Url, EngineError> {
        let day = day.format("%Y-%m-%d").to_string();
        Url::parse_with_params(
            &format!("{}/matches", self.base_url),
            &[("dateFrom", day.as_str()), ("dateTo", day.as_str())],
        )
        .map_err(|e| EngineError::UpstreamUnavailable(format!("bad provider URL: {}", e)))
    }
}

#[async_trait]
impl MatchProvider for FootballDataProvider {
    fn name(&self) -> &str {
        "football-data.org"
    }

    async fn fetch_todays_matches(&self) -> Result<Vec<Match>, EngineError> {
        let url = self.matches_url(Local::now().date_naive())?;
        debug!("Fetching today's matches from {}", url);

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("X-Auth-Token", key);
        }

        let resp = req.send().await.map_err(|e| {
            EngineError::UpstreamUnavailable(format!("football-data request failed: {}", e))
        })?;

        if !resp.status().is_success() {
            return Err(EngineError::UpstreamUnavailable(format!(
                "football-data error: {}",
                resp.status()
            )));
        }

        let raw: serde_json::Value = resp.json().await.map_err(|e| {
            EngineError::UpstreamUnavailable(format!("failed to parse football-data response: {}", e))
        })?;

        Ok(parse_matches_response(&raw))
    }
}

/// Extract fixtures from a `/v4/matches` payload. Entries without an ID or
/// team names are dropped; a missing competition becomes "unknown".
fn parse_matches_response(raw: &serde_json::Value) -> Vec<Match> {
    let Some(matches) = raw["matches"].as_array() else {
        return vec![];
    };

    matches
        .iter()
        .filter_map(|m| {
            let id = match &m["id"] {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                _ => return None,
            };
            let home_team = m["homeTeam"]["name"].as_str()?.trim().to_string();
            let away_team = m["awayTeam"]["name"].as_str()?.trim().to_string();
            if home_team.is_empty() || away_team.is_empty() {
                return None;
            }
            let competition = m["competition"]["name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            let kickoff = m["utcDate"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc));
            let Some(kickoff) = kickoff else {
                debug!("Dropping fixture {} without a parseable kickoff", id);
                return None;
            };

            Some(Match {
                id,
                kickoff,
                competition,
                home_team,
                away_team,
            })
        })
        .collect()
}
