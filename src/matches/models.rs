use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Lowest and highest value of the team-form scale.
pub const FORM_MIN: u8 = 1;
pub const FORM_MAX: u8 = 5;

/// A fixture as fetched from the match-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// External fixture ID from the provider
    pub id: String,
    pub kickoff: DateTime<Utc>,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
}

impl Match {
    /// "Home vs Away"
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// How much is at stake in a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Marquee,
    Standard,
}

/// Pre-match statistics derived from a `Match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    /// Recent form on the 1–5 scale
    pub form_home: u8,
    pub form_away: u8,
    /// Injured players, both sides
    pub injured: Vec<String>,
    /// Suspended players, both sides
    pub suspended: Vec<String>,
    pub importance: Importance,
}

impl MatchStats {
    /// Build a validated stats record. Rejects forms outside the scale and
    /// empty team names so bad upstream data never reaches the model.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        competition: impl Into<String>,
        form_home: u8,
        form_away: u8,
        injured: Vec<String>,
        suspended: Vec<String>,
        importance: Importance,
    ) -> Result<Self, EngineError> {
        let stats = MatchStats {
            home_team: home_team.into(),
            away_team: away_team.into(),
            competition: competition.into(),
            form_home,
            form_away,
            injured,
            suspended,
            importance,
        };
        stats.validate()?;
        Ok(stats)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            return Err(EngineError::data("team name missing"));
        }
        for (side, form) in [("home", self.form_home), ("away", self.form_away)] {
            if !(FORM_MIN..=FORM_MAX).contains(&form) {
                return Err(EngineError::data(format!(
                    "{} form {} outside {}..={}",
                    side, form, FORM_MIN, FORM_MAX
                )));
            }
        }
        Ok(())
    }

    /// Players unavailable through injury or suspension.
    pub fn unavailable_count(&self) -> usize {
        self.injured.len() + self.suspended.len()
    }
}

/// One of the three mutually exclusive results of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "N")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl Outcome {
    pub fn key(&self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "N",
            Outcome::Away => "2",
        }
    }
}

/// Decimal odds for the three outcomes of a fixture.
///
/// Construction guarantees every price is finite and strictly above 1.0, so
/// downstream code never divides by zero or sizes a negative stake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    home: f64,
    draw: f64,
    away: f64,
}

impl OddsQuote {
    pub fn new(home: f64, draw: f64, away: f64) -> Result<Self, EngineError> {
        for (key, price) in [("1", home), ("N", draw), ("2", away)] {
            if !price.is_finite() || price <= 1.0 {
                return Err(EngineError::data(format!(
                    "odds for outcome {} must be > 1.0, got {}",
                    key, price
                )));
            }
        }
        Ok(OddsQuote { home, draw, away })
    }

    /// Build from optional prices, as delivered by a partial quote.
    pub fn from_partial(
        home: Option<f64>,
        draw: Option<f64>,
        away: Option<f64>,
    ) -> Result<Self, EngineError> {
        match (home, draw, away) {
            (Some(h), Some(d), Some(a)) => Self::new(h, d, a),
            _ => Err(EngineError::data("incomplete three-way quote")),
        }
    }

    pub fn price(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}
