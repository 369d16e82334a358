use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache::CacheEntry;
use super::confidence::{classify, ConfidenceTier};
use super::kelly::size_stake;
use super::value::{best_candidate, OutcomeProbabilities, ValueThresholds};
use crate::error::EngineError;
use crate::matches::models::Outcome;

/// Caller-side filters applied to one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFilters {
    /// Minimum confidence rank (0 = avoid, 5 = five stars)
    pub min_confidence: u8,
    pub min_probability: f64,
    pub thresholds: ValueThresholds,
    /// Stake cap as a share of bankroll
    pub max_bet_percent: f64,
}

impl Default for AnalysisFilters {
    fn default() -> Self {
        AnalysisFilters {
            min_confidence: 1,
            min_probability: 0.55,
            thresholds: ValueThresholds::default(),
            max_bet_percent: 0.05,
        }
    }
}

impl AnalysisFilters {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_confidence > 5 {
            return Err(EngineError::invalid(format!(
                "min_confidence must be 0..=5, got {}",
                self.min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err(EngineError::invalid(format!(
                "min_probability must be within [0, 1], got {}",
                self.min_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.max_bet_percent) {
            return Err(EngineError::invalid(format!(
                "max_bet_percent must be within [0, 1], got {}",
                self.max_bet_percent
            )));
        }
        if !self.thresholds.min_value.is_finite() || !self.thresholds.min_edge.is_finite() {
            return Err(EngineError::invalid("value thresholds must be finite"));
        }
        Ok(())
    }
}

/// A suggested wager. Engine output only; persisted only once settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub match_id: String,
    /// "Home vs Away"
    pub label: String,
    pub competition: String,
    pub kickoff: DateTime<Utc>,
    pub outcome: Outcome,
    /// "Victory <team>" or "Draw"
    pub pick: String,
    pub probability: f64,
    pub odds: f64,
    pub implied_probability: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub confidence: ConfidenceTier,
    pub confidence_weight: f64,
    pub stake: f64,
}

/// Probabilities for each outcome of a cached fixture. Without a simulation
/// the away side gets the complement of the home estimate and the draw is not
/// priced. With one, draw and away come from the simulated frequencies and
/// the three are left unnormalised.
pub fn outcome_probabilities(entry: &CacheEntry) -> OutcomeProbabilities {
    let home = entry.home_probability;
    match entry.simulation {
        Some(sim) => OutcomeProbabilities {
            home,
            draw: Some(sim.draw),
            away: sim.away,
        },
        None => OutcomeProbabilities {
            home,
            draw: None,
            // Rounded like the home estimate so band edges compare exactly.
            away: ((1.0 - home) * 100.0).round() / 100.0,
        },
    }
}

fn pick_text(entry: &CacheEntry, outcome: Outcome) -> String {
    match outcome {
        Outcome::Home => format!("Victory {}", entry.fixture.home_team),
        Outcome::Away => format!("Victory {}", entry.fixture.away_team),
        Outcome::Draw => "Draw".to_string(),
    }
}

/// Turn cached analysis into a ranked list of recommendations.
///
/// At most one recommendation per fixture. Sorted by expected value, then
/// probability, both descending; remaining ties keep fixture order.
pub fn build_recommendations(
    entries: &[CacheEntry],
    bankroll: f64,
    filters: &AnalysisFilters,
    kelly_fraction: f64,
    include_draw: bool,
) -> Vec<Recommendation> {
    let mut recs: Vec<Recommendation> = entries
        .iter()
        .filter_map(|entry| {
            let probs = outcome_probabilities(entry);
            let candidate = best_candidate(&probs, &entry.odds, filters.thresholds, include_draw)?;

            let (tier, weight) = classify(candidate.probability);
            if tier.rank() < filters.min_confidence
                || candidate.probability < filters.min_probability
            {
                return None;
            }

            let stake = size_stake(
                bankroll,
                candidate.probability,
                candidate.odds,
                kelly_fraction,
                filters.max_bet_percent,
            );

            Some(Recommendation {
                match_id: entry.fixture.id.clone(),
                label: entry.fixture.label(),
                competition: entry.fixture.competition.clone(),
                kickoff: entry.fixture.kickoff,
                outcome: candidate.outcome,
                pick: pick_text(entry, candidate.outcome),
                probability: candidate.probability,
                odds: candidate.odds,
                implied_probability: candidate.assessment.implied_probability,
                edge: candidate.assessment.edge,
                expected_value: candidate.assessment.expected_value,
                confidence: tier,
                confidence_weight: weight,
                stake,
            })
        })
        .collect();

    // sort_by is stable, so equal keys stay in fixture order.
    recs.sort_by(|a, b| {
        b.expected_value
            .total_cmp(&a.expected_value)
            .then(b.probability.total_cmp(&a.probability))
    });
    recs
}
