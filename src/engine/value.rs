//! Value-bet detection: does our probability beat the market's price?
//!
//!   expected value  = p · odds − 1
//!   implied prob.   = 1 / odds
//!   edge            = p − implied
//!
//! A bet is flagged as value only when both the expected value and the edge
//! clear their configured thresholds.

use serde::{Deserialize, Serialize};

use crate::matches::models::{OddsQuote, Outcome};

/// Strictness knobs for value detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueThresholds {
    /// Minimum expected value per unit staked (e.g. 0.05 = +5%)
    pub min_value: f64,
    /// Minimum margin of our probability over the implied probability
    pub min_edge: f64,
}

impl Default for ValueThresholds {
    fn default() -> Self {
        ValueThresholds {
            min_value: 0.05,
            min_edge: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub expected_value: f64,
    pub implied_probability: f64,
    pub edge: f64,
    pub is_value: bool,
}

/// Assess one outcome. Degenerate inputs (odds ≤ 1, probability outside
/// [0, 1], non-finite values) are never value.
pub fn assess(proba: f64, odds: f64, thresholds: ValueThresholds) -> ValueAssessment {
    if !proba.is_finite() || !odds.is_finite() || odds <= 1.0 || !(0.0..=1.0).contains(&proba) {
        return ValueAssessment {
            expected_value: 0.0,
            implied_probability: 0.0,
            edge: 0.0,
            is_value: false,
        };
    }

    let expected_value = proba * odds - 1.0;
    let implied_probability = 1.0 / odds;
    let edge = proba - implied_probability;
    // Negative expected value is never value, however loose the thresholds.
    let is_value = expected_value > 0.0
        && expected_value >= thresholds.min_value
        && edge >= thresholds.min_edge;

    ValueAssessment {
        expected_value,
        implied_probability,
        edge,
        is_value,
    }
}

/// Outcome probabilities of one fixture. `draw` is present only when a
/// three-way simulation supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: Option<f64>,
    pub away: f64,
}

impl OutcomeProbabilities {
    pub fn get(&self, outcome: Outcome) -> Option<f64> {
        match outcome {
            Outcome::Home => Some(self.home),
            Outcome::Draw => self.draw,
            Outcome::Away => Some(self.away),
        }
    }
}

/// The single bet candidate chosen for a fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub outcome: Outcome,
    pub probability: f64,
    pub odds: f64,
    pub assessment: ValueAssessment,
}

/// Pick the outcome with the highest expected value among those flagged as
/// value. Outcomes are considered in the order home, away, draw and a later
/// outcome must be strictly better to win, so ties go to the home side.
pub fn best_candidate(
    probabilities: &OutcomeProbabilities,
    odds: &OddsQuote,
    thresholds: ValueThresholds,
    include_draw: bool,
) -> Option<Candidate> {
    let mut outcomes = vec![Outcome::Home, Outcome::Away];
    if include_draw {
        outcomes.push(Outcome::Draw);
    }

    let mut best: Option<Candidate> = None;
    for outcome in outcomes {
        let Some(probability) = probabilities.get(outcome) else {
            continue;
        };
        let price = odds.price(outcome);
        let assessment = assess(probability, price, thresholds);
        if !assessment.is_value {
            continue;
        }
        let better = best
            .map(|b| assessment.expected_value > b.assessment.expected_value)
            .unwrap_or(true);
        if better {
            best = Some(Candidate {
                outcome,
                probability,
                odds: price,
                assessment,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quote(home: f64, draw: f64, away: f64) -> OddsQuote {
        OddsQuote::new(home, draw, away).unwrap()
    }

    #[test]
    fn test_assess_positive_value() {
        let a = assess(0.60, 2.20, ValueThresholds::default());
        assert_relative_eq!(a.expected_value, 0.32, epsilon = 1e-9);
        assert_relative_eq!(a.implied_probability, 1.0 / 2.2, epsilon = 1e-12);
        assert_relative_eq!(a.edge, 0.60 - 1.0 / 2.2, epsilon = 1e-12);
        assert!(a.is_value);
    }

    #[test]
    fn test_assess_needs_both_thresholds() {
        // EV = 0.06, edge = 0.03
        let a = assess(0.53, 2.0, ValueThresholds::default());
        assert!(a.expected_value >= 0.05);
        assert!(a.edge >= 0.03);
        // Raise the edge margin: EV still clears, edge no longer does
        let strict = ValueThresholds {
            min_value: 0.05,
            min_edge: 0.05,
        };
        assert!(!assess(0.53, 2.0, strict).is_value);
        // Raise the value threshold instead
        let strict = ValueThresholds {
            min_value: 0.10,
            min_edge: 0.0,
        };
        assert!(!assess(0.53, 2.0, strict).is_value);
    }

    #[test]
    fn test_never_value_with_negative_ev() {
        let lenient = ValueThresholds {
            min_value: -1.0,
            min_edge: -1.0,
        };
        for (p, odds) in [(0.40, 2.0), (0.30, 3.0), (0.50, 1.9), (0.0, 5.0)] {
            assert!(p * odds - 1.0 < 0.0);
            assert!(!assess(p, odds, ValueThresholds::default()).is_value);
            assert!(!assess(p, odds, lenient).is_value, "p={} odds={} flagged", p, odds);
        }
    }

    #[test]
    fn test_degenerate_inputs_are_not_value() {
        let t = ValueThresholds::default();
        assert!(!assess(0.9, 1.0, t).is_value);
        assert!(!assess(0.9, 0.5, t).is_value);
        assert!(!assess(1.5, 2.0, t).is_value);
        assert!(!assess(f64::NAN, 2.0, t).is_value);
    }

    #[test]
    fn test_best_candidate_prefers_higher_ev() {
        let probs = OutcomeProbabilities {
            home: 0.40,
            draw: None,
            away: 0.55,
        };
        let c = best_candidate(&probs, &quote(2.8, 3.2, 2.2), ValueThresholds::default(), false)
            .unwrap();
        assert_eq!(c.outcome, Outcome::Away);
        assert_relative_eq!(c.assessment.expected_value, 0.21, epsilon = 1e-9);
    }

    #[test]
    fn test_best_candidate_ties_go_home() {
        let probs = OutcomeProbabilities {
            home: 0.6,
            draw: None,
            away: 0.6,
        };
        let c = best_candidate(&probs, &quote(2.2, 3.2, 2.2), ValueThresholds::default(), false)
            .unwrap();
        assert_eq!(c.outcome, Outcome::Home);
    }

    #[test]
    fn test_best_candidate_skips_non_value_even_with_higher_ev() {
        // Away EV is higher but its edge misses the margin.
        let probs = OutcomeProbabilities {
            home: 0.60,
            draw: None,
            away: 0.12,
        };
        let thresholds = ValueThresholds {
            min_value: 0.05,
            min_edge: 0.03,
        };
        let c = best_candidate(&probs, &quote(1.85, 3.4, 10.0), thresholds, false).unwrap();
        assert_eq!(c.outcome, Outcome::Home);
        let away = assess(0.12, 10.0, thresholds);
        assert!(away.expected_value > c.assessment.expected_value);
        assert!(!away.is_value);
    }

    #[test]
    fn test_draw_only_considered_when_enabled() {
        let probs = OutcomeProbabilities {
            home: 0.40,
            draw: Some(0.40),
            away: 0.20,
        };
        let q = quote(2.2, 3.2, 2.8);
        assert!(best_candidate(&probs, &q, ValueThresholds::default(), false).is_none());
        let c = best_candidate(&probs, &q, ValueThresholds::default(), true).unwrap();
        assert_eq!(c.outcome, Outcome::Draw);
    }

    #[test]
    fn test_no_candidate_without_value() {
        let probs = OutcomeProbabilities {
            home: 0.5,
            draw: None,
            away: 0.5,
        };
        assert!(best_candidate(&probs, &quote(1.9, 3.2, 1.9), ValueThresholds::default(), true)
            .is_none());
    }
}
