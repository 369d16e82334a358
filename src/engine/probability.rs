//! Pre-match home-win probability from team form and context.
//!
//! p = 0.5 + home advantage + (form_home − form_away) / 5
//!       + marquee bonus − heavy-absences penalty
//!
//! The result is clamped to [0.45, 0.80] and rounded to two decimals so the
//! confidence bands downstream compare against clean values.

use tracing::warn;

use crate::error::EngineError;
use crate::matches::models::{Importance, MatchStats};

/// Returned when the stats cannot be scored.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

const BASE: f64 = 0.5;
const HOME_ADVANTAGE: f64 = 0.10;
const FORM_DIVISOR: f64 = 5.0;
const MARQUEE_BONUS: f64 = 0.05;
const ABSENCE_PENALTY: f64 = 0.05;
/// More unavailable players than this triggers the penalty.
const ABSENCE_LIMIT: usize = 2;
const MIN_PROBABILITY: f64 = 0.45;
const MAX_PROBABILITY: f64 = 0.80;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProbabilityModel;

impl ProbabilityModel {
    pub fn new() -> Self {
        ProbabilityModel
    }

    /// Estimate the home-win probability.
    pub fn estimate(&self, stats: &MatchStats) -> Result<f64, EngineError> {
        stats.validate()?;

        let mut p = BASE + HOME_ADVANTAGE;
        p += (stats.form_home as f64 - stats.form_away as f64) / FORM_DIVISOR;
        if stats.importance == Importance::Marquee {
            p += MARQUEE_BONUS;
        }
        if stats.unavailable_count() > ABSENCE_LIMIT {
            p -= ABSENCE_PENALTY;
        }

        if !p.is_finite() {
            return Err(EngineError::data("non-finite home probability"));
        }
        Ok(round2(p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)))
    }

    /// Like `estimate`, but a scoring failure yields the neutral probability
    /// and a warning instead of an error, so one bad record never aborts a
    /// batch.
    pub fn estimate_or_neutral(&self, stats: &MatchStats) -> f64 {
        match self.estimate(stats) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    "Probability model fell back to {} for {} vs {}: {}",
                    NEUTRAL_PROBABILITY, stats.home_team, stats.away_team, e
                );
                NEUTRAL_PROBABILITY
            }
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
