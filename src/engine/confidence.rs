use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete confidence level attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Avoid,
    OneStar,
    TwoStars,
    ThreeStars,
    FourStars,
    FiveStars,
}

impl ConfidenceTier {
    /// Numeric rank used by the `min_confidence` filter (Avoid = 0).
    pub fn rank(&self) -> u8 {
        match self {
            ConfidenceTier::Avoid => 0,
            ConfidenceTier::OneStar => 1,
            ConfidenceTier::TwoStars => 2,
            ConfidenceTier::ThreeStars => 3,
            ConfidenceTier::FourStars => 4,
            ConfidenceTier::FiveStars => 5,
        }
    }

    pub fn stars(&self) -> String {
        "★".repeat(self.rank() as usize)
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::Avoid => write!(f, "avoid"),
            _ => write!(f, "{}", self.stars()),
        }
    }
}

/// (inclusive lower bound, tier, bankroll weight), highest band first.
const BANDS: [(f64, ConfidenceTier, f64); 5] = [
    (0.78, ConfidenceTier::FiveStars, 1.0),
    (0.73, ConfidenceTier::FourStars, 0.8),
    (0.68, ConfidenceTier::ThreeStars, 0.6),
    (0.63, ConfidenceTier::TwoStars, 0.4),
    (0.55, ConfidenceTier::OneStar, 0.2),
];

/// Map a probability to its confidence tier and bankroll-fraction weight.
/// Total over every input: anything below the lowest band (including NaN)
/// is `Avoid` with weight 0.
pub fn classify(proba: f64) -> (ConfidenceTier, f64) {
    BANDS
        .iter()
        .find(|(lower, _, _)| proba >= *lower)
        .map(|(_, tier, weight)| (*tier, *weight))
        .unwrap_or((ConfidenceTier::Avoid, 0.0))
}
