use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Realised result of a settled bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    #[serde(alias = "gagné")]
    Won,
    #[serde(alias = "perdu")]
    Lost,
    /// Stake returned, balance unchanged
    #[serde(alias = "remboursé")]
    Void,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Won => "won",
            BetOutcome::Lost => "lost",
            BetOutcome::Void => "void",
        }
    }

    /// Balance change for a bet of `stake` at decimal `odds`.
    pub fn delta(&self, stake: f64, odds: f64) -> f64 {
        match self {
            BetOutcome::Won => stake * (odds - 1.0),
            BetOutcome::Lost => -stake,
            BetOutcome::Void => 0.0,
        }
    }
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetOutcome {
    type Err = EngineError;

    /// Accepts the English keys and the French ones found in older ledgers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "won" | "gagné" | "gagne" => Ok(BetOutcome::Won),
            "lost" | "perdu" => Ok(BetOutcome::Lost),
            "void" | "remboursé" | "rembourse" => Ok(BetOutcome::Void),
            other => Err(EngineError::invalid(format!(
                "unknown outcome '{}', expected won, lost or void",
                other
            ))),
        }
    }
}

/// One settled bet. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub date: DateTime<Utc>,
    #[serde(rename = "match")]
    pub match_label: String,
    pub stake: f64,
    pub outcome: BetOutcome,
    pub odds: f64,
    /// Balance right after this bet was applied
    pub balance_after: f64,
}

/// Durable ledger contents: current balance plus append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub balance: f64,
    pub bets: Vec<BetRecord>,
}

impl LedgerState {
    pub fn fresh(initial_balance: f64) -> Self {
        LedgerState {
            balance: initial_balance,
            bets: Vec::new(),
        }
    }

    /// Apply an already validated settlement and append its record.
    pub fn apply(
        &mut self,
        match_label: &str,
        stake: f64,
        outcome: BetOutcome,
        odds: f64,
        at: DateTime<Utc>,
    ) -> f64 {
        self.balance += outcome.delta(stake, odds);
        self.bets.push(BetRecord {
            date: at,
            match_label: match_label.to_string(),
            stake,
            outcome,
            odds,
            balance_after: self.balance,
        });
        self.balance
    }

    /// Sum of every settled bet's balance change.
    pub fn net_profit(&self) -> f64 {
        self.bets.iter().map(|b| b.outcome.delta(b.stake, b.odds)).sum()
    }

    pub fn statistics(&self) -> LedgerStatistics {
        let won = self.bets.iter().filter(|b| b.outcome == BetOutcome::Won).count();
        let lost = self.bets.iter().filter(|b| b.outcome == BetOutcome::Lost).count();
        let staked: f64 = self
            .bets
            .iter()
            .filter(|b| b.outcome != BetOutcome::Void)
            .map(|b| b.stake)
            .sum();
        let net_profit = self.net_profit();

        let decided = won + lost;
        let win_rate = if decided > 0 {
            won as f64 / decided as f64
        } else {
            0.0
        };
        let roi = if staked > 0.0 { net_profit / staked } else { 0.0 };

        LedgerStatistics {
            bet_count: self.bets.len(),
            balance: self.balance,
            win_rate,
            roi,
            net_profit,
            total_staked: staked,
        }
    }
}

/// Read-only projection of the ledger for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub bet_count: usize,
    pub balance: f64,
    /// Won / (won + lost); void bets are not counted
    pub win_rate: f64,
    /// Net profit over stake on decided bets
    pub roi: f64,
    pub net_profit: f64,
    pub total_staked: f64,
}
