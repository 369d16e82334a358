pub mod models;
pub mod sqlite;
pub mod store;

use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::{error, info, warn};

use crate::error::EngineError;
pub use models::{BetOutcome, BetRecord, LedgerState, LedgerStatistics};
pub use sqlite::SqliteLedgerStore;
pub use store::{JsonLedgerStore, LedgerStore};

/// The bankroll: current balance plus the settled-bet history, backed by a
/// durable store.
///
/// Reads share a lock; `settle` takes the write lock for its whole
/// read-modify-persist sequence, so settlements never interleave. The
/// in-memory state only changes after the store accepted the new state.
#[derive(Clone)]
pub struct BankrollLedger {
    state: Arc<RwLock<LedgerState>>,
    store: Arc<dyn LedgerStore>,
}

impl BankrollLedger {
    /// Load the ledger from `store`. Never fails: a missing, unreadable or
    /// malformed store yields a fresh ledger holding `initial_balance`.
    pub fn load(store: Arc<dyn LedgerStore>, initial_balance: f64) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => {
                info!(
                    "Loaded ledger from {}: balance {:.2}, {} bet(s)",
                    store.describe(),
                    state.balance,
                    state.bets.len()
                );
                state
            }
            Ok(None) => {
                info!(
                    "No usable ledger at {}, starting fresh with {:.2}",
                    store.describe(),
                    initial_balance
                );
                LedgerState::fresh(initial_balance)
            }
            Err(e) => {
                warn!(
                    "Failed to read ledger at {} ({}), starting fresh with {:.2}",
                    store.describe(),
                    e,
                    initial_balance
                );
                LedgerState::fresh(initial_balance)
            }
        };
        BankrollLedger {
            state: Arc::new(RwLock::new(state)),
            store,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        // State is only replaced wholesale after a successful persist, so a
        // poisoned lock still guards a consistent value.
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Settle a bet given its outcome as text (`won`, `lost`, `void`).
    pub fn settle(
        &self,
        match_label: &str,
        stake: f64,
        outcome: &str,
        odds: f64,
    ) -> Result<f64, EngineError> {
        let outcome: BetOutcome = outcome.parse()?;
        self.settle_outcome(match_label, stake, outcome, odds)
    }

    /// Apply a settled bet, persist the whole ledger, and return the new
    /// balance. On any error nothing changes, in memory or on disk.
    pub fn settle_outcome(
        &self,
        match_label: &str,
        stake: f64,
        outcome: BetOutcome,
        odds: f64,
    ) -> Result<f64, EngineError> {
        if !stake.is_finite() || stake < 0.0 {
            return Err(EngineError::invalid(format!(
                "stake must be a non-negative amount, got {}",
                stake
            )));
        }
        if !odds.is_finite() || odds <= 1.0 {
            return Err(EngineError::invalid(format!(
                "odds must be greater than 1.0, got {}",
                odds
            )));
        }

        let mut guard = self
            .state
            .write()
            .map_err(|_| EngineError::persistence("ledger lock poisoned"))?;

        let mut next = guard.clone();
        let balance = next.apply(match_label, stake, outcome, odds, Utc::now());

        if let Err(e) = self.store.persist(&next) {
            error!(
                "Settlement of {} not recorded, ledger unchanged: {}",
                match_label, e
            );
            return Err(e);
        }
        *guard = next;

        info!(
            "Settled {}: {} {:.2} @ {:.2} → balance {:.2}",
            match_label, outcome, stake, odds, balance
        );
        Ok(balance)
    }

    /// (bet count, balance)
    pub fn summary(&self) -> (usize, f64) {
        let state = self.read();
        (state.bets.len(), state.balance)
    }

    pub fn balance(&self) -> f64 {
        self.read().balance
    }

    pub fn statistics(&self) -> LedgerStatistics {
        self.read().statistics()
    }

    /// Snapshot of the settled-bet history, oldest first.
    pub fn bets(&self) -> Vec<BetRecord> {
        self.read().bets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::store::tests::temp_ledger_path;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    /// Store that keeps the last persisted state in memory.
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<LedgerState>>,
        writes: Mutex<usize>,
    }

    impl LedgerStore for MemoryStore {
        fn load(&self) -> Result<Option<LedgerState>, EngineError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn persist(&self, state: &LedgerState) -> Result<(), EngineError> {
            *self.saved.lock().unwrap() = Some(state.clone());
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl LedgerStore for ReadOnlyStore {
        fn load(&self) -> Result<Option<LedgerState>, EngineError> {
            Ok(None)
        }

        fn persist(&self, _state: &LedgerState) -> Result<(), EngineError> {
            Err(EngineError::persistence("disk full"))
        }

        fn describe(&self) -> String {
            "read-only".into()
        }
    }

    fn expected_balance(initial: f64, bets: &[BetRecord]) -> f64 {
        initial
            + bets
                .iter()
                .map(|b| match b.outcome {
                    BetOutcome::Won => b.stake * (b.odds - 1.0),
                    BetOutcome::Lost => -b.stake,
                    BetOutcome::Void => 0.0,
                })
                .sum::<f64>()
    }

    #[test]
    fn test_won_bet_scenario() {
        let ledger = BankrollLedger::load(Arc::new(MemoryStore::default()), 50_000.0);
        let balance = ledger.settle("A vs B", 100.0, "won", 1.95).unwrap();
        assert_relative_eq!(balance, 50_095.0, epsilon = 1e-9);
        assert_eq!(ledger.summary().0, 1);
    }

    #[test]
    fn test_lost_bet_scenario() {
        let ledger = BankrollLedger::load(Arc::new(MemoryStore::default()), 50_000.0);
        let before = ledger.balance();
        let balance = ledger.settle("A vs B", 100.0, "lost", 2.40).unwrap();
        assert_relative_eq!(balance, before - 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_void_bet_keeps_balance() {
        let ledger = BankrollLedger::load(Arc::new(MemoryStore::default()), 50_000.0);
        let balance = ledger.settle("A vs B", 100.0, "void", 2.40).unwrap();
        assert_eq!(balance, 50_000.0);
        assert_eq!(ledger.bets()[0].outcome, BetOutcome::Void);
    }

    #[test]
    fn test_absent_file_then_reload_after_settle() {
        let path = temp_ledger_path("ledger-reload");
        let ledger = BankrollLedger::load(Arc::new(JsonLedgerStore::new(&path)), 50_000.0);
        assert_eq!(ledger.summary(), (0, 50_000.0));

        ledger.settle("Lyon vs Nice", 200.0, "won", 1.85).unwrap();

        let reloaded = BankrollLedger::load(Arc::new(JsonLedgerStore::new(&path)), 50_000.0);
        let (count, balance) = reloaded.summary();
        assert_eq!(count, 1);
        assert_relative_eq!(balance, 50_170.0, epsilon = 1e-9);
        assert_eq!(reloaded.bets(), ledger.bets());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_arguments_do_not_mutate() {
        let store = Arc::new(MemoryStore::default());
        let ledger = BankrollLedger::load(store.clone(), 50_000.0);

        let cases: Vec<(f64, &str, f64)> = vec![
            (-1.0, "won", 2.0),
            (f64::NAN, "won", 2.0),
            (f64::INFINITY, "lost", 2.0),
            (100.0, "perhaps", 2.0),
            (100.0, "won", 1.0),
            (100.0, "won", 0.5),
            (100.0, "won", f64::NAN),
        ];
        for (stake, outcome, odds) in cases {
            let err = ledger.settle("A vs B", stake, outcome, odds).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidArgument(_)),
                "stake={} outcome={} odds={} gave {:?}",
                stake,
                outcome,
                odds,
                err
            );
        }
        assert_eq!(ledger.summary(), (0, 50_000.0));
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }

    #[test]
    fn test_persistence_failure_leaves_state_untouched() {
        let ledger = BankrollLedger::load(Arc::new(ReadOnlyStore), 50_000.0);
        let err = ledger.settle("A vs B", 100.0, "won", 1.95).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(ledger.summary(), (0, 50_000.0));
        assert!(ledger.bets().is_empty());
    }

    #[test]
    fn test_invariant_after_mixed_sequence() {
        let ledger = BankrollLedger::load(Arc::new(MemoryStore::default()), 50_000.0);
        let plan = [
            (120.0, "won", 1.85),
            (75.5, "lost", 2.2),
            (300.0, "void", 3.2),
            (42.0, "won", 2.8),
            (1_000.0, "lost", 1.6),
            (0.0, "won", 2.0),
        ];
        for (i, (stake, outcome, odds)) in plan.iter().enumerate() {
            ledger
                .settle(&format!("Match {}", i), *stake, outcome, *odds)
                .unwrap();
        }
        let bets = ledger.bets();
        assert_eq!(bets.len(), plan.len());
        assert_relative_eq!(ledger.balance(), expected_balance(50_000.0, &bets), epsilon = 1e-6);
        // Each record carries the running balance
        assert_relative_eq!(bets.last().unwrap().balance_after, ledger.balance());
    }

    #[test]
    fn test_concurrent_settlements_are_serialized() {
        let store = Arc::new(MemoryStore::default());
        let ledger = BankrollLedger::load(store.clone(), 10_000.0);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let outcome = if (t + i) % 2 == 0 { "won" } else { "lost" };
                        ledger
                            .settle(&format!("T{} M{}", t, i), 10.0, outcome, 2.5)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let bets = ledger.bets();
        assert_eq!(bets.len(), 80);
        assert_relative_eq!(ledger.balance(), expected_balance(10_000.0, &bets), epsilon = 1e-6);
        // The store saw the final state
        let saved = store.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.bets.len(), 80);
        assert_eq!(*store.writes.lock().unwrap(), 80);
    }

    #[test]
    fn test_statistics_projection() {
        let ledger = BankrollLedger::load(Arc::new(MemoryStore::default()), 1_000.0);
        ledger.settle("A vs B", 100.0, "won", 2.0).unwrap();
        ledger.settle("C vs D", 100.0, "lost", 2.0).unwrap();
        let stats = ledger.statistics();
        assert_eq!(stats.bet_count, 2);
        assert_relative_eq!(stats.win_rate, 0.5);
        assert_relative_eq!(stats.roi, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.balance, 1_000.0, epsilon = 1e-9);
    }
}
