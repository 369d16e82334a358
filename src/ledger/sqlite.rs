use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::models::{BetOutcome, BetRecord, LedgerState};
use super::store::LedgerStore;
use crate::error::EngineError;

/// Ledger kept in SQLite: one balance row plus an append-only `bets` table.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    conn: Arc<Mutex<Connection>>,
    label: String,
}

impl SqliteLedgerStore {
    /// Open (or create) the ledger database at the given path. `:memory:`
    /// gives a throwaway in-process ledger.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open ledger db {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("set journal mode")?;
        conn.execute_batch(SCHEMA_SQL).context("run ledger migrations")?;
        Ok(SqliteLedgerStore {
            conn: Arc::new(Mutex::new(conn)),
            label: path.to_string(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, EngineError> {
        self.conn
            .lock()
            .map_err(|_| EngineError::persistence("ledger connection lock poisoned"))
    }
}

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> EngineError + '_ {
    move |e| EngineError::persistence(format!("{}: {}", context, e))
}

impl LedgerStore for SqliteLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, EngineError> {
        let conn = self.lock()?;
        match read_state(&conn) {
            Ok(state) => Ok(state),
            Err(e @ rusqlite::Error::FromSqlConversionFailure(..))
            | Err(e @ rusqlite::Error::InvalidColumnType(..)) => {
                // Keep the unreadable rows; the fresh ledger starts from empty tables.
                let suffix = set_aside(&conn)?;
                warn!(
                    "Malformed ledger rows in {} ({}), moved to ledger_{}/bets_{}",
                    self.label, e, suffix, suffix
                );
                Ok(None)
            }
            Err(e) => Err(db_err("read ledger")(e)),
        }
    }

    fn persist(&self, state: &LedgerState) -> Result<(), EngineError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("begin ledger transaction"))?;

        let stored: i64 = tx
            .query_row("SELECT COUNT(*) FROM bets", [], |r| r.get(0))
            .map_err(db_err("count bets"))?;
        let stored = stored as usize;
        if stored > state.bets.len() {
            return Err(EngineError::persistence(format!(
                "ledger has {} stored bets but state only {}; history is append-only",
                stored,
                state.bets.len()
            )));
        }

        for bet in &state.bets[stored..] {
            tx.execute(
                "INSERT INTO bets (placed_at, match_label, stake, outcome, odds, balance_after)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    bet.date,
                    bet.match_label,
                    bet.stake,
                    bet.outcome.as_str(),
                    bet.odds,
                    bet.balance_after,
                ],
            )
            .map_err(db_err("insert bet"))?;
        }
        tx.execute(
            "INSERT INTO ledger (id, balance, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET balance = excluded.balance, updated_at = excluded.updated_at",
            params![state.balance, Utc::now()],
        )
        .map_err(db_err("update balance"))?;

        tx.commit().map_err(db_err("commit ledger transaction"))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.label)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn read_state(conn: &Connection) -> rusqlite::Result<Option<LedgerState>> {
    let balance: Option<f64> = conn
        .query_row("SELECT balance FROM ledger WHERE id = 1", [], |r| r.get(0))
        .optional()?;
    let Some(balance) = balance else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT placed_at, match_label, stake, outcome, odds, balance_after
         FROM bets ORDER BY id ASC",
    )?;
    let bets = stmt
        .query_map([], map_bet)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(LedgerState { balance, bets }))
}

/// Rename both ledger tables to `<table>_corrupt_<timestamp>` and recreate
/// empty ones. Returns the suffix used.
fn set_aside(conn: &Connection) -> Result<String, EngineError> {
    let suffix = format!("corrupt_{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("begin set-aside transaction"))?;
    tx.execute_batch(&format!(
        "ALTER TABLE ledger RENAME TO ledger_{s};
         ALTER TABLE bets RENAME TO bets_{s};
         {schema}",
        s = suffix,
        schema = SCHEMA_SQL
    ))
    .map_err(db_err("set aside malformed ledger"))?;
    tx.commit().map_err(db_err("commit set-aside transaction"))?;
    Ok(suffix)
}

fn map_bet(row: &rusqlite::Row) -> rusqlite::Result<BetRecord> {
    let outcome: String = row.get(3)?;
    let outcome = outcome.parse::<BetOutcome>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(BetRecord {
        date: row.get(0)?,
        match_label: row.get(1)?,
        stake: row.get(2)?,
        outcome,
        odds: row.get(4)?,
        balance_after: row.get(5)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ledger (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    balance    REAL    NOT NULL,
    updated_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS bets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    placed_at     TEXT    NOT NULL,
    match_label   TEXT    NOT NULL,
    stake         REAL    NOT NULL,
    outcome       TEXT    NOT NULL,
    odds          REAL    NOT NULL,
    balance_after REAL    NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteLedgerStore {
        SqliteLedgerStore::open(":memory:").unwrap()
    }

    #[test]
    fn test_empty_db_loads_none() {
        assert_eq!(store().load().unwrap(), None);
    }

    #[test]
    fn test_persist_then_load_is_identical() {
        let store = store();
        let mut state = LedgerState::fresh(50_000.0);
        state.apply("Lyon vs Nice", 300.0, BetOutcome::Won, 1.85, Utc::now());
        store.persist(&state).unwrap();
        state.apply("Brest vs Lens", 80.0, BetOutcome::Void, 2.2, Utc::now());
        state.apply("Rennes vs Brest", 45.25, BetOutcome::Lost, 1.85, Utc::now());
        store.persist(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.bets.len(), 3);
    }

    #[test]
    fn test_persist_rejects_truncated_history() {
        let store = store();
        let mut state = LedgerState::fresh(1_000.0);
        state.apply("A vs B", 10.0, BetOutcome::Lost, 2.0, Utc::now());
        store.persist(&state).unwrap();

        let err = store.persist(&LedgerState::fresh(1_000.0)).unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        // Nothing written by the rejected call
        assert_eq!(store.load().unwrap().unwrap(), state);
    }

    #[test]
    fn test_malformed_rows_are_set_aside_and_later_settlements_survive_reload() {
        use crate::ledger::BankrollLedger;

        let store = store();
        let mut state = LedgerState::fresh(1_000.0);
        state.apply("A vs B", 10.0, BetOutcome::Lost, 2.0, Utc::now());
        state.apply("E vs F", 20.0, BetOutcome::Won, 1.5, Utc::now());
        store.persist(&state).unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE bets SET outcome = 'pending' WHERE id = 1", [])
            .unwrap();

        let ledger = BankrollLedger::load(Arc::new(store.clone()), 1_000.0);
        assert_eq!(ledger.summary(), (0, 1_000.0));
        let balance = ledger.settle("C vs D", 100.0, "won", 2.0).unwrap();
        assert_eq!(balance, 1_100.0);

        let reloaded = BankrollLedger::load(Arc::new(store.clone()), 1_000.0);
        assert_eq!(reloaded.summary(), (1, 1_100.0));
        assert_eq!(reloaded.bets()[0].match_label, "C vs D");

        // The unreadable history is kept, not dropped
        let conn = store.lock().unwrap();
        let kept: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'bets_corrupt_%'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_describe() {
        assert_eq!(store().describe(), "sqlite::memory:");
    }
}
