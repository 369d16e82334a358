use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use super::models::LedgerState;
use crate::error::EngineError;

/// Durable backing for the bankroll ledger.
///
/// `load` returns `Ok(None)` when there is nothing usable to read (no file,
/// no row, malformed contents); the caller then seeds a fresh ledger.
/// `persist` must write the full state atomically: either the new balance and
/// history are both on disk afterwards, or the previous state still is.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Option<LedgerState>, EngineError>;

    fn persist(&self, state: &LedgerState) -> Result<(), EngineError>;

    /// Human-readable location for logging.
    fn describe(&self) -> String;
}

/// Ledger kept as a single pretty-printed JSON document:
/// `{ "balance": 50000.0, "bets": [ { "date", "match", "stake", "outcome", "odds", "balance_after" } ] }`
pub struct JsonLedgerStore {
    path: PathBuf,
    /// Set when an existing file could not be read nor moved aside. Writes
    /// are refused so the history on disk is never overwritten.
    read_failed: AtomicBool,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonLedgerStore {
            path: path.into(),
            read_failed: AtomicBool::new(false),
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, EngineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                let aside = self.sibling(".unreadable");
                if let Err(move_err) = fs::rename(&self.path, &aside) {
                    self.read_failed.store(true, Ordering::SeqCst);
                    return Err(EngineError::persistence(format!(
                        "read {}: {} (could not move aside: {})",
                        self.path.display(),
                        e,
                        move_err
                    )));
                }
                warn!(
                    "Unreadable ledger {} ({}), moved to {}",
                    self.path.display(),
                    e,
                    aside.display()
                );
                return Ok(None);
            }
        };

        match serde_json::from_str::<LedgerState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // Keep the unreadable file around; the next persist replaces it.
                let corrupt = self.sibling(".corrupt");
                match fs::copy(&self.path, &corrupt) {
                    Ok(_) => warn!(
                        "Malformed ledger {} ({}), copied to {}",
                        self.path.display(),
                        e,
                        corrupt.display()
                    ),
                    Err(copy_err) => warn!(
                        "Malformed ledger {} ({}), backup failed: {}",
                        self.path.display(),
                        e,
                        copy_err
                    ),
                }
                Ok(None)
            }
        }
    }

    fn persist(&self, state: &LedgerState) -> Result<(), EngineError> {
        if self.read_failed.load(Ordering::SeqCst) {
            return Err(EngineError::persistence(format!(
                "refusing to overwrite {}: it could not be read at startup",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::persistence(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::persistence(format!("serialize ledger: {}", e)))?;

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, json)
            .map_err(|e| EngineError::persistence(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            EngineError::persistence(format!("swap {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ledger::models::BetOutcome;
    use chrono::Utc;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Unique path under the system temp dir; the file itself is not created.
    pub(crate) fn temp_ledger_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "valuebet-{}-{}-{}.json",
            name,
            std::process::id(),
            nanos
        ))
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        for suffix in [".corrupt", ".unreadable"] {
            let mut aside = path.as_os_str().to_owned();
            aside.push(suffix);
            let aside = PathBuf::from(aside);
            let _ = fs::remove_file(&aside);
            let _ = fs::remove_dir_all(&aside);
        }
    }

    #[test]
    fn test_absent_file_loads_none() {
        let store = JsonLedgerStore::new(temp_ledger_path("absent"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_persist_then_load_is_identical() {
        let path = temp_ledger_path("roundtrip");
        let store = JsonLedgerStore::new(&path);
        let mut state = LedgerState::fresh(50_000.0);
        state.apply("PSG vs Lens", 250.0, BetOutcome::Won, 1.6, Utc::now());
        state.apply("Nice vs Monaco", 120.5, BetOutcome::Lost, 2.8, Utc::now());

        store.persist(&state).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);
        cleanup(&path);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let path = temp_ledger_path("extra");
        fs::write(
            &path,
            r#"{"balance": 1234.5, "bets": [], "currency": "EUR", "version": 3}"#,
        )
        .unwrap();
        let loaded = JsonLedgerStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.balance, 1234.5);
        assert!(loaded.bets.is_empty());
        cleanup(&path);
    }

    #[test]
    fn test_missing_required_field_is_treated_as_absent() {
        let path = temp_ledger_path("nobets");
        fs::write(&path, r#"{"balance": 10.0}"#).unwrap();
        assert_eq!(JsonLedgerStore::new(&path).load().unwrap(), None);
        cleanup(&path);
    }

    #[test]
    fn test_malformed_file_is_backed_up() {
        let path = temp_ledger_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonLedgerStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        let backup = store.sibling(".corrupt");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{ not json");
        cleanup(&path);
    }

    #[test]
    fn test_persist_leaves_no_tmp_file() {
        let path = temp_ledger_path("tmp");
        let store = JsonLedgerStore::new(&path);
        store.persist(&LedgerState::fresh(10.0)).unwrap();
        assert!(path.exists());
        assert!(!store.sibling(".tmp").exists());
        cleanup(&path);
    }

    #[test]
    fn test_unreadable_file_is_moved_aside_before_fresh_writes() {
        // A directory at the ledger path fails to read as a file.
        let path = temp_ledger_path("unreadable");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("history.json"), "kept").unwrap();

        let store = JsonLedgerStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        let aside = store.sibling(".unreadable");
        assert_eq!(fs::read_to_string(aside.join("history.json")).unwrap(), "kept");
        store.persist(&LedgerState::fresh(10.0)).unwrap();
        assert_eq!(store.load().unwrap(), Some(LedgerState::fresh(10.0)));
        cleanup(&path);
    }

    #[test]
    fn test_unreadable_file_that_cannot_move_blocks_writes() {
        let path = temp_ledger_path("stuck");
        fs::create_dir_all(&path).unwrap();
        let store = JsonLedgerStore::new(&path);
        // A non-empty directory in the way makes the rename fail.
        let aside = store.sibling(".unreadable");
        fs::create_dir_all(&aside).unwrap();
        fs::write(aside.join("occupied"), "x").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.is_fatal());
        let err = store.persist(&LedgerState::fresh(10.0)).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"), "{}", err);
        assert!(path.is_dir());
        let _ = fs::remove_dir_all(&path);
        cleanup(&path);
    }
}
