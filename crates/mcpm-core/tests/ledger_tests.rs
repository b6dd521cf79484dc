//! Ledger persistence and locking

use std::fs::OpenOptions;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use mcpm_core::inputs::ResolvedInputs;
use mcpm_core::{Error, Ledger, LedgerEntry};
use mcpm_fs::RobustnessConfig;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn quick() -> RobustnessConfig {
    RobustnessConfig {
        lock_timeout: Duration::from_millis(150),
        enable_fsync: false,
    }
}

#[test]
fn entry_survives_reopen_with_inputs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.toml");

    let mut inputs = ResolvedInputs::new();
    inputs.insert("REGION", "eu-west");
    inputs.insert_secret("API_KEY", "abc123");
    let entry = LedgerEntry::new("my-server", "1.0.0", dir.path().join("packages/my-server"))
        .with_inputs(&inputs)
        .with_checksum(Some("sha256:00ff".to_string()));

    Ledger::open(&path).record(entry.clone()).unwrap();

    let reopened = Ledger::open(&path);
    let loaded = reopened.require("my-server").unwrap();
    assert_eq!(loaded, entry);
    assert_eq!(loaded.stored_inputs().get("REGION"), Some("eu-west"));
    assert!(!std::fs::read_to_string(&path).unwrap().contains("abc123"));
}

#[test]
fn list_is_sorted_by_install_name() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.toml"));
    for name in ["zeta", "alpha", "mid"] {
        ledger.record(LedgerEntry::new(name, "1", "/p")).unwrap();
    }

    let names: Vec<String> = ledger
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.install_name)
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn remove_returns_entry_and_forgets_it() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.toml"));
    ledger.record(LedgerEntry::new("x", "1", "/p/x")).unwrap();
    ledger.record(LedgerEntry::new("y", "1", "/p/y")).unwrap();

    let removed = ledger.remove("x").unwrap();

    assert_eq!(removed.install_name, "x");
    assert!(!ledger.is_installed("x").unwrap());
    assert!(ledger.is_installed("y").unwrap());
}

#[test]
fn held_lock_is_write_conflict() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.toml");
    let ledger = Ledger::open(&path).with_robustness(quick());
    ledger.record(LedgerEntry::new("x", "1", "/p/x")).unwrap();

    let holder = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(mcpm_fs::io::lock_path(&path))
        .unwrap();
    holder.lock_exclusive().unwrap();

    let err = ledger.record(LedgerEntry::new("x", "2", "/p/x")).unwrap_err();
    assert!(matches!(err, Error::LedgerWriteConflict { .. }));

    // Reads are not blocked, and the failed write changed nothing.
    assert_eq!(ledger.require("x").unwrap().version, "1");

    holder.unlock().unwrap();
    ledger.record(LedgerEntry::new("x", "2", "/p/x")).unwrap();
    assert_eq!(ledger.require("x").unwrap().version, "2");
}

#[test]
fn concurrent_records_keep_both_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.toml");
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["first", "second"]
        .into_iter()
        .map(|name| {
            let path = path.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                Ledger::open(&path).record(LedgerEntry::new(name, "1", "/p"))
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    // Read-modify-write happens under the lock, so neither update is lost.
    let ledger = Ledger::open(&path);
    assert!(ledger.is_installed("first").unwrap());
    assert!(ledger.is_installed("second").unwrap());
}

#[test]
fn corrupt_ledger_is_reported_not_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.toml");
    std::fs::write(&path, "version = [unclosed").unwrap();

    let ledger = Ledger::open(&path);
    assert!(matches!(ledger.list(), Err(Error::TomlDe(_))));
    assert!(ledger.record(LedgerEntry::new("x", "1", "/p")).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "version = [unclosed");
}
