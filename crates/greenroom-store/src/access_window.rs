//! Time-windowed access gate: a single expiry timestamp read on every event.

use anyhow::{Context, Result};

use crate::keys;
use crate::kv::KeyValueStore;

/// Sentinel for "open indefinitely".
pub const OPEN_FOREVER_MS: i64 = -1;

/// Snapshot of the access gate. `-1` means open forever, a future timestamp
/// means open until that instant, everything else means closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
    pub open_until_ms: i64,
}

impl AccessWindow {
    pub fn closed() -> Self {
        Self { open_until_ms: 0 }
    }

    pub fn is_open(&self, now_ms: i64) -> bool {
        self.open_until_ms == OPEN_FOREVER_MS || self.open_until_ms > now_ms
    }

    pub fn is_indefinite(&self) -> bool {
        self.open_until_ms == OPEN_FOREVER_MS
    }

    /// Loads the current window; a missing or unparseable record reads as
    /// closed rather than failing the event.
    pub fn load(kv: &dyn KeyValueStore) -> Result<Self> {
        let raw = kv
            .get(keys::ACCESS_WINDOW)
            .context("failed to read access window")?;
        let open_until_ms = raw
            .as_deref()
            .map(str::trim)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);
        Ok(Self { open_until_ms })
    }

    /// Overwrites the window. `0` closes now, `-1` opens forever, anything
    /// else is an absolute expiry instant. No history is retained.
    pub fn store(kv: &dyn KeyValueStore, open_until_ms: i64) -> Result<()> {
        kv.put(keys::ACCESS_WINDOW, &open_until_ms.to_string())
            .context("failed to persist access window")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::FsKeyValueStore;

    #[test]
    fn unit_forever_sentinel_is_open_regardless_of_now() {
        let window = AccessWindow {
            open_until_ms: OPEN_FOREVER_MS,
        };
        assert!(window.is_open(0));
        assert!(window.is_open(i64::MAX));
        assert!(window.is_indefinite());
    }

    #[test]
    fn unit_past_or_now_expiry_is_closed() {
        let window = AccessWindow { open_until_ms: 1_000 };
        assert!(!window.is_open(1_000));
        assert!(!window.is_open(2_000));
        assert!(!AccessWindow::closed().is_open(0));
    }

    #[test]
    fn unit_future_expiry_is_open_until_exactly_that_instant() {
        let window = AccessWindow { open_until_ms: 5_000 };
        assert!(window.is_open(4_999));
        assert!(!window.is_open(5_000));
    }

    #[test]
    fn functional_load_store_round_trip_and_missing_record_reads_closed() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let kv = FsKeyValueStore::open(tempdir.path()).expect("open");

        let initial = AccessWindow::load(&kv).expect("load");
        assert_eq!(initial.open_until_ms, 0);

        AccessWindow::store(&kv, OPEN_FOREVER_MS).expect("store");
        let loaded = AccessWindow::load(&kv).expect("load");
        assert!(loaded.is_indefinite());

        AccessWindow::store(&kv, 42_000).expect("store");
        assert_eq!(AccessWindow::load(&kv).expect("load").open_until_ms, 42_000);
    }

    #[test]
    fn regression_garbage_record_reads_closed() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let kv = FsKeyValueStore::open(tempdir.path()).expect("open");
        kv.put(keys::ACCESS_WINDOW, "not-a-number").expect("put");
        let window = AccessWindow::load(&kv).expect("load");
        assert!(!window.is_open(0));
    }
}
