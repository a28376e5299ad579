//! Daily metrics ledger: increment-by-day counters and first-seen markers.
//!
//! Counters are plain read-modify-write over one JSON record per UTC day; an
//! increment lost to a concurrent writer is tolerable for this bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use greenroom_core::current_unix_timestamp_ms;

use crate::keys;
use crate::kv::KeyValueStore;

pub const METRIC_CHAT_EVENTS: &str = "chat_events";
pub const METRIC_CHAT_UNIQUE_USERS: &str = "chat_unique_users";
pub const METRIC_WEB_HITS: &str = "web_hits";
pub const METRIC_WEB_UNIQUE_VISITORS: &str = "web_unique_visitors";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct DailyMetricsRecord {
    #[serde(default)]
    counters: BTreeMap<String, u64>,
    #[serde(default)]
    updated_at_ms: i64,
}

/// Formats a millisecond timestamp as a `YYYY-MM-DD` UTC day key.
pub fn utc_day_key(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(moment) => moment.format("%Y-%m-%d").to_string(),
        None => "1970-01-01".to_string(),
    }
}

#[derive(Clone)]
/// Counter bookkeeping over the shared key-value store.
pub struct MetricsLedger {
    kv: Arc<dyn KeyValueStore>,
}

impl MetricsLedger {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn load_day(&self, day_key: &str) -> Result<DailyMetricsRecord> {
        let raw = self
            .kv
            .get(&keys::metrics_day(day_key))
            .context("failed to read daily metrics")?;
        Ok(raw
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default())
    }

    /// Read-modify-write increment of one named counter for today (UTC).
    pub fn increment(&self, name: &str, amount: u64) -> Result<()> {
        let now_ms = current_unix_timestamp_ms();
        let day_key = utc_day_key(now_ms);
        let mut record = self.load_day(&day_key)?;
        let entry = record.counters.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
        record.updated_at_ms = now_ms;
        let payload =
            serde_json::to_string_pretty(&record).context("failed to serialize daily metrics")?;
        self.kv
            .put(&keys::metrics_day(&day_key), &payload)
            .context("failed to persist daily metrics")
    }

    /// Snapshot of one UTC day's counters; missing days read empty.
    pub fn day_snapshot(&self, day_key: &str) -> Result<BTreeMap<String, u64>> {
        Ok(self.load_day(day_key)?.counters)
    }

    /// Marks a chat user as seen; bumps the unique-user counter only on the
    /// first sighting. Returns whether this was the first time.
    pub fn record_chat_user_seen(&self, user_id: i64) -> Result<bool> {
        let key = keys::chat_user_seen(user_id);
        if self.kv.get(&key).context("failed to read first-seen marker")?.is_some() {
            return Ok(false);
        }
        self.kv
            .put(&key, &current_unix_timestamp_ms().to_string())
            .context("failed to persist first-seen marker")?;
        self.increment(METRIC_CHAT_UNIQUE_USERS, 1)?;
        Ok(true)
    }

    /// Records one web hit: global counter, per-path counter, and a
    /// unique-visitor bump keyed by the caller-supplied fingerprint.
    pub fn record_web_hit(&self, fingerprint: &str, path: &str) -> Result<()> {
        self.increment(METRIC_WEB_HITS, 1)?;

        let day_key = utc_day_key(current_unix_timestamp_ms());
        let path_key = keys::web_path_hits(&day_key, path);
        let hits = self
            .kv
            .get(&path_key)
            .context("failed to read path counter")?
            .as_deref()
            .map(str::trim)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        self.kv
            .put(&path_key, &hits.saturating_add(1).to_string())
            .context("failed to persist path counter")?;

        let seen_key = keys::web_visitor_seen(fingerprint);
        if self.kv.get(&seen_key).context("failed to read visitor marker")?.is_none() {
            self.kv
                .put(&seen_key, &current_unix_timestamp_ms().to_string())
                .context("failed to persist visitor marker")?;
            self.increment(METRIC_WEB_UNIQUE_VISITORS, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::FsKeyValueStore;

    fn ledger_in(tempdir: &tempfile::TempDir) -> MetricsLedger {
        let kv = FsKeyValueStore::open(tempdir.path()).expect("open kv");
        MetricsLedger::new(Arc::new(kv))
    }

    #[test]
    fn unit_utc_day_key_formats_epoch_milliseconds() {
        assert_eq!(utc_day_key(0), "1970-01-01");
        // 2024-03-01T12:00:00Z
        assert_eq!(utc_day_key(1_709_294_400_000), "2024-03-01");
    }

    #[test]
    fn functional_increment_accumulates_within_a_day() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let ledger = ledger_in(&tempdir);
        ledger.increment(METRIC_CHAT_EVENTS, 1).expect("inc");
        ledger.increment(METRIC_CHAT_EVENTS, 2).expect("inc");

        let today = utc_day_key(current_unix_timestamp_ms());
        let counters = ledger.day_snapshot(&today).expect("snapshot");
        assert_eq!(counters.get(METRIC_CHAT_EVENTS), Some(&3));
    }

    #[test]
    fn functional_chat_user_first_seen_counts_once() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let ledger = ledger_in(&tempdir);
        assert!(ledger.record_chat_user_seen(42).expect("first"));
        assert!(!ledger.record_chat_user_seen(42).expect("second"));

        let today = utc_day_key(current_unix_timestamp_ms());
        let counters = ledger.day_snapshot(&today).expect("snapshot");
        assert_eq!(counters.get(METRIC_CHAT_UNIQUE_USERS), Some(&1));
    }

    #[test]
    fn functional_web_hits_bucket_unique_visitors_by_fingerprint() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let ledger = ledger_in(&tempdir);
        ledger.record_web_hit("aabbccdd", "/lobby").expect("hit");
        ledger.record_web_hit("aabbccdd", "/lobby").expect("hit");
        ledger.record_web_hit("11223344", "/lobby").expect("hit");

        let today = utc_day_key(current_unix_timestamp_ms());
        let counters = ledger.day_snapshot(&today).expect("snapshot");
        assert_eq!(counters.get(METRIC_WEB_HITS), Some(&3));
        assert_eq!(counters.get(METRIC_WEB_UNIQUE_VISITORS), Some(&2));
    }

    #[test]
    fn unit_missing_day_snapshot_reads_empty() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let ledger = ledger_in(&tempdir);
        assert!(ledger.day_snapshot("2020-01-01").expect("snapshot").is_empty());
    }
}
