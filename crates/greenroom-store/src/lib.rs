//! Durable state for the Greenroom console.
//!
//! Everything the dispatcher needs to remember between webhook invocations
//! lives behind the `KeyValueStore` and `BlobStore` seams: the access window,
//! the track catalog and its index, per-admin session and panel records, and
//! the daily metrics ledger. The filesystem implementations write JSON
//! atomically (temp file + rename) so a crashed handler never leaves a
//! half-written record.
//!
//! None of the read-modify-write sequences here take locks: the intended
//! deployment has exactly one admin, so a concurrent admin session can race
//! an index or session update and the last writer wins. That consistency gap
//! is accepted, not solved.

pub mod access_window;
pub mod blob;
pub mod catalog;
pub mod keys;
pub mod kv;
pub mod metrics;
pub mod session;

pub use access_window::{AccessWindow, OPEN_FOREVER_MS};
pub use blob::{BlobStore, FsBlobStore};
pub use catalog::{ChapterMark, TrackCatalog, TrackRecord, TrackStatus};
pub use kv::{FsKeyValueStore, KeyValueStore};
pub use metrics::{
    utc_day_key, MetricsLedger, METRIC_CHAT_EVENTS, METRIC_CHAT_UNIQUE_USERS, METRIC_WEB_HITS,
    METRIC_WEB_UNIQUE_VISITORS,
};
pub use session::{AdminSession, PanelHandle, PendingInput, Screen, SessionStore};
