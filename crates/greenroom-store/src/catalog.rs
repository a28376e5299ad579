//! Track catalog: durable records plus the ordered upload index.
//!
//! The index is a whole-list read-modify-write target; `set_current` scans
//! every record to keep the "at most one current track" invariant. Both are
//! O(n) in catalog size, which is acceptable for a small curated catalog.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::kv::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Visibility of a catalogued track.
pub enum TrackStatus {
    Draft,
    Public,
}

impl TrackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Public => "public",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Draft => Self::Public,
            Self::Public => Self::Draft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single chapter marker inside a track.
pub struct ChapterMark {
    pub offset_seconds: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Catalogued media asset. `id` doubles as the blob storage key and is
/// immutable once created; status, description, chapters and `is_current`
/// are the only mutable fields. Tracks are never deleted.
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub status: TrackStatus,
    pub url: String,
    pub created_at_ms: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: Vec<ChapterMark>,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Clone)]
/// Catalog operations over the shared key-value store.
pub struct TrackCatalog {
    kv: Arc<dyn KeyValueStore>,
}

impl TrackCatalog {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn index(&self) -> Result<Vec<String>> {
        let raw = self
            .kv
            .get(keys::TRACK_INDEX)
            .context("failed to read track index")?;
        match raw {
            Some(raw) => serde_json::from_str(&raw).context("failed to parse track index"),
            None => Ok(Vec::new()),
        }
    }

    fn store_index(&self, ids: &[String]) -> Result<()> {
        let payload = serde_json::to_string(ids).context("failed to serialize track index")?;
        self.kv
            .put(keys::TRACK_INDEX, &payload)
            .context("failed to persist track index")
    }

    fn store_record(&self, track: &TrackRecord) -> Result<()> {
        let payload =
            serde_json::to_string_pretty(track).context("failed to serialize track record")?;
        self.kv
            .put(&keys::track(&track.id), &payload)
            .with_context(|| format!("failed to persist track '{}'", track.id))
    }

    /// Appends the track to the index and persists the record. Callers must
    /// only invoke this after the backing blob upload succeeded; there is no
    /// catalog entry without backing data.
    pub fn create(&self, track: &TrackRecord) -> Result<()> {
        self.store_record(track)?;
        let mut ids = self.index()?;
        if !ids.iter().any(|id| id == &track.id) {
            ids.push(track.id.clone());
            self.store_index(&ids)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<TrackRecord>> {
        let raw = self
            .kv
            .get(&keys::track(id))
            .with_context(|| format!("failed to read track '{id}'"))?;
        match raw {
            Some(raw) => {
                let track = serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse track '{id}'"))?;
                Ok(Some(track))
            }
            None => Ok(None),
        }
    }

    /// Most-recent-first listing of up to `limit` tracks. Index entries whose
    /// record went missing are skipped rather than failing the listing.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<TrackRecord>> {
        let ids = self.index()?;
        let mut tracks = Vec::with_capacity(limit.min(ids.len()));
        for id in ids.iter().rev() {
            if tracks.len() >= limit {
                break;
            }
            if let Some(track) = self.get(id)? {
                tracks.push(track);
            }
        }
        Ok(tracks)
    }

    /// Read-modify-write of one record. Returns `false` without touching
    /// anything when the id is unknown; callers must check.
    pub fn update<F>(&self, id: &str, mutator: F) -> Result<bool>
    where
        F: FnOnce(&mut TrackRecord),
    {
        let Some(mut track) = self.get(id)? else {
            return Ok(false);
        };
        mutator(&mut track);
        track.id = id.to_string();
        self.store_record(&track)?;
        Ok(true)
    }

    /// Clears `is_current` everywhere, then sets it on `id` if that track
    /// exists. Returns whether the id was found; on a miss no record changes.
    pub fn set_current(&self, id: &str) -> Result<bool> {
        let ids = self.index()?;
        if !ids.iter().any(|known| known == id) {
            return Ok(false);
        }
        for known in &ids {
            let Some(mut track) = self.get(known)? else {
                continue;
            };
            let should_be_current = known == id;
            if track.is_current != should_be_current {
                track.is_current = should_be_current;
                self.store_record(&track)?;
            }
        }
        Ok(true)
    }

    /// The track currently marked as playing, if any.
    pub fn current(&self) -> Result<Option<TrackRecord>> {
        for id in self.index()?.iter().rev() {
            if let Some(track) = self.get(id)? {
                if track.is_current {
                    return Ok(Some(track));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::FsKeyValueStore;

    fn catalog_in(tempdir: &tempfile::TempDir) -> TrackCatalog {
        let kv = FsKeyValueStore::open(tempdir.path()).expect("open kv");
        TrackCatalog::new(Arc::new(kv))
    }

    fn sample_track(id: &str, created_at_ms: i64) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: format!("title-{id}"),
            status: TrackStatus::Draft,
            url: format!("https://cdn.example/{id}"),
            created_at_ms,
            description: String::new(),
            chapters: Vec::new(),
            is_current: false,
        }
    }

    #[test]
    fn functional_create_appends_in_upload_order_and_lists_most_recent_first() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog_in(&tempdir);
        catalog.create(&sample_track("tracks/1-first.mp3", 1)).expect("create");
        catalog.create(&sample_track("tracks/2-second.mp3", 2)).expect("create");
        catalog.create(&sample_track("tracks/3-third.mp3", 3)).expect("create");

        assert_eq!(
            catalog.index().expect("index"),
            vec![
                "tracks/1-first.mp3".to_string(),
                "tracks/2-second.mp3".to_string(),
                "tracks/3-third.mp3".to_string(),
            ]
        );
        let recent = catalog.list_recent(2).expect("list");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "tracks/3-third.mp3");
        assert_eq!(recent[1].id, "tracks/2-second.mp3");
    }

    #[test]
    fn functional_update_mutates_existing_and_reports_missing() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog_in(&tempdir);
        catalog.create(&sample_track("tracks/1-a.mp3", 1)).expect("create");

        let updated = catalog
            .update("tracks/1-a.mp3", |track| {
                track.status = TrackStatus::Public;
                track.description = "liner notes".to_string();
            })
            .expect("update");
        assert!(updated);
        let track = catalog.get("tracks/1-a.mp3").expect("get").expect("present");
        assert_eq!(track.status, TrackStatus::Public);
        assert_eq!(track.description, "liner notes");

        let missing = catalog.update("tracks/ghost.mp3", |_| {}).expect("update");
        assert!(!missing);
    }

    #[test]
    fn functional_set_current_enforces_single_current_track() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog_in(&tempdir);
        catalog.create(&sample_track("tracks/1-a.mp3", 1)).expect("create");
        catalog.create(&sample_track("tracks/2-b.mp3", 2)).expect("create");

        assert!(catalog.set_current("tracks/1-a.mp3").expect("set"));
        assert!(catalog.set_current("tracks/2-b.mp3").expect("set"));

        let current: Vec<String> = catalog
            .list_recent(10)
            .expect("list")
            .into_iter()
            .filter(|track| track.is_current)
            .map(|track| track.id)
            .collect();
        assert_eq!(current, vec!["tracks/2-b.mp3".to_string()]);
        assert_eq!(
            catalog.current().expect("current").expect("some").id,
            "tracks/2-b.mp3"
        );
    }

    #[test]
    fn regression_set_current_on_unknown_id_changes_nothing() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let catalog = catalog_in(&tempdir);
        catalog.create(&sample_track("tracks/1-a.mp3", 1)).expect("create");
        assert!(catalog.set_current("tracks/1-a.mp3").expect("set"));

        assert!(!catalog.set_current("tracks/ghost.mp3").expect("set"));
        let track = catalog.get("tracks/1-a.mp3").expect("get").expect("present");
        assert!(track.is_current);
    }

    #[test]
    fn regression_track_record_tolerates_missing_optional_fields() {
        let raw = r#"{
            "id": "tracks/1-a.mp3",
            "title": "a",
            "status": "draft",
            "url": "https://cdn.example/a",
            "created_at_ms": 1
        }"#;
        let track: TrackRecord = serde_json::from_str(raw).expect("parse");
        assert!(track.description.is_empty());
        assert!(track.chapters.is_empty());
        assert!(!track.is_current);
    }
}
