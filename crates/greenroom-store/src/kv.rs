//! String key-value store seam plus the filesystem implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use greenroom_core::write_text_atomic;

/// Durable mapping from string key to string value. Read-modify-write is the
/// caller's responsibility; implementations guarantee only that individual
/// reads and writes are atomic.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// One sanitized file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FsKeyValueStore {
    root: PathBuf,
}

impl FsKeyValueStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            bail!("key-value store root cannot be empty");
        }
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;
        Ok(Self { root })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key_for_path(key))
    }
}

impl KeyValueStore for FsKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read key file {}", path.display()))?;
        Ok(Some(raw))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            bail!("key-value store key cannot be empty");
        }
        let path = self.entry_path(key);
        write_text_atomic(&path, value)
            .with_context(|| format!("failed to persist key '{key}'"))
    }
}

fn sanitize_key_for_path(key: &str) -> String {
    key.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect()
}
