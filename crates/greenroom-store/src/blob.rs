//! Blob storage seam: content upload by key plus public URL derivation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;

use greenroom_core::atomic_io::write_bytes_atomic;
use greenroom_core::{current_unix_timestamp_ms, write_text_atomic};

/// Content-addressable upload target. `put_object` must complete before any
/// catalog entry referencing the key is created.
pub trait BlobStore: Send + Sync {
    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
    fn public_url(&self, key: &str) -> String;
}

/// Filesystem-backed blob store. Objects land under a root directory with a
/// JSON sidecar recording the content type; the public URL joins a configured
/// base with the key, or falls back to the raw key when no base is set.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base: Option<String>,
}

impl FsBlobStore {
    pub fn open(root: impl Into<PathBuf>, public_base: Option<String>) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            bail!("blob store root cannot be empty");
        }
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;
        let public_base = public_base
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        Ok(Self { root, public_base })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let key = key.trim();
        if key.is_empty() {
            bail!("blob key cannot be empty");
        }
        if key.split('/').any(|segment| segment == "..") {
            bail!("blob key '{key}' must not contain parent traversal");
        }
        Ok(self.root.join(key))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        write_bytes_atomic(&path, bytes)
            .with_context(|| format!("failed to store blob '{key}'"))?;
        let meta = json!({
            "content_type": content_type,
            "size_bytes": bytes.len(),
            "uploaded_at_ms": current_unix_timestamp_ms(),
        });
        let meta_path = path.with_extension(format!(
            "{}meta.json",
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!("{ext}."))
                .unwrap_or_default()
        ));
        write_text_atomic(&meta_path, &meta.to_string())
            .with_context(|| format!("failed to store blob metadata for '{key}'"))
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base {
            Some(base) => format!("{base}/{key}"),
            None => key.to_string(),
        }
    }
}
