//! Track ingestion: resolve, download, store, catalogue. Strictly sequential;
//! any failure aborts before the catalog write, so there is never a catalog
//! entry without backing bytes.

use anyhow::{Context, Result};

use greenroom_core::{current_unix_timestamp_ms, sanitize_slug, strip_file_extension};
use greenroom_store::{BlobStore, TrackCatalog, TrackRecord, TrackStatus};
use greenroom_telegram::{FileAttachment, TelegramApiClient};

/// Maps an upload to a storage extension, content type first and the original
/// file path as fallback. Unknown types get no extension rather than a guess.
fn guess_extension(content_type: &str, file_path: &str) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();
    let file_path = file_path.to_ascii_lowercase();
    if content_type.contains("mpeg") || file_path.ends_with(".mp3") {
        ".mp3"
    } else if content_type.contains("wav") || file_path.ends_with(".wav") {
        ".wav"
    } else if content_type.contains("mp4") || file_path.ends_with(".m4a") {
        ".m4a"
    } else if content_type.contains("ogg") || file_path.ends_with(".ogg") {
        ".ogg"
    } else {
        ""
    }
}

/// Title precedence: caption, then the attachment file name without its
/// extension, then a fixed fallback.
fn resolve_title(caption: &str, file_name: Option<&str>) -> String {
    let caption = caption.trim();
    if !caption.is_empty() {
        return caption.to_string();
    }
    let from_name = file_name.map(strip_file_extension).unwrap_or_default();
    let from_name = from_name.trim();
    if from_name.is_empty() {
        "untitled".to_string()
    } else {
        from_name.to_string()
    }
}

/// Runs the full upload pipeline for one audio attachment and returns the
/// catalogued record.
pub async fn ingest_track_upload(
    telegram: &TelegramApiClient,
    blob: &dyn BlobStore,
    catalog: &TrackCatalog,
    file: &FileAttachment,
    caption: &str,
    visibility: TrackStatus,
) -> Result<TrackRecord> {
    let title = resolve_title(caption, file.file_name.as_deref());

    let file_path = telegram
        .get_file_path(&file.file_id)
        .await
        .context("failed to resolve uploaded file")?;
    let downloaded = telegram
        .download_file(&file_path)
        .await
        .context("failed to download uploaded file")?;

    let extension = guess_extension(&downloaded.content_type, &file_path);
    let created_at_ms = current_unix_timestamp_ms();
    let key = format!("tracks/{created_at_ms}-{}{extension}", sanitize_slug(&title));

    blob.put_object(&key, &downloaded.bytes, &downloaded.content_type)
        .with_context(|| format!("failed to store track object '{key}'"))?;

    let track = TrackRecord {
        id: key.clone(),
        title,
        status: visibility,
        url: blob.public_url(&key),
        created_at_ms,
        description: String::new(),
        chapters: Vec::new(),
        is_current: false,
    };
    catalog
        .create(&track)
        .context("failed to catalogue uploaded track")?;
    Ok(track)
}
