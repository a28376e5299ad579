//! Text normalization helpers for storage keys and visitor fingerprints.

const SLUG_MAX_CHARS: usize = 70;

/// Normalizes a human title into a storage-key slug: lowercase, letters and
/// digits plus hyphen/underscore kept, whitespace runs collapsed to a single
/// hyphen, capped at 70 chars. Empty input falls back to `"track"`.
pub fn sanitize_slug(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            pending_hyphen = !slug.is_empty();
            continue;
        }
        if !(ch.is_alphanumeric() || ch == '-' || ch == '_') {
            continue;
        }
        if pending_hyphen {
            slug.push('-');
            pending_hyphen = false;
        }
        slug.push(ch);
    }
    let slug: String = slug.chars().take(SLUG_MAX_CHARS).collect();
    if slug.is_empty() {
        "track".to_string()
    } else {
        slug
    }
}

/// Drops a trailing `.ext` suffix (ascii letters/digits only) from a file name.
pub fn strip_file_extension(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|ch| ch.is_ascii_alphanumeric()) =>
        {
            stem.to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// FNV-1a 32-bit hash rendered as lowercase hex. Used for uniqueness
/// bucketing of web visitors, not for anything security-sensitive.
pub fn fnv1a_32_hex(input: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{hash:08x}")
}
