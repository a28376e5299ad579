//! Foundational low-level utilities shared across Greenroom crates.
//!
//! Provides atomic file-write helpers, time utilities used by the access
//! window and catalog timestamps, and small text helpers (storage-key slugs,
//! visitor fingerprints).

pub mod atomic_io;
pub mod text_utils;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use text_utils::{fnv1a_32_hex, sanitize_slug, strip_file_extension};
pub use time_utils::current_unix_timestamp_ms;

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn unit_current_unix_timestamp_ms_is_monotonic_enough() {
        let first = current_unix_timestamp_ms();
        let second = current_unix_timestamp_ms();
        assert!(second >= first);
    }

    #[test]
    fn unit_write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("sample.txt");
        write_text_atomic(&path, "hello world").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "hello world");
    }

    #[test]
    fn unit_write_text_atomic_overwrites_existing_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("sample.txt");
        write_text_atomic(&path, "first").expect("write first");
        write_text_atomic(&path, "second").expect("write second");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "second");
    }
}
