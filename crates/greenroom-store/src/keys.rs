//! Key layout for the persisted console state.
//!
//! One key per access window, per admin session, per admin panel handle, one
//! key for the ordered track index, one key per track record, one key per
//! UTC day of metrics, one first-seen marker per chat user and web visitor.

pub const ACCESS_WINDOW: &str = "access:open_until";
pub const TRACK_INDEX: &str = "tracks:index";

pub fn admin_session(admin_id: i64) -> String {
    format!("admin:session:{admin_id}")
}

pub fn admin_panel(admin_id: i64) -> String {
    format!("admin:panel:{admin_id}")
}

pub fn track(track_id: &str) -> String {
    format!("track:{track_id}")
}

pub fn metrics_day(day_key: &str) -> String {
    format!("metrics:{day_key}")
}

pub fn chat_user_seen(user_id: i64) -> String {
    format!("chatuser:{user_id}")
}

pub fn web_visitor_seen(fingerprint: &str) -> String {
    format!("webseen:{fingerprint}")
}

pub fn web_path_hits(day_key: &str, path: &str) -> String {
    format!("webpath:{day_key}:{path}")
}
