//! Typed codec for inline-button callback data.
//!
//! Every button encodes one `CallbackAction`; parsing turns the wire string
//! back into the tagged variant so dispatch never branches on raw strings.

use greenroom_store::{Screen, TrackStatus};

const MINUTE_MS: i64 = 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Preset durations offered on the access screen.
pub enum GatePreset {
    Minutes15,
    Hour1,
    Hours6,
    Hours24,
    Forever,
}

impl GatePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minutes15 => "15m",
            Self::Hour1 => "1h",
            Self::Hours6 => "6h",
            Self::Hours24 => "24h",
            Self::Forever => "forever",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "15m" => Some(Self::Minutes15),
            "1h" => Some(Self::Hour1),
            "6h" => Some(Self::Hours6),
            "24h" => Some(Self::Hours24),
            "forever" => Some(Self::Forever),
            _ => None,
        }
    }

    /// Window duration in milliseconds; `None` means open indefinitely.
    pub fn duration_ms(self) -> Option<i64> {
        match self {
            Self::Minutes15 => Some(15 * MINUTE_MS),
            Self::Hour1 => Some(60 * MINUTE_MS),
            Self::Hours6 => Some(6 * 60 * MINUTE_MS),
            Self::Hours24 => Some(24 * 60 * MINUTE_MS),
            Self::Forever => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minutes15 => "Open 15 min",
            Self::Hour1 => "Open 1 hour",
            Self::Hours6 => "Open 6 hours",
            Self::Hours24 => "Open 24 hours",
            Self::Forever => "Open forever",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Decoded admin button press.
pub enum CallbackAction {
    Navigate(Screen),
    GateOpen(GatePreset),
    GateCustom,
    GateClose,
    UploadPrompt(TrackStatus),
    TrackList,
    TrackEdit(String),
    TrackToggle(String),
    TrackDescription(String),
    TrackChapters(String),
    TrackSetCurrent(String),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            Self::Navigate(screen) => format!("nav:{}", screen.as_str()),
            Self::GateOpen(preset) => format!("gate:open:{}", preset.as_str()),
            Self::GateCustom => "gate:custom".to_string(),
            Self::GateClose => "gate:close".to_string(),
            Self::UploadPrompt(status) => format!("trk:upload:{}", status.as_str()),
            Self::TrackList => "trk:list".to_string(),
            Self::TrackEdit(id) => format!("trk:edit:{id}"),
            Self::TrackToggle(id) => format!("trk:toggle:{id}"),
            Self::TrackDescription(id) => format!("trk:desc:{id}"),
            Self::TrackChapters(id) => format!("trk:chapters:{id}"),
            Self::TrackSetCurrent(id) => format!("trk:current:{id}"),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(screen) = raw.strip_prefix("nav:") {
            return Screen::parse(screen).map(Self::Navigate);
        }
        if let Some(rest) = raw.strip_prefix("gate:") {
            if rest == "close" {
                return Some(Self::GateClose);
            }
            if rest == "custom" {
                return Some(Self::GateCustom);
            }
            if let Some(preset) = rest.strip_prefix("open:") {
                return GatePreset::parse(preset).map(Self::GateOpen);
            }
            return None;
        }
        if let Some(rest) = raw.strip_prefix("trk:") {
            if rest == "list" {
                return Some(Self::TrackList);
            }
            if let Some(status) = rest.strip_prefix("upload:") {
                return match status {
                    "draft" => Some(Self::UploadPrompt(TrackStatus::Draft)),
                    "public" => Some(Self::UploadPrompt(TrackStatus::Public)),
                    _ => None,
                };
            }
            let (verb, id) = rest.split_once(':')?;
            if id.is_empty() {
                return None;
            }
            let id = id.to_string();
            return match verb {
                "edit" => Some(Self::TrackEdit(id)),
                "toggle" => Some(Self::TrackToggle(id)),
                "desc" => Some(Self::TrackDescription(id)),
                "chapters" => Some(Self::TrackChapters(id)),
                "current" => Some(Self::TrackSetCurrent(id)),
                _ => None,
            };
        }
        None
    }
}
