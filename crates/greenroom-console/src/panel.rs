//! Pure renderers for the single-message admin panel.
//!
//! Every screen is a function from state to `PanelContent`; nothing in here
//! touches the store or the chat API, which keeps the renders trivially
//! testable. Text is Telegram Markdown.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use greenroom_store::{
    AccessWindow, Screen, TrackRecord, TrackStatus, METRIC_CHAT_EVENTS,
    METRIC_CHAT_UNIQUE_USERS, METRIC_WEB_HITS, METRIC_WEB_UNIQUE_VISITORS,
};
use greenroom_telegram::{InlineKeyboard, InlineKeyboardButton};

use crate::actions::{CallbackAction, GatePreset};

/// Rendered panel message: Markdown body plus inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelContent {
    pub text: String,
    pub keyboard: InlineKeyboard,
}

fn nav_button(label: &str, screen: Screen) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, CallbackAction::Navigate(screen).encode())
}

fn back_row(screen: Screen) -> Vec<InlineKeyboardButton> {
    vec![nav_button("« Back", screen)]
}

fn format_utc_timestamp(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(moment) => moment.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "unknown".to_string(),
    }
}

fn gate_summary(window: &AccessWindow, now_ms: i64) -> String {
    if window.is_indefinite() {
        "🟢 Open indefinitely".to_string()
    } else if window.is_open(now_ms) {
        format!("🟢 Open until {}", format_utc_timestamp(window.open_until_ms))
    } else {
        "🔴 Closed".to_string()
    }
}

pub fn render_main(window: &AccessWindow, now_ms: i64, track_count: usize) -> PanelContent {
    let text = format!(
        "*Greenroom Console*\n\nDoor: {}\nTracks in catalog: {}",
        gate_summary(window, now_ms),
        track_count
    );
    let keyboard = InlineKeyboard::new()
        .row(vec![
            nav_button("🚪 Access", Screen::Access),
            nav_button("🎵 Tracks", Screen::Tracks),
        ])
        .row(vec![
            nav_button("📊 Stats", Screen::Stats),
            nav_button("⚙️ Settings", Screen::Settings),
        ])
        .row(vec![nav_button("❓ Help", Screen::Help)]);
    PanelContent { text, keyboard }
}

pub fn render_access(window: &AccessWindow, now_ms: i64) -> PanelContent {
    let text = format!("*Access*\n\nDoor: {}", gate_summary(window, now_ms));
    let keyboard = InlineKeyboard::new()
        .row(vec![
            preset_button(GatePreset::Minutes15),
            preset_button(GatePreset::Hour1),
        ])
        .row(vec![
            preset_button(GatePreset::Hours6),
            preset_button(GatePreset::Hours24),
        ])
        .row(vec![
            preset_button(GatePreset::Forever),
            InlineKeyboardButton::callback("Custom…", CallbackAction::GateCustom.encode()),
        ])
        .row(vec![InlineKeyboardButton::callback(
            "🔒 Close now",
            CallbackAction::GateClose.encode(),
        )])
        .row(back_row(Screen::Main));
    PanelContent { text, keyboard }
}

fn preset_button(preset: GatePreset) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(preset.label(), CallbackAction::GateOpen(preset).encode())
}

pub fn render_tracks(track_count: usize) -> PanelContent {
    let text = format!("*Tracks*\n\n{} in catalog.", track_count);
    let keyboard = InlineKeyboard::new()
        .row(vec![
            InlineKeyboardButton::callback(
                "⬆️ Upload draft",
                CallbackAction::UploadPrompt(TrackStatus::Draft).encode(),
            ),
            InlineKeyboardButton::callback(
                "⬆️ Upload public",
                CallbackAction::UploadPrompt(TrackStatus::Public).encode(),
            ),
        ])
        .row(vec![InlineKeyboardButton::callback(
            "📋 List recent",
            CallbackAction::TrackList.encode(),
        )])
        .row(back_row(Screen::Main));
    PanelContent { text, keyboard }
}

pub fn render_stats(day_key: &str, counters: &BTreeMap<String, u64>) -> PanelContent {
    let counter = |name: &str| counters.get(name).copied().unwrap_or(0);
    let text = format!(
        "*Stats for {day_key}*\n\nChat events: {}\nNew chat users: {}\nWeb hits: {}\nNew web visitors: {}",
        counter(METRIC_CHAT_EVENTS),
        counter(METRIC_CHAT_UNIQUE_USERS),
        counter(METRIC_WEB_HITS),
        counter(METRIC_WEB_UNIQUE_VISITORS),
    );
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(back_row(Screen::Main)),
    }
}

pub fn render_settings(webapp_url: &str, media_public_base: &str) -> PanelContent {
    let text = format!(
        "*Settings*\n\nLobby: {webapp_url}\nMedia base: {media_public_base}\n\nValues come from the server environment and are read-only here."
    );
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(back_row(Screen::Main)),
    }
}

pub fn render_help() -> PanelContent {
    let text = "*Help*\n\n\
        • *Access* opens or closes the door for listeners.\n\
        • *Tracks* uploads audio and edits the catalog.\n\
        • *Stats* shows today's chat and web counters.\n\
        Send /menu at any time to return here."
        .to_string();
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(back_row(Screen::Main)),
    }
}

pub fn render_track_list(tracks: &[TrackRecord]) -> PanelContent {
    let mut text = String::from("*Recent tracks*\n");
    if tracks.is_empty() {
        text.push_str("\nNothing uploaded yet.");
    }
    let mut keyboard = InlineKeyboard::new();
    for track in tracks {
        let marker = if track.is_current { " ▶" } else { "" };
        text.push_str(&format!(
            "\n{} {}{}",
            status_glyph(track.status),
            track.title,
            marker
        ));
        keyboard = keyboard.row(vec![InlineKeyboardButton::callback(
            format!("✏️ {}", track.title),
            CallbackAction::TrackEdit(track.id.clone()).encode(),
        )]);
    }
    keyboard = keyboard.row(back_row(Screen::Tracks));
    PanelContent { text, keyboard }
}

fn status_glyph(status: TrackStatus) -> &'static str {
    match status {
        TrackStatus::Draft => "📝",
        TrackStatus::Public => "🌐",
    }
}

pub fn render_track_editor(track: &TrackRecord) -> PanelContent {
    let description = if track.description.is_empty() {
        "(none)"
    } else {
        track.description.as_str()
    };
    let text = format!(
        "*{}*\n\nStatus: {}{}\nUploaded: {}\nChapters: {}\nDescription: {}\nURL: {}",
        track.title,
        track.status.as_str(),
        if track.is_current { " · current" } else { "" },
        format_utc_timestamp(track.created_at_ms),
        track.chapters.len(),
        description,
        track.url,
    );
    let toggle_label = match track.status {
        TrackStatus::Draft => "🌐 Publish",
        TrackStatus::Public => "📝 Unpublish",
    };
    let keyboard = InlineKeyboard::new()
        .row(vec![
            InlineKeyboardButton::callback(
                toggle_label,
                CallbackAction::TrackToggle(track.id.clone()).encode(),
            ),
            InlineKeyboardButton::callback(
                "▶ Set current",
                CallbackAction::TrackSetCurrent(track.id.clone()).encode(),
            ),
        ])
        .row(vec![
            InlineKeyboardButton::callback(
                "📝 Description",
                CallbackAction::TrackDescription(track.id.clone()).encode(),
            ),
            InlineKeyboardButton::callback(
                "🕘 Chapters",
                CallbackAction::TrackChapters(track.id.clone()).encode(),
            ),
        ])
        .row(vec![InlineKeyboardButton::callback(
            "« Back to list",
            CallbackAction::TrackList.encode(),
        )]);
    PanelContent { text, keyboard }
}

pub fn render_upload_prompt(visibility: TrackStatus) -> PanelContent {
    let text = format!(
        "*Upload track*\n\nSend an audio file. It will be catalogued as *{}*.\nA caption becomes the title; otherwise the file name is used.",
        visibility.as_str()
    );
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(back_row(Screen::Tracks)),
    }
}

pub fn render_description_prompt(track: &TrackRecord) -> PanelContent {
    let text = format!(
        "*Description for {}*\n\nSend the new description as a message.",
        track.title
    );
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(vec![InlineKeyboardButton::callback(
            "« Back",
            CallbackAction::TrackEdit(track.id.clone()).encode(),
        )]),
    }
}

pub fn render_chapters_prompt(track: &TrackRecord) -> PanelContent {
    let text = format!(
        "*Chapters for {}*\n\nSend one mark per line, `mm:ss Title` or `hh:mm:ss Title`:\n```\n00:00 Intro\n01:12 Verse\n```",
        track.title
    );
    PanelContent {
        text,
        keyboard: InlineKeyboard::new().row(vec![InlineKeyboardButton::callback(
            "« Back",
            CallbackAction::TrackEdit(track.id.clone()).encode(),
        )]),
    }
}

pub fn render_custom_minutes_prompt() -> PanelContent {
    PanelContent {
        text: "*Custom window*\n\nSend the number of minutes to keep the door open (1 to 10080)."
            .to_string(),
        keyboard: InlineKeyboard::new().row(back_row(Screen::Access)),
    }
}

/// Message shown to non-admin visitors: a single link into the lobby.
pub fn user_call_to_action(webapp_url: &str) -> PanelContent {
    PanelContent {
        text: "Welcome. Step inside:".to_string(),
        keyboard: InlineKeyboard::single(InlineKeyboardButton::link("Enter", webapp_url)),
    }
}
