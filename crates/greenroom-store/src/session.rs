//! Per-admin navigation state, pending input expectation, and panel handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::TrackStatus;
use crate::keys;
use crate::kv::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
/// Console screen currently shown in the admin panel.
pub enum Screen {
    #[default]
    Main,
    Access,
    Tracks,
    Stats,
    Settings,
    Help,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Access => "access",
            Self::Tracks => "tracks",
            Self::Stats => "stats",
            Self::Settings => "settings",
            Self::Help => "help",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "main" => Some(Self::Main),
            "access" => Some(Self::Access),
            "tracks" => Some(Self::Tracks),
            "stats" => Some(Self::Stats),
            "settings" => Some(Self::Settings),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// What the admin's next message means. One constructor per expectation,
/// carrying exactly the payload that case needs. At most one pending input
/// exists per admin; it is consumed in the same step that resolves it.
pub enum PendingInput {
    Upload { visibility: TrackStatus },
    Description { track_id: String },
    Chapters { track_id: String },
    CustomMinutes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
/// Stored navigation state for one admin identity.
pub struct AdminSession {
    #[serde(default)]
    pub screen: Screen,
    #[serde(default)]
    pub pending: Option<PendingInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Identity of the single live panel message for one admin.
pub struct PanelHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Clone)]
/// Session and panel-handle persistence over the shared key-value store.
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Loads the admin session; a missing or unparseable record resets to the
    /// default (main screen, nothing pending) instead of failing the event.
    pub fn load_session(&self, admin_id: i64) -> Result<AdminSession> {
        let raw = self
            .kv
            .get(&keys::admin_session(admin_id))
            .context("failed to read admin session")?;
        let session = raw
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        Ok(session)
    }

    pub fn save_session(&self, admin_id: i64, session: &AdminSession) -> Result<()> {
        let payload =
            serde_json::to_string_pretty(session).context("failed to serialize admin session")?;
        self.kv
            .put(&keys::admin_session(admin_id), &payload)
            .context("failed to persist admin session")
    }

    pub fn load_panel(&self, admin_id: i64) -> Result<Option<PanelHandle>> {
        let raw = self
            .kv
            .get(&keys::admin_panel(admin_id))
            .context("failed to read panel handle")?;
        Ok(raw.as_deref().and_then(|raw| serde_json::from_str(raw).ok()))
    }

    pub fn save_panel(&self, admin_id: i64, handle: &PanelHandle) -> Result<()> {
        let payload =
            serde_json::to_string(handle).context("failed to serialize panel handle")?;
        self.kv
            .put(&keys::admin_panel(admin_id), &payload)
            .context("failed to persist panel handle")
    }
}
