//! Event dispatch: routes every inbound update through admin identity,
//! callback actions, and the pending-input state machine, then reconciles
//! the single panel message.
//!
//! Store failures propagate and fail the event; chat-side niceties (answering
//! the callback, metrics bumps) are best effort and only logged.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use greenroom_core::current_unix_timestamp_ms;
use greenroom_store::{
    utc_day_key, AccessWindow, AdminSession, BlobStore, KeyValueStore, MetricsLedger, PanelHandle,
    PendingInput, Screen, SessionStore, TrackCatalog, METRIC_CHAT_EVENTS, OPEN_FOREVER_MS,
};
use greenroom_telegram::{CallbackQuery, InboundMessage, InboundUpdate, TelegramApiClient};

use crate::actions::CallbackAction;
use crate::ingest::ingest_track_upload;
use crate::panel::{self, PanelContent};

/// Custom access windows are capped at one week of minutes.
const CUSTOM_MINUTES_MAX: i64 = 7 * 24 * 60;
const MINUTE_MS: i64 = 60 * 1_000;
const TRACK_LIST_LIMIT: usize = 10;
const TRACK_NOT_FOUND: &str = "Track not found.";

#[derive(Debug, Clone)]
/// Static console configuration supplied by the server environment.
pub struct ConsoleConfig {
    pub admin_user_id: i64,
    pub webapp_url: String,
    pub media_public_base_display: String,
}

/// Stateful console engine. One instance serves all webhook invocations.
pub struct ConsoleDispatcher {
    telegram: TelegramApiClient,
    kv: Arc<dyn KeyValueStore>,
    blob: Arc<dyn BlobStore>,
    catalog: TrackCatalog,
    sessions: SessionStore,
    metrics: MetricsLedger,
    config: ConsoleConfig,
}

impl ConsoleDispatcher {
    pub fn new(
        telegram: TelegramApiClient,
        kv: Arc<dyn KeyValueStore>,
        blob: Arc<dyn BlobStore>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            telegram,
            catalog: TrackCatalog::new(kv.clone()),
            sessions: SessionStore::new(kv.clone()),
            metrics: MetricsLedger::new(kv.clone()),
            kv,
            blob,
            config,
        }
    }

    pub fn metrics(&self) -> &MetricsLedger {
        &self.metrics
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    /// Entry point for one webhook update.
    pub async fn handle_update(&self, update: &InboundUpdate) -> Result<()> {
        if let Err(error) = self.metrics.increment(METRIC_CHAT_EVENTS, 1) {
            warn!(%error, "failed to bump chat event counter");
        }
        if let Some(callback) = &update.callback_query {
            return self.handle_callback(callback).await;
        }
        if let Some(message) = update.message() {
            return self.handle_message(message).await;
        }
        Ok(())
    }

    fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.config.admin_user_id
    }

    fn note_user_seen(&self, user_id: i64) {
        if let Err(error) = self.metrics.record_chat_user_seen(user_id) {
            warn!(%error, user_id, "failed to record chat user");
        }
    }

    async fn handle_callback(&self, callback: &CallbackQuery) -> Result<()> {
        if let Err(error) = self.telegram.answer_callback_query(&callback.id).await {
            warn!(%error, "failed to answer callback query");
        }
        let Some(chat_id) = callback.message.as_ref().map(|message| message.chat.id) else {
            return Ok(());
        };
        self.note_user_seen(callback.from.id);
        if !self.is_admin(callback.from.id) {
            return self.send_call_to_action(chat_id).await;
        }

        let action = callback
            .data
            .as_deref()
            .and_then(CallbackAction::parse);
        let Some(action) = action else {
            // stale or malformed button data; recover to the main screen
            self.save_screen(Screen::Main)?;
            let content = self.render_screen(Screen::Main)?;
            return self.upsert_panel(chat_id, &content).await;
        };

        let content = self.apply_action(chat_id, action).await?;
        self.upsert_panel(chat_id, &content).await
    }

    /// Applies one button press to durable state and returns the panel
    /// content to show. Prompt renders set a pending input but leave the
    /// stored screen pointing at the section they belong to. Actions on a
    /// vanished track id tell the admin before degrading to the list.
    async fn apply_action(&self, chat_id: i64, action: CallbackAction) -> Result<PanelContent> {
        match action {
            CallbackAction::Navigate(screen) => {
                self.save_screen(screen)?;
                self.render_screen(screen)
            }
            CallbackAction::GateOpen(preset) => {
                let open_until_ms = match preset.duration_ms() {
                    Some(duration) => current_unix_timestamp_ms().saturating_add(duration),
                    None => OPEN_FOREVER_MS,
                };
                AccessWindow::store(self.kv.as_ref(), open_until_ms)?;
                self.save_screen(Screen::Access)?;
                self.render_screen(Screen::Access)
            }
            CallbackAction::GateClose => {
                AccessWindow::store(self.kv.as_ref(), 0)?;
                self.save_screen(Screen::Access)?;
                self.render_screen(Screen::Access)
            }
            CallbackAction::GateCustom => {
                self.set_pending(Screen::Access, Some(PendingInput::CustomMinutes))?;
                Ok(panel::render_custom_minutes_prompt())
            }
            CallbackAction::UploadPrompt(visibility) => {
                self.set_pending(Screen::Tracks, Some(PendingInput::Upload { visibility }))?;
                Ok(panel::render_upload_prompt(visibility))
            }
            CallbackAction::TrackList => {
                self.save_screen(Screen::Tracks)?;
                let tracks = self.catalog.list_recent(TRACK_LIST_LIMIT)?;
                Ok(panel::render_track_list(&tracks))
            }
            CallbackAction::TrackEdit(id) => {
                if self.catalog.get(&id)?.is_none() {
                    self.send_notice(chat_id, TRACK_NOT_FOUND).await;
                }
                self.render_editor_or_list(&id)
            }
            CallbackAction::TrackToggle(id) => {
                let found = self.catalog.update(&id, |track| {
                    track.status = track.status.toggled();
                })?;
                if !found {
                    self.send_notice(chat_id, TRACK_NOT_FOUND).await;
                }
                self.render_editor_or_list(&id)
            }
            CallbackAction::TrackSetCurrent(id) => {
                let found = self.catalog.set_current(&id)?;
                if !found {
                    self.send_notice(chat_id, TRACK_NOT_FOUND).await;
                }
                self.render_editor_or_list(&id)
            }
            CallbackAction::TrackDescription(id) => match self.catalog.get(&id)? {
                Some(track) => {
                    self.set_pending(
                        Screen::Tracks,
                        Some(PendingInput::Description { track_id: id }),
                    )?;
                    Ok(panel::render_description_prompt(&track))
                }
                None => {
                    self.send_notice(chat_id, TRACK_NOT_FOUND).await;
                    self.render_editor_or_list(&id)
                }
            },
            CallbackAction::TrackChapters(id) => match self.catalog.get(&id)? {
                Some(track) => {
                    self.set_pending(
                        Screen::Tracks,
                        Some(PendingInput::Chapters { track_id: id }),
                    )?;
                    Ok(panel::render_chapters_prompt(&track))
                }
                None => {
                    self.send_notice(chat_id, TRACK_NOT_FOUND).await;
                    self.render_editor_or_list(&id)
                }
            },
        }
    }

    /// Editor for a known id; a vanished id degrades to the track list.
    fn render_editor_or_list(&self, id: &str) -> Result<PanelContent> {
        self.save_screen(Screen::Tracks)?;
        match self.catalog.get(id)? {
            Some(track) => Ok(panel::render_track_editor(&track)),
            None => {
                warn!(track_id = id, "button referenced an unknown track");
                let tracks = self.catalog.list_recent(TRACK_LIST_LIMIT)?;
                Ok(panel::render_track_list(&tracks))
            }
        }
    }

    async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        let Some(from) = &message.from else {
            return Ok(());
        };
        self.note_user_seen(from.id);
        let chat_id = message.chat.id;
        if !self.is_admin(from.id) {
            return self.send_call_to_action(chat_id).await;
        }

        let text = message.text_or_caption().trim();
        if text == "/start" || text == "/menu" {
            // back to main, but only the matching input shape may consume
            // a pending expectation
            let mut session = self.sessions.load_session(self.config.admin_user_id)?;
            session.screen = Screen::Main;
            self.sessions
                .save_session(self.config.admin_user_id, &session)?;
            let content = self.render_screen(Screen::Main)?;
            return self.upsert_panel(chat_id, &content).await;
        }

        let session = self.sessions.load_session(self.config.admin_user_id)?;
        match session.pending.clone() {
            Some(pending) => self.resolve_pending(chat_id, message, session, pending).await,
            None => {
                let content = self.render_screen(session.screen)?;
                self.upsert_panel(chat_id, &content).await
            }
        }
    }

    /// Resolves a pending input against the message. A message that does not
    /// match the expectation leaves the pending input in place; a matching one
    /// consumes it in the same step, even when the content is rejected later.
    async fn resolve_pending(
        &self,
        chat_id: i64,
        message: &InboundMessage,
        session: AdminSession,
        pending: PendingInput,
    ) -> Result<()> {
        let text = message.text_or_caption().trim();
        match pending {
            PendingInput::Upload { visibility } => {
                let Some(file) = message.audio_file() else {
                    return self.keep_pending(chat_id, &session).await;
                };
                match ingest_track_upload(
                    &self.telegram,
                    self.blob.as_ref(),
                    &self.catalog,
                    file,
                    message.text_or_caption(),
                    visibility,
                )
                .await
                {
                    Ok(track) => {
                        self.set_pending(Screen::Tracks, None)?;
                        self.send_notice(chat_id, &format!("Uploaded *{}*.", track.title))
                            .await;
                        let content = panel::render_track_editor(&track);
                        self.upsert_panel(chat_id, &content).await
                    }
                    Err(error) => {
                        warn!(%error, "track upload failed");
                        self.send_notice(chat_id, "Upload failed. Send the file again.")
                            .await;
                        Ok(())
                    }
                }
            }
            PendingInput::Description { track_id } => {
                if text.is_empty() {
                    return self.keep_pending(chat_id, &session).await;
                }
                self.set_pending(Screen::Tracks, None)?;
                let description = text.to_string();
                let found = self
                    .catalog
                    .update(&track_id, |track| track.description = description)?;
                if !found {
                    self.send_notice(chat_id, "That track no longer exists.").await;
                }
                let content = self.render_editor_or_list(&track_id)?;
                self.upsert_panel(chat_id, &content).await
            }
            PendingInput::Chapters { track_id } => {
                if text.is_empty() {
                    return self.keep_pending(chat_id, &session).await;
                }
                self.set_pending(Screen::Tracks, None)?;
                let marks = crate::chapters::parse_chapter_marks(text);
                let notice = if marks.is_empty() {
                    "No chapter marks found. Format: `01:23 Title`. Chapters cleared.".to_string()
                } else {
                    format!("Saved {} chapter marks.", marks.len())
                };
                let found = self
                    .catalog
                    .update(&track_id, |track| track.chapters = marks)?;
                if found {
                    self.send_notice(chat_id, &notice).await;
                } else {
                    self.send_notice(chat_id, "That track no longer exists.").await;
                }
                let content = self.render_editor_or_list(&track_id)?;
                self.upsert_panel(chat_id, &content).await
            }
            PendingInput::CustomMinutes => {
                let minutes = text.parse::<i64>().ok().filter(|m| (1..=CUSTOM_MINUTES_MAX).contains(m));
                let Some(minutes) = minutes else {
                    self.send_notice(
                        chat_id,
                        &format!(
                            "Send a whole number of minutes between 1 and {CUSTOM_MINUTES_MAX}."
                        ),
                    )
                    .await;
                    return Ok(());
                };
                let open_until_ms =
                    current_unix_timestamp_ms().saturating_add(minutes * MINUTE_MS);
                AccessWindow::store(self.kv.as_ref(), open_until_ms)?;
                self.set_pending(Screen::Access, None)?;
                let content = self.render_screen(Screen::Access)?;
                self.upsert_panel(chat_id, &content).await
            }
        }
    }

    /// Re-renders the stored screen without touching the pending input.
    async fn keep_pending(&self, chat_id: i64, session: &AdminSession) -> Result<()> {
        let content = self.render_screen(session.screen)?;
        self.upsert_panel(chat_id, &content).await
    }

    fn render_screen(&self, screen: Screen) -> Result<PanelContent> {
        let now_ms = current_unix_timestamp_ms();
        match screen {
            Screen::Main => {
                let window = AccessWindow::load(self.kv.as_ref())?;
                let track_count = self.catalog.index()?.len();
                Ok(panel::render_main(&window, now_ms, track_count))
            }
            Screen::Access => {
                let window = AccessWindow::load(self.kv.as_ref())?;
                Ok(panel::render_access(&window, now_ms))
            }
            Screen::Tracks => Ok(panel::render_tracks(self.catalog.index()?.len())),
            Screen::Stats => {
                let day_key = utc_day_key(now_ms);
                let counters = self.metrics.day_snapshot(&day_key)?;
                Ok(panel::render_stats(&day_key, &counters))
            }
            Screen::Settings => Ok(panel::render_settings(
                &self.config.webapp_url,
                &self.config.media_public_base_display,
            )),
            Screen::Help => Ok(panel::render_help()),
        }
    }

    fn save_screen(&self, screen: Screen) -> Result<()> {
        self.set_pending(screen, None)
    }

    fn set_pending(&self, screen: Screen, pending: Option<PendingInput>) -> Result<()> {
        self.sessions
            .save_session(self.config.admin_user_id, &AdminSession { screen, pending })
    }

    /// Edits the live panel message in place, falling back to exactly one
    /// fresh send when there is no usable handle or the edit fails.
    async fn upsert_panel(&self, chat_id: i64, content: &PanelContent) -> Result<()> {
        let admin_id = self.config.admin_user_id;
        if let Some(handle) = self.sessions.load_panel(admin_id)? {
            if handle.chat_id == chat_id {
                match self
                    .telegram
                    .edit_message_text(
                        handle.chat_id,
                        handle.message_id,
                        &content.text,
                        Some(&content.keyboard),
                    )
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(error) => {
                        warn!(%error, message_id = handle.message_id, "panel edit failed, sending a fresh panel");
                    }
                }
            }
        }
        let sent = self
            .telegram
            .send_message(chat_id, &content.text, Some(&content.keyboard))
            .await
            .context("failed to send panel message")?;
        self.sessions.save_panel(
            admin_id,
            &PanelHandle {
                chat_id,
                message_id: sent.message_id,
            },
        )
    }

    /// Plain one-off notice next to the panel; failures are only logged so a
    /// flaky confirmation never wedges the state machine.
    async fn send_notice(&self, chat_id: i64, text: &str) {
        if let Err(error) = self.telegram.send_message(chat_id, text, None).await {
            warn!(%error, "failed to send notice");
        }
    }

    async fn send_call_to_action(&self, chat_id: i64) -> Result<()> {
        let content = panel::user_call_to_action(&self.config.webapp_url);
        self.telegram
            .send_message(chat_id, &content.text, Some(&content.keyboard))
            .await
            .context("failed to send call to action")?;
        Ok(())
    }
}
