//! Typed inbound webhook envelope.
//!
//! Only the fields the dispatcher consumes are modeled; everything else in
//! the raw payload is ignored by serde. Unparseable envelopes are rejected at
//! the HTTP boundary before reaching the console core.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One inbound update: either a message (possibly edited) or a button press.
pub struct InboundUpdate {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub edited_message: Option<InboundMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl InboundUpdate {
    /// The message payload, treating an edited message like a fresh one.
    pub fn message(&self) -> Option<&InboundMessage> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
/// Audio or document payload attached to a message.
pub struct FileAttachment {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub audio: Option<FileAttachment>,
    #[serde(default)]
    pub document: Option<FileAttachment>,
}

impl InboundMessage {
    /// Free text of the message: body text first, caption as fallback.
    pub fn text_or_caption(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or("")
    }

    /// The audio payload if present: a native audio message, or a document
    /// whose declared mime type is audio.
    pub fn audio_file(&self) -> Option<&FileAttachment> {
        if let Some(audio) = &self.audio {
            return Some(audio);
        }
        self.document.as_ref().filter(|document| {
            document
                .mime_type
                .as_deref()
                .map(|mime| mime.trim().to_ascii_lowercase().starts_with("audio/"))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Inline keyboard button press.
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}
