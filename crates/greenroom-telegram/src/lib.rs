//! Telegram Bot API transport for the Greenroom console.
//!
//! Covers exactly the surface the console needs: the typed inbound update
//! envelope, inline keyboard markup, and an outbound client for send/edit/
//! answer/get-file/download-file. Failures are propagated with operation
//! context and never retried here; callers decide what is best-effort.

pub mod api_client;
pub mod keyboard;
pub mod update;

pub use api_client::{DownloadedFile, SentMessage, TelegramApiClient};
pub use keyboard::{InlineKeyboard, InlineKeyboardButton};
pub use update::{
    CallbackQuery, Chat, FileAttachment, InboundMessage, InboundUpdate, User,
};
