//! Stateful admin console engine for the Greenroom CMS.
//!
//! One editable chat message is the entire admin UI. The dispatcher routes
//! each inbound event through the access-gate snapshot, the typed callback
//! actions, and the pending-input state machine, then reconciles the panel
//! message in place. Ordinary users only ever see the public call-to-action.

pub mod actions;
pub mod chapters;
pub mod dispatch;
pub mod ingest;
pub mod panel;

pub use actions::{CallbackAction, GatePreset};
pub use chapters::parse_chapter_marks;
pub use dispatch::{ConsoleConfig, ConsoleDispatcher};
pub use ingest::ingest_track_upload;
