//! services/scribe/src/web/protocol.rs
//!
//! Defines the WebSocket message protocols between the browser shims and the
//! service: the side panel on `/panel` and the content script on `/content`.

use crate::content::{EditorModel, PageSnapshot};
use crate::panel::SessionStatus;
use scribe_core::{ChatMessage, Notification, ScrapedProblem, User, WindowMessage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Side panel: messages sent FROM the client TO the server
//=========================================================================================

/// The commands a side panel can send.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Free text in the current chat/structured mode.
    SendMessage { text: String },

    /// Asks for a structured note on the cached problem.
    GenerateNote,

    ToggleMode,

    /// Stores the structured reply with this id as a question note.
    SaveResponse { message_id: Uuid },

    SaveTranscript,
}

//=========================================================================================
// Side panel: messages sent FROM the server TO the client
//=========================================================================================

/// The events the server pushes to a side panel.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, after the page info and user have been loaded.
    SessionInitialized {
        session_id: String,
        status: SessionStatus,
        is_chat: bool,
        user: Option<User>,
        transcript: Vec<ChatMessage>,
    },

    /// One message was added to the transcript.
    MessageAppended { message: ChatMessage },

    /// The inference request is in flight (`true`) or settled (`false`).
    Typing { active: bool },

    ModeChanged { is_chat: bool },

    /// A structured reply was stored and may not be saved again.
    ResponseSaved { message_id: Uuid, question_id: i64 },

    TranscriptSaved { stored_id: Uuid },

    Notification { notification: Notification },

    /// Reports a rejected command. The session stays usable.
    Error { message: String },
}

//=========================================================================================
// Content script: frames FROM the page shim
//=========================================================================================

/// What the page shim streams for one tab.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentFrame {
    /// A settled batch of DOM mutations and the page afterwards.
    Mutation { page: PageSnapshot },

    /// The editor's first model changed. `null` while no model is loaded.
    Editor { model: Option<EditorModel> },

    /// A message posted on the page window.
    Window { message: WindowMessage },

    Unload,
}

/// What the service reports back to the page shim.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentEvent {
    /// Observation ended. `problem` is set when one was scraped.
    Finished { problem: Option<ScrapedProblem> },
}
