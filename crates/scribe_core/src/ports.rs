//! crates/scribe_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the
//! inference endpoint, the remote datastore, the browser host and durable
//! extension storage all sit behind one of them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthToken, ChatMessage, InferenceReply, NewQuestion, Notification, QuestionRecord,
    QuestionUpdate, SolveRequest, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Sends one chat or note request and returns the decoded reply.
    async fn solve(&self, request: &SolveRequest) -> PortResult<InferenceReply>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    // --- Question notes ---
    async fn insert_question(&self, question: NewQuestion) -> PortResult<QuestionRecord>;

    async fn list_questions_for_user(&self, user_id: Uuid) -> PortResult<Vec<QuestionRecord>>;

    async fn update_question(
        &self,
        question_id: i64,
        user_id: Uuid,
        update: QuestionUpdate,
    ) -> PortResult<QuestionRecord>;

    // --- Chat transcripts ---

    /// Stores one session row plus one row per message. Returns the stored session id.
    async fn save_transcript(
        &self,
        user_id: Uuid,
        session_key: &str,
        messages: &[ChatMessage],
    ) -> PortResult<Uuid>;
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolves the user behind a session token.
    async fn resolve_user(&self, token: &AuthToken) -> PortResult<User>;
}

/// Durable extension-local storage for the auth credential.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> PortResult<Option<AuthToken>>;

    async fn save(&self, token: &AuthToken) -> PortResult<()>;

    async fn clear(&self) -> PortResult<()>;
}

/// The browser-native surfaces the background context can drive.
#[async_trait]
pub trait PanelHost: Send + Sync {
    async fn open_side_panel(&self, tab_id: i64) -> PortResult<()>;

    /// Navigates an existing tab.
    async fn update_tab(&self, tab_id: i64, url: &str) -> PortResult<()>;
}

pub trait Notifier: Send + Sync {
    /// Shows a transient notice. Delivery is best effort.
    fn notify(&self, notification: Notification);
}
