//! services/scribe/src/panel/session.rs
//!
//! The side-panel chat session. Owns one linear transcript and turns user
//! actions (send, generate note, save) into calls on the relay, the
//! inference service and the datastore.

use crate::panel::PanelServices;
use scribe_core::{
    ChatMessage, InferenceReply, NewQuestion, Notification, Notifier, PanelAction, PortError,
    QuestionRecord, ScrapedProblem, SolveRequest, User,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The message sent for a note request.
pub const GENERATE_NOTE_TEXT: &str = "Generate Note";
/// Bot text appended when the inference call fails.
pub const INFERENCE_ERROR_TEXT: &str = "Error fetching response";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("No message with id {0} in this session")]
    UnknownMessage(Uuid),
    #[error("Message {0} is not a structured response")]
    NotStructured(Uuid),
    #[error("Message {0} was already saved")]
    AlreadySaved(Uuid),
    #[error("Please login first")]
    SignedOut,
    #[error("Nothing to save yet")]
    EmptyTranscript,
    #[error("Session is not ready ({0:?})")]
    NotReady(SessionStatus),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Ready,
    SignedOut,
}

/// A user message that has been appended and still waits for its reply.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub user_message: ChatMessage,
    request: SolveRequest,
}

pub struct ChatSession {
    session_id: String,
    services: PanelServices,
    notifier: Arc<dyn Notifier>,
    transcript: Vec<ChatMessage>,
    problem: Option<ScrapedProblem>,
    is_chat: bool,
    status: SessionStatus,
    user: Option<User>,
    saved: HashSet<Uuid>,
}

impl ChatSession {
    pub fn new(services: PanelServices, notifier: Arc<dyn Notifier>) -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        Self {
            session_id: format!("sid-{}", suffix),
            services,
            notifier,
            transcript: Vec::new(),
            problem: None,
            is_chat: true,
            status: SessionStatus::Loading,
            user: None,
            saved: HashSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_chat(&self) -> bool {
        self.is_chat
    }

    pub fn problem(&self) -> Option<&ScrapedProblem> {
        self.problem.as_ref()
    }

    //=====================================================================================
    // Startup
    //=====================================================================================

    /// Loads the page info and the signed-in user concurrently.
    pub async fn initialize(&mut self) -> SessionStatus {
        let services = self.services.clone();
        let (payload, user) = tokio::join!(services.relay.fetch(), services.restore_user());

        let payload = payload.unwrap_or_else(|e| {
            error!("Could not load page info from the relay: {}", e);
            None
        });

        // A note-open only seeds the card; the mode stays chat until toggled.
        if let Some(payload) = payload.filter(|p| p.action == Some(PanelAction::GenNote)) {
            match payload.problem {
                Some(problem) => {
                    info!("Session {} opened for '{}'.", self.session_id, problem.question);
                    self.transcript.push(ChatMessage::system(problem.card()));
                    self.problem = Some(problem);
                }
                None => warn!("Note requested but no problem has been scraped yet."),
            }
        }

        self.user = user;
        self.status = if self.user.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::SignedOut
        };
        self.status
    }

    //=====================================================================================
    // Chat
    //=====================================================================================

    /// Appends the user's message and prepares the request for it.
    pub fn begin_message(&mut self, text: &str) -> Result<PendingExchange, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.begin(text, self.is_chat)
    }

    pub fn begin_note(&mut self) -> Result<PendingExchange, SessionError> {
        self.begin(GENERATE_NOTE_TEXT, false)
    }

    fn begin(&mut self, text: &str, is_chat: bool) -> Result<PendingExchange, SessionError> {
        if self.status != SessionStatus::Ready {
            return Err(SessionError::NotReady(self.status));
        }
        let user_message = ChatMessage::user(text, is_chat);
        self.transcript.push(user_message.clone());
        let request = self.build_request(text, is_chat);
        Ok(PendingExchange {
            user_message,
            request,
        })
    }

    /// Calls the inference service and appends exactly one bot message.
    pub async fn finish(&mut self, pending: PendingExchange) -> ChatMessage {
        let reply = match self.services.inference.solve(&pending.request).await {
            Ok(InferenceReply::Chat(text)) => ChatMessage::bot_text(text),
            Ok(InferenceReply::Structured(response)) => ChatMessage::bot_structured(response),
            Err(e) => {
                error!("Error fetching response: {}", e);
                ChatMessage::bot_text(INFERENCE_ERROR_TEXT)
            }
        };
        self.transcript.push(reply.clone());
        reply
    }

    /// Sends a free-text message in the current mode. Returns the bot reply.
    pub async fn send_message(&mut self, text: &str) -> Result<ChatMessage, SessionError> {
        let pending = self.begin_message(text)?;
        Ok(self.finish(pending).await)
    }

    /// Asks for a structured note on the cached problem.
    pub async fn generate_note(&mut self) -> Result<ChatMessage, SessionError> {
        let pending = self.begin_note()?;
        Ok(self.finish(pending).await)
    }

    fn build_request(&self, text: &str, is_chat: bool) -> SolveRequest {
        let problem = self.problem.as_ref();
        SolveRequest {
            id: self.session_id.clone(),
            question_name: problem.map(|p| p.question.clone()),
            description: problem.map(|p| p.description.clone()),
            user_code: problem.and_then(|p| p.code.clone()),
            language: problem.and_then(|p| p.language.clone()),
            difficulty: problem.and_then(|p| p.difficulty.clone()),
            message: text.to_string(),
            is_chat,
        }
    }

    /// Flips chat/structured mode for later requests. Returns the new `is_chat`.
    pub fn toggle_mode(&mut self) -> bool {
        self.is_chat = !self.is_chat;
        self.is_chat
    }

    //=====================================================================================
    // Persistence
    //=====================================================================================

    pub fn can_save(&self, message_id: Uuid) -> bool {
        !self.saved.contains(&message_id)
            && self
                .transcript
                .iter()
                .any(|m| m.id == message_id && m.structured().is_some())
    }

    /// Stores the structured reply `message_id` as a question note. Only one
    /// successful save per message.
    pub async fn save_structured_response(
        &mut self,
        message_id: Uuid,
    ) -> Result<QuestionRecord, SessionError> {
        let user_id = self.user.as_ref().ok_or(SessionError::SignedOut)?.user_id;
        let message = self
            .transcript
            .iter()
            .find(|m| m.id == message_id)
            .ok_or(SessionError::UnknownMessage(message_id))?;
        let response = message
            .structured()
            .ok_or(SessionError::NotStructured(message_id))?;
        if self.saved.contains(&message_id) {
            return Err(SessionError::AlreadySaved(message_id));
        }

        let question = NewQuestion::from_structured(response, user_id);
        match self.services.store.insert_question(question).await {
            Ok(record) => {
                self.saved.insert(message_id);
                self.notifier.notify(Notification::success("Successfully saved"));
                Ok(record)
            }
            Err(e) => {
                error!("Failed to save question: {}", e);
                self.notifier.notify(Notification::error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Stores the whole transcript. The transcript itself is left as is.
    pub async fn save_transcript(&self) -> Result<Uuid, SessionError> {
        let user_id = self.user.as_ref().ok_or(SessionError::SignedOut)?.user_id;
        if self.transcript.is_empty() {
            return Err(SessionError::EmptyTranscript);
        }
        match self
            .services
            .store
            .save_transcript(user_id, &self.session_id, &self.transcript)
            .await
        {
            Ok(id) => {
                info!("Saved {} messages of session {}.", self.transcript.len(), self.session_id);
                self.notifier.notify(Notification::success("Chat session saved"));
                Ok(id)
            }
            Err(e) => {
                error!("Failed to save chat session: {}", e);
                self.notifier.notify(Notification::error(e.to_string()));
                Err(e.into())
            }
        }
    }
}
