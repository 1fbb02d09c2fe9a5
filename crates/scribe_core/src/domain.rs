//! crates/scribe_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These types travel between the isolated extension contexts, so most of
//! them carry serde derives, but none of them know about transports or
//! storage engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Scraping
//=========================================================================================

/// A coding problem as scraped from one page.
///
/// Produced once per successful extraction and always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedProblem {
    pub question: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl ScrapedProblem {
    /// The card shown in the transcript. Code and language only travel
    /// together: a card with one but not the other shows neither.
    pub fn card(&self) -> ScrapedProblem {
        if self.code.is_some() && self.language.is_some() {
            self.clone()
        } else {
            ScrapedProblem {
                code: None,
                language: None,
                ..self.clone()
            }
        }
    }
}

/// Problem difficulty as stored with a saved question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Case-insensitive parse of the labels sites and the inference service use.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" | "basic" | "school" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Relay payloads
//=========================================================================================

/// The action a popup asks the side panel to perform when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelAction {
    GenNote,
}

/// A request from the toolbar popup to open the side panel on a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupRequest {
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    pub action: PanelAction,
}

/// Content of the relay's single slot: the last scraped problem, plus the
/// action stashed by the last side-panel open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayPayload {
    #[serde(flatten)]
    pub problem: Option<ScrapedProblem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<PanelAction>,
}

impl RelayPayload {
    pub fn scraped(problem: ScrapedProblem) -> Self {
        Self {
            problem: Some(problem),
            action: None,
        }
    }
}

//=========================================================================================
// Chat transcript
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    System,
}

/// A structured "question note" reply from the inference service.
///
/// Every field is optional on the wire; missing ones come back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredResponse {
    pub question_name: String,
    pub description: String,
    #[serde(rename = "userCode")]
    pub user_code: String,
    pub topic: Vec<String>,
    pub difficulty: Option<String>,
    pub solution_code: String,
    pub note: String,
    pub interview_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    ProblemCard { problem: ScrapedProblem },
    Structured { response: StructuredResponse },
}

/// One entry of a side-panel transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
    pub is_chat: bool,
}

impl ChatMessage {
    fn new(sender: Sender, body: MessageBody, is_chat: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            body,
            timestamp: Utc::now(),
            is_chat,
        }
    }

    pub fn user(text: impl Into<String>, is_chat: bool) -> Self {
        Self::new(Sender::User, MessageBody::Text { text: text.into() }, is_chat)
    }

    pub fn bot_text(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, MessageBody::Text { text: text.into() }, true)
    }

    pub fn bot_structured(response: StructuredResponse) -> Self {
        Self::new(Sender::Bot, MessageBody::Structured { response }, false)
    }

    pub fn system(problem: ScrapedProblem) -> Self {
        Self::new(Sender::System, MessageBody::ProblemCard { problem }, false)
    }

    /// The free text of a user or plain bot message.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn structured(&self) -> Option<&StructuredResponse> {
        match &self.body {
            MessageBody::Structured { response } => Some(response),
            _ => None,
        }
    }

    pub fn problem_card(&self) -> Option<&ScrapedProblem> {
        match &self.body {
            MessageBody::ProblemCard { problem } => Some(problem),
            _ => None,
        }
    }
}

//=========================================================================================
// Inference
//=========================================================================================

/// The body POSTed to the inference service.
///
/// Absent problem fields are omitted from the JSON entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolveRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub message: String,
    #[serde(rename = "isChat")]
    pub is_chat: bool,
}

/// Text used when a chat reply carries no `return` field.
pub const EMPTY_REPLY_TEXT: &str = "No response generated";

/// What the inference service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceReply {
    Chat(String),
    Structured(StructuredResponse),
}

impl InferenceReply {
    /// Interprets the `response` object of a solve reply. The server's own
    /// `isChat` flag decides the shape, not the flag that was sent.
    pub fn from_output(output: serde_json::Value) -> Result<Self, serde_json::Error> {
        let is_chat = output
            .get("isChat")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if is_chat {
            let text = output
                .get("return")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(EMPTY_REPLY_TEXT)
                .to_string();
            Ok(InferenceReply::Chat(text))
        } else {
            serde_json::from_value(output).map(InferenceReply::Structured)
        }
    }
}

//=========================================================================================
// Persisted questions
//=========================================================================================

/// A question note as stored in the remote datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub question_name: String,
    pub description: String,
    pub usercode: String,
    pub solution: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub tips: Vec<String>,
    pub note: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A question that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_name: String,
    pub description: String,
    pub usercode: String,
    pub solution: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub tips: Vec<String>,
    pub note: String,
    pub user_id: Uuid,
}

impl NewQuestion {
    /// Builds a question from a structured reply. An absent or unrecognised
    /// difficulty falls back to `Easy`.
    pub fn from_structured(response: &StructuredResponse, user_id: Uuid) -> Self {
        let difficulty = response
            .difficulty
            .as_deref()
            .and_then(Difficulty::parse_lenient)
            .unwrap_or_default();
        Self {
            question_name: response.question_name.clone(),
            description: response.description.clone(),
            usercode: response.user_code.clone(),
            solution: response.solution_code.clone(),
            difficulty,
            topics: response.topic.clone(),
            tips: response.interview_tips.clone(),
            note: response.note.clone(),
            user_id,
        }
    }
}

/// A single-field edit of a stored question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum QuestionUpdate {
    QuestionName(String),
    Description(String),
    Usercode(String),
    Solution(String),
    Difficulty(Difficulty),
    Topics(Vec<String>),
    Tips(Vec<String>),
    Note(String),
}

impl QuestionUpdate {
    /// The column this edit targets.
    pub fn column(&self) -> &'static str {
        match self {
            QuestionUpdate::QuestionName(_) => "question_name",
            QuestionUpdate::Description(_) => "description",
            QuestionUpdate::Usercode(_) => "usercode",
            QuestionUpdate::Solution(_) => "solution",
            QuestionUpdate::Difficulty(_) => "difficulty",
            QuestionUpdate::Topics(_) => "topics",
            QuestionUpdate::Tips(_) => "tips",
            QuestionUpdate::Note(_) => "note",
        }
    }

    pub fn apply(&self, record: &mut QuestionRecord) {
        match self.clone() {
            QuestionUpdate::QuestionName(v) => record.question_name = v,
            QuestionUpdate::Description(v) => record.description = v,
            QuestionUpdate::Usercode(v) => record.usercode = v,
            QuestionUpdate::Solution(v) => record.solution = v,
            QuestionUpdate::Difficulty(v) => record.difficulty = v,
            QuestionUpdate::Topics(v) => record.topics = v,
            QuestionUpdate::Tips(v) => record.tips = v,
            QuestionUpdate::Note(v) => record.note = v,
        }
    }
}

//=========================================================================================
// Identity
//=========================================================================================

// Represents a signed-in user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// An opaque session credential. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, user-facing notice (a toast in the browser UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_drops_code_without_language() {
        let problem = ScrapedProblem {
            question: "Two Sum".into(),
            description: "Find two numbers".into(),
            code: Some("fn main() {}".into()),
            language: None,
            difficulty: Some("Easy".into()),
        };
        let card = problem.card();
        assert_eq!(card.code, None);
        assert_eq!(card.language, None);
        assert_eq!(card.difficulty.as_deref(), Some("Easy"));
    }

    #[test]
    fn chat_output_uses_return_text() {
        let reply =
            InferenceReply::from_output(json!({"isChat": true, "return": "O(n) because..."}))
                .unwrap();
        assert_eq!(reply, InferenceReply::Chat("O(n) because...".into()));
    }

    #[test]
    fn chat_output_without_return_falls_back() {
        let reply = InferenceReply::from_output(json!({"isChat": true})).unwrap();
        assert_eq!(reply, InferenceReply::Chat(EMPTY_REPLY_TEXT.into()));
    }

    #[test]
    fn structured_output_parses_question_fields() {
        let reply = InferenceReply::from_output(json!({
            "isChat": false,
            "question_name": "Matrix Chain Multiplication",
            "userCode": "int f();",
            "topic": ["Dynamic Programming"],
            "difficulty": "Hard",
            "solution_code": "int f() { return 0; }",
            "note": "associative, not commutative",
            "interview_tips": ["explain the dp table"]
        }))
        .unwrap();
        let InferenceReply::Structured(response) = reply else {
            panic!("expected a structured reply");
        };
        assert_eq!(response.question_name, "Matrix Chain Multiplication");
        assert_eq!(response.user_code, "int f();");
        assert_eq!(response.description, "");
        assert_eq!(response.topic, vec!["Dynamic Programming".to_string()]);
    }

    #[test]
    fn new_question_defaults_missing_difficulty_to_easy() {
        let response = StructuredResponse {
            question_name: "Valid Parentheses".into(),
            difficulty: None,
            ..Default::default()
        };
        let question = NewQuestion::from_structured(&response, Uuid::nil());
        assert_eq!(question.difficulty, Difficulty::Easy);

        let response = StructuredResponse {
            difficulty: Some("hard".into()),
            ..Default::default()
        };
        let question = NewQuestion::from_structured(&response, Uuid::nil());
        assert_eq!(question.difficulty, Difficulty::Hard);
    }

    #[test]
    fn solve_request_omits_absent_code() {
        let request = SolveRequest {
            id: "sid-1".into(),
            question_name: Some("Two Sum".into()),
            description: None,
            user_code: None,
            language: None,
            difficulty: Some("Easy".into()),
            message: "Generate Note".into(),
            is_chat: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("user_code").is_none());
        assert_eq!(value["isChat"], json!(false));
        assert_eq!(value["question_name"], json!("Two Sum"));
    }

    #[test]
    fn relay_payload_flattens_problem_with_action() {
        let payload = RelayPayload {
            problem: Some(ScrapedProblem {
                question: "Two Sum".into(),
                description: "...".into(),
                ..Default::default()
            }),
            action: Some(PanelAction::GenNote),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["question"], json!("Two Sum"));
        assert_eq!(value["action"], json!("gen_note"));
    }

    #[test]
    fn question_update_uses_field_value_shape() {
        let update: QuestionUpdate =
            serde_json::from_value(json!({"field": "note", "value": "remember the stack"}))
                .unwrap();
        assert_eq!(update, QuestionUpdate::Note("remember the stack".into()));
        assert_eq!(update.column(), "note");
    }

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("secret-value");
        assert_eq!(format!("{:?}", token), "AuthToken(***)");
    }
}
