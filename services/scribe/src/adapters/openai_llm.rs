//! services/scribe/src/adapters/openai_llm.rs
//!
//! This module contains an inference adapter that talks to an OpenAI-compatible
//! chat model directly instead of the `/solve` endpoint.
//! It implements the `InferenceService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use scribe_core::{
    InferenceReply, InferenceService, PortError, PortResult, SolveRequest, StructuredResponse,
};
use tracing::debug;

const CHAT_INSTRUCTIONS: &str = "You are a coding interview tutor. The user is working on the \
problem described in the context. Answer their message conversationally and concisely. Do not \
reveal a full solution unless they explicitly ask for one.";

const NOTE_INSTRUCTIONS: &str = r#"You are a coding interview tutor writing a study note for the problem described in the context.
Respond with a single JSON object and nothing else, using exactly these keys:
  "question_name": string,
  "description": string,
  "userCode": string (the user's code, unchanged, or "" if none was given),
  "topic": array of strings (data structures and techniques involved),
  "difficulty": one of "Easy", "Medium", "Hard",
  "solution_code": string (an optimal solution in the user's language),
  "note": string (key insight plus time and space complexity),
  "interview_tips": array of strings"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InferenceService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiInferenceAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiInferenceAdapter {
    /// Creates a new `OpenAiInferenceAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Renders the problem fields that are present, followed by the user's message.
fn render_prompt(request: &SolveRequest) -> String {
    let fields = [
        ("QUESTION", &request.question_name),
        ("DESCRIPTION", &request.description),
        ("DIFFICULTY", &request.difficulty),
        ("LANGUAGE", &request.language),
        ("USER CODE", &request.user_code),
    ];
    let mut prompt = String::from("CONTEXT:\n---\n");
    for (label, value) in fields {
        if let Some(value) = value {
            prompt.push_str(&format!("{}: {}\n", label, value));
        }
    }
    prompt.push_str("---\n\nMESSAGE: ");
    prompt.push_str(&request.message);
    prompt
}

/// Parses a structured note, tolerating a surrounding markdown code fence.
fn parse_structured(content: &str) -> PortResult<StructuredResponse> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| {
        PortError::Unexpected(format!("Note LLM returned malformed JSON: {}", e))
    })
}

//=========================================================================================
// `InferenceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InferenceService for OpenAiInferenceAdapter {
    async fn solve(&self, request: &SolveRequest) -> PortResult<InferenceReply> {
        let instructions = if request.is_chat {
            CHAT_INSTRUCTIONS
        } else {
            NOTE_INSTRUCTIONS
        };
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(instructions)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(render_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let completion = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(completion)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("LLM response contained no text content.".to_string())
            })?;
        debug!("LLM replied for request {} ({} chars).", request.id, content.len());

        if request.is_chat {
            Ok(InferenceReply::Chat(content))
        } else {
            parse_structured(&content).map(InferenceReply::Structured)
        }
    }
}
