//! services/scribe/src/adapters/solve_http.rs
//!
//! The `/solve` inference endpoint over HTTP. Implements `InferenceService`.

use async_trait::async_trait;
use scribe_core::{InferenceReply, InferenceService, PortError, PortResult, SolveRequest};
use serde::Deserialize;
use tracing::{debug, error};

#[derive(Deserialize)]
struct SolveEnvelope {
    response: serde_json::Value,
}

#[derive(Clone)]
pub struct SolveHttpAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl SolveHttpAdapter {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl InferenceService for SolveHttpAdapter {
    async fn solve(&self, request: &SolveRequest) -> PortResult<InferenceReply> {
        debug!("POST {} (isChat={})", self.endpoint, request.is_chat);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Solve endpoint answered {}: {}", status, body);
            return Err(PortError::Unavailable(format!(
                "solve endpoint returned {}",
                status
            )));
        }

        let envelope: SolveEnvelope = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed solve reply: {}", e)))?;
        InferenceReply::from_output(envelope.response)
            .map_err(|e| PortError::Unexpected(format!("Malformed structured reply: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::EMPTY_REPLY_TEXT;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn note_request() -> SolveRequest {
        SolveRequest {
            id: "sid-0badf00d".into(),
            question_name: Some("1. Two Sum".into()),
            description: Some("Find indices.".into()),
            user_code: None,
            language: None,
            difficulty: Some("Easy".into()),
            message: "Generate Note".into(),
            is_chat: false,
        }
    }

    async fn adapter_for(server: &MockServer) -> SolveHttpAdapter {
        SolveHttpAdapter::new(reqwest::Client::new(), format!("{}/solve", server.uri()))
    }

    #[tokio::test]
    async fn chat_reply_is_returned_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"isChat": true, "return": "O(n) because of one pass."}
            })))
            .mount(&server)
            .await;

        let mut request = note_request();
        request.is_chat = true;
        let reply = adapter_for(&server).await.solve(&request).await.unwrap();
        assert_eq!(reply, InferenceReply::Chat("O(n) because of one pass.".into()));
    }

    #[tokio::test]
    async fn missing_return_text_uses_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"isChat": true}
            })))
            .mount(&server)
            .await;

        let reply = adapter_for(&server).await.solve(&note_request()).await.unwrap();
        assert_eq!(reply, InferenceReply::Chat(EMPTY_REPLY_TEXT.into()));
    }

    #[tokio::test]
    async fn absent_fields_are_not_sent_and_structured_reply_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solve"))
            .and(body_json(json!({
                "id": "sid-0badf00d",
                "question_name": "1. Two Sum",
                "description": "Find indices.",
                "difficulty": "Easy",
                "message": "Generate Note",
                "isChat": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "isChat": false,
                    "question_name": "Two Sum",
                    "topic": ["Array", "Hash Table"],
                    "difficulty": "Easy",
                    "solution_code": "seen = {}",
                    "note": "One pass with a map.",
                    "interview_tips": ["Mention the brute force first."]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter_for(&server).await.solve(&note_request()).await.unwrap();
        let InferenceReply::Structured(response) = reply else {
            panic!("expected a structured reply");
        };
        assert_eq!(response.question_name, "Two Sum");
        assert_eq!(response.topic, vec!["Array", "Hash Table"]);
        assert_eq!(response.user_code, "");
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = adapter_for(&server).await.solve(&note_request()).await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
    }

    #[tokio::test]
    async fn reply_without_response_object_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "ok"})))
            .mount(&server)
            .await;

        let err = adapter_for(&server).await.solve(&note_request()).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
