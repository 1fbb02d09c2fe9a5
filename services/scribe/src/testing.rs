//! In-memory implementations of every port, for unit tests.

use crate::adapters::BroadcastPanelHost;
use crate::config::Config;
use crate::content::SourceRouter;
use crate::relay::{Relay, RelaySettings};
use crate::web::state::AppState;
use async_trait::async_trait;
use chrono::Utc;
use scribe_core::{
    AuthToken, ChatMessage, IdentityService, InferenceReply, InferenceService, NewQuestion,
    Notification, Notifier, PanelHost, PortError, PortResult, QuestionRecord, QuestionStore,
    QuestionUpdate, SolveRequest, TokenStore, User,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

//=========================================================================================
// Token store
//=========================================================================================

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AuthToken>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(AuthToken::new(token))),
        }
    }

    pub fn current(&self) -> Option<AuthToken> {
        self.token.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> PortResult<Option<AuthToken>> {
        Ok(self.current())
    }

    async fn save(&self, token: &AuthToken) -> PortResult<()> {
        *self.token.lock().unwrap() = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

//=========================================================================================
// Panel host
//=========================================================================================

#[derive(Default)]
pub struct FakePanelHost {
    opened: Mutex<Vec<i64>>,
    navigations: Mutex<Vec<(i64, String)>>,
    fail: AtomicBool,
}

impl FakePanelHost {
    pub fn failing() -> Self {
        let host = Self::default();
        host.fail.store(true, Ordering::SeqCst);
        host
    }

    pub fn opened(&self) -> Vec<i64> {
        self.opened.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<(i64, String)> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanelHost for FakePanelHost {
    async fn open_side_panel(&self, tab_id: i64) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("side panel refused".into()));
        }
        self.opened.lock().unwrap().push(tab_id);
        Ok(())
    }

    async fn update_tab(&self, tab_id: i64, url: &str) -> PortResult<()> {
        self.navigations.lock().unwrap().push((tab_id, url.to_string()));
        Ok(())
    }
}

//=========================================================================================
// Question store
//=========================================================================================

#[derive(Default)]
pub struct MemoryQuestionStore {
    questions: Mutex<Vec<QuestionRecord>>,
    transcripts: Mutex<Vec<(Uuid, String, Vec<ChatMessage>)>>,
    next_id: AtomicI64,
    fail: AtomicBool,
}

impl MemoryQuestionStore {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn questions(&self) -> Vec<QuestionRecord> {
        self.questions.lock().unwrap().clone()
    }

    pub fn transcripts(&self) -> Vec<(Uuid, String, Vec<ChatMessage>)> {
        self.transcripts.lock().unwrap().clone()
    }

    fn check(&self) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("datastore offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn insert_question(&self, question: NewQuestion) -> PortResult<QuestionRecord> {
        self.check()?;
        let now = Utc::now();
        let record = QuestionRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            question_name: question.question_name,
            description: question.description,
            usercode: question.usercode,
            solution: question.solution,
            difficulty: question.difficulty,
            topics: question.topics,
            tips: question.tips,
            note: question.note,
            user_id: question.user_id,
            created_at: now,
            updated_at: now,
        };
        self.questions.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_questions_for_user(&self, user_id: Uuid) -> PortResult<Vec<QuestionRecord>> {
        self.check()?;
        Ok(self
            .questions()
            .into_iter()
            .filter(|q| q.user_id == user_id)
            .collect())
    }

    async fn update_question(
        &self,
        question_id: i64,
        user_id: Uuid,
        update: QuestionUpdate,
    ) -> PortResult<QuestionRecord> {
        self.check()?;
        let mut questions = self.questions.lock().unwrap();
        let record = questions
            .iter_mut()
            .find(|q| q.id == question_id && q.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))?;
        update.apply(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn save_transcript(
        &self,
        user_id: Uuid,
        session_key: &str,
        messages: &[ChatMessage],
    ) -> PortResult<Uuid> {
        self.check()?;
        self.transcripts
            .lock()
            .unwrap()
            .push((user_id, session_key.to_string(), messages.to_vec()));
        Ok(Uuid::new_v4())
    }
}

//=========================================================================================
// Identity
//=========================================================================================

#[derive(Default)]
pub struct FakeIdentity {
    users: HashMap<String, User>,
}

impl FakeIdentity {
    pub fn with_user(mut self, token: &str, user: User) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn resolve_user(&self, token: &AuthToken) -> PortResult<User> {
        self.users
            .get(token.as_str())
            .cloned()
            .ok_or(PortError::Unauthorized)
    }
}

pub fn test_user() -> User {
    User {
        user_id: Uuid::from_u128(0x5c12be),
        email: Some("coder@example.com".into()),
        full_name: Some("Test Coder".into()),
    }
}

//=========================================================================================
// Inference
//=========================================================================================

/// Answers from a queue. An empty queue answers `Unavailable`.
#[derive(Default)]
pub struct ScriptedInference {
    replies: Mutex<VecDeque<PortResult<InferenceReply>>>,
    requests: Mutex<Vec<SolveRequest>>,
}

impl ScriptedInference {
    pub fn push(&self, reply: PortResult<InferenceReply>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<SolveRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    async fn solve(&self, request: &SolveRequest) -> PortResult<InferenceReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unavailable("no scripted reply".into())))
    }
}

//=========================================================================================
// Notifier
//=========================================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

//=========================================================================================
// Application state
//=========================================================================================

/// Shared state wired to in-memory fakes, for handler tests.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryQuestionStore>,
    pub tokens: Arc<MemoryTokenStore>,
    pub inference: Arc<ScriptedInference>,
    pub host: BroadcastPanelHost,
}

pub fn test_app() -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/scribe_test".to_string()),
        "POPUP_RETRIES" => Some("0".to_string()),
        _ => None,
    })
    .expect("test configuration is valid");
    let store = Arc::new(MemoryQuestionStore::default());
    let tokens = Arc::new(MemoryTokenStore::default());
    let inference = Arc::new(ScriptedInference::default());
    let host = BroadcastPanelHost::default();
    let (relay, _) = Relay::new(
        Arc::new(host.clone()),
        tokens.clone(),
        RelaySettings::default(),
    )
    .spawn();
    let state = Arc::new(AppState {
        config: Arc::new(config),
        relay,
        inference: inference.clone(),
        store: store.clone(),
        identity: Arc::new(FakeIdentity::default().with_user("jwt", test_user())),
        tokens: tokens.clone(),
        host: host.clone(),
        router: Arc::new(SourceRouter::standard()),
    });
    TestApp {
        state,
        store,
        tokens,
        inference,
        host,
    }
}
