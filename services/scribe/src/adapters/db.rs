//! services/scribe/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `QuestionStore` and `IdentityService` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scribe_core::{
    AuthToken, ChatMessage, Difficulty, IdentityService, NewQuestion, PortError, PortResult,
    QuestionRecord, QuestionStore, QuestionUpdate, User,
};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

const QUESTION_COLUMNS: &str = "id, question_name, description, usercode, solution, difficulty, \
     topics, tips, note, user_id, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `QuestionStore` and `IdentityService` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
    full_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            full_name: self.full_name,
        }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    question_name: String,
    description: String,
    usercode: String,
    solution: String,
    difficulty: String,
    topics: Vec<String>,
    tips: Vec<String>,
    note: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl QuestionRow {
    fn to_domain(self) -> QuestionRecord {
        let difficulty = Difficulty::parse_lenient(&self.difficulty).unwrap_or_else(|| {
            warn!(
                "Question {} has unknown difficulty '{}'.",
                self.id, self.difficulty
            );
            Difficulty::default()
        });
        QuestionRecord {
            id: self.id,
            question_name: self.question_name,
            description: self.description,
            usercode: self.usercode,
            solution: self.solution,
            difficulty,
            topics: self.topics,
            tips: self.tips,
            note: self.note,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `QuestionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestionStore for DbAdapter {
    async fn insert_question(&self, question: NewQuestion) -> PortResult<QuestionRecord> {
        let sql = format!(
            "INSERT INTO questions \
             (question_name, description, usercode, solution, difficulty, topics, tips, note, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            QUESTION_COLUMNS
        );
        let record = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(question.question_name)
            .bind(question.description)
            .bind(question.usercode)
            .bind(question.solution)
            .bind(question.difficulty.as_str())
            .bind(question.topics)
            .bind(question.tips)
            .bind(question.note)
            .bind(question.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_questions_for_user(&self, user_id: Uuid) -> PortResult<Vec<QuestionRecord>> {
        let sql = format!(
            "SELECT {} FROM questions WHERE user_id = $1 ORDER BY created_at ASC",
            QUESTION_COLUMNS
        );
        let records = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let questions = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(questions)
    }

    async fn update_question(
        &self,
        question_id: i64,
        user_id: Uuid,
        update: QuestionUpdate,
    ) -> PortResult<QuestionRecord> {
        // The column name comes from a closed set, never from the caller.
        let sql = format!(
            "UPDATE questions SET {} = $1, updated_at = now() \
             WHERE id = $2 AND user_id = $3 RETURNING {}",
            update.column(),
            QUESTION_COLUMNS
        );
        let query = sqlx::query_as::<_, QuestionRow>(&sql);
        let query = match update {
            QuestionUpdate::QuestionName(v)
            | QuestionUpdate::Description(v)
            | QuestionUpdate::Usercode(v)
            | QuestionUpdate::Solution(v)
            | QuestionUpdate::Note(v) => query.bind(v),
            QuestionUpdate::Difficulty(d) => query.bind(d.as_str()),
            QuestionUpdate::Topics(v) | QuestionUpdate::Tips(v) => query.bind(v),
        };
        let record = query
            .bind(question_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))?;
        Ok(record.to_domain())
    }

    async fn save_transcript(
        &self,
        user_id: Uuid,
        session_key: &str,
        messages: &[ChatMessage],
    ) -> PortResult<Uuid> {
        let transcript =
            serde_json::to_value(messages).map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let session_id: Uuid = sqlx::query_scalar(
            "INSERT INTO chat_sessions (id, user_id, session_key, transcript) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(session_key)
        .bind(transcript)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for message in messages {
            let body = serde_json::to_value(&message.body)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            let sender = match message.sender {
                scribe_core::Sender::User => "user",
                scribe_core::Sender::Bot => "bot",
                scribe_core::Sender::System => "system",
            };
            sqlx::query(
                "INSERT INTO chat_messages (session_id, message_id, sender, body, is_chat, sent_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(session_id)
            .bind(message.id)
            .bind(sender)
            .bind(body)
            .bind(message.is_chat)
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(session_id)
    }
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for DbAdapter {
    async fn resolve_user(&self, token: &AuthToken) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.full_name \
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(UserRecord::to_domain).ok_or(PortError::Unauthorized)
    }
}
