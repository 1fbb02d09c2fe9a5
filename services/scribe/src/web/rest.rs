//! services/scribe/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::panel::{PopupController, ProfileStats, QuestionFilter, Rank};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use scribe_core::{
    Difficulty, NewQuestion, PortError, QuestionUpdate, RelayReply, RuntimeMessage, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        runtime_handler,
        list_questions_handler,
        question_stats_handler,
        create_question_handler,
        update_question_handler,
        popup_data_handler,
        open_note_panel_handler,
        crate::web::auth::session_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            QuestionDraft,
            RuntimeAck,
            StatsResponse,
            PopupData,
            OpenNoteRequest,
            OpenNoteResponse,
            crate::web::auth::SessionUser
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Algo-Scribe API", description = "Background relay, popup and question dashboard endpoints.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme the dashboard routes use.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Acknowledges a runtime message that expects no data back.
#[derive(Serialize, ToSchema)]
pub struct RuntimeAck {
    ok: bool,
}

/// A question written by hand on the dashboard.
#[derive(Deserialize, ToSchema)]
pub struct QuestionDraft {
    pub question_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usercode: String,
    #[serde(default)]
    pub solution: String,
    /// `Easy`, `Medium` or `Hard`. Anything else is stored as `Easy`.
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl QuestionDraft {
    fn into_new_question(self, user: &User) -> NewQuestion {
        NewQuestion {
            question_name: self.question_name,
            description: self.description,
            usercode: self.usercode,
            solution: self.solution,
            difficulty: self
                .difficulty
                .as_deref()
                .and_then(Difficulty::parse_lenient)
                .unwrap_or_default(),
            topics: self.topics,
            tips: self.tips,
            note: self.note,
            user_id: user.user_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    total: usize,
    easy: usize,
    medium: usize,
    hard: usize,
    /// `Beginner`, `Intermediate` or `Expert`.
    #[schema(value_type = String)]
    rank: Rank,
    /// `All` followed by every topic in use.
    topics: Vec<String>,
}

impl StatsResponse {
    fn new(stats: ProfileStats, topics: Vec<String>) -> Self {
        Self {
            total: stats.total,
            easy: stats.easy,
            medium: stats.medium,
            hard: stats.hard,
            rank: stats.rank,
            topics,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PopupData {
    question: String,
    description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OpenNoteRequest {
    tab_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct OpenNoteResponse {
    /// `false` when no tab was given.
    opened: bool,
}

/// Maps a port failure onto an HTTP status.
pub(crate) fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (status, e.to_string())
}

//=========================================================================================
// Runtime Relay
//=========================================================================================

/// Deliver one runtime message to the background relay.
///
/// The body is a runtime message tagged by `type` (`SCRAPED_DATA`,
/// `GET_POPUP_DATA`, `SET_PAGE_INFO`, `OPEN_SIDE_PANEL`, `SUPABASE_LOGIN`,
/// `TAB_UPDATED`). Page-info requests answer `{ data }`; every other message
/// answers `{ ok: true }` once the relay has handled it.
#[utoipa::path(
    post,
    path = "/runtime",
    responses(
        (status = 200, description = "Message handled", body = RuntimeAck),
        (status = 422, description = "Unknown message type"),
        (status = 503, description = "Relay is not running")
    )
)]
pub async fn runtime_handler(
    State(app_state): State<Arc<AppState>>,
    Json(message): Json<RuntimeMessage>,
) -> Result<axum::response::Response, (StatusCode, String)> {
    let expects_reply = message.expects_reply();
    let reply: RelayReply = app_state.relay.request(message).await.map_err(|e| {
        error!("Relay request failed: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    if expects_reply {
        Ok(Json(reply).into_response())
    } else {
        Ok(Json(RuntimeAck { ok: true }).into_response())
    }
}

//=========================================================================================
// Question Dashboard
//=========================================================================================

/// List the signed-in user's questions, filtered and sorted.
#[utoipa::path(
    get,
    path = "/questions",
    params(
        ("topic" = Option<String>, Query, description = "Only questions with this topic. `All` disables the filter."),
        ("difficulty" = Option<String>, Query, description = "Easy, Medium or Hard. `All` disables the filter."),
        ("sort" = Option<String>, Query, description = "name (default), difficulty or topic.")
    ),
    responses(
        (status = 200, description = "Matching questions"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer" = []))
)]
pub async fn list_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let questions = app_state
        .dashboard()
        .list(user.user_id, &filter)
        .await
        .map_err(port_error_response)?;
    Ok(Json(questions))
}

/// Profile statistics and the topic list for the filters.
#[utoipa::path(
    get,
    path = "/questions/stats",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer" = []))
)]
pub async fn question_stats_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (stats, topics) = app_state
        .dashboard()
        .stats(user.user_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(StatsResponse::new(stats, topics)))
}

/// Store a new question for the signed-in user.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = QuestionDraft,
    responses(
        (status = 201, description = "Question created"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn create_question_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(draft): Json<QuestionDraft>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let record = app_state
        .dashboard()
        .create(user.user_id, draft.into_new_question(&user))
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Change one field of a stored question.
///
/// The body is `{ field, value }` with `field` one of question_name,
/// description, usercode, solution, difficulty, topics, tips or note.
#[utoipa::path(
    patch,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "The question id.")),
    responses(
        (status = 200, description = "Question updated"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such question for this user")
    ),
    security(("bearer" = []))
)]
pub async fn update_question_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Json(update): Json<QuestionUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let record = app_state
        .dashboard()
        .update(user.user_id, id, update)
        .await
        .map_err(port_error_response)?;
    Ok(Json(record))
}

//=========================================================================================
// Popup
//=========================================================================================

/// The problem scraped from the current page, as the popup shows it.
///
/// Retries while nothing is cached and answers empty strings on give-up.
#[utoipa::path(
    get,
    path = "/popup",
    responses((status = 200, description = "Popup data", body = PopupData))
)]
pub async fn popup_data_handler(State(app_state): State<Arc<AppState>>) -> Json<PopupData> {
    let mut popup =
        PopupController::new(app_state.panel_services(), app_state.popup_settings(), None);
    let info = popup.request_data().await;
    Json(PopupData {
        question: info.question,
        description: info.description,
    })
}

/// Open the side panel on a tab in note mode.
#[utoipa::path(
    post,
    path = "/popup/open-note",
    request_body = OpenNoteRequest,
    responses(
        (status = 200, description = "Request handled", body = OpenNoteResponse),
        (status = 503, description = "Relay is not running")
    )
)]
pub async fn open_note_panel_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<OpenNoteRequest>,
) -> Result<Json<OpenNoteResponse>, (StatusCode, String)> {
    let popup = PopupController::new(
        app_state.panel_services(),
        app_state.popup_settings(),
        req.tab_id,
    );
    let opened = popup.open_note_panel().await.map_err(|e| {
        error!("Could not reach the relay: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    if opened {
        info!("Note panel requested from the popup.");
    }
    Ok(Json(OpenNoteResponse { opened }))
}
