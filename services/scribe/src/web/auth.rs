//! services/scribe/src/web/auth.rs
//!
//! Sign-in state endpoints for the popup. Signing in itself happens through
//! the `SUPABASE_LOGIN` runtime message or the OAuth redirect.

use crate::panel::PopupController;
use crate::web::rest::port_error_response;
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use scribe_core::User;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth/session - The user behind the stored credential
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Signed in", body = SessionUser),
        (status = 401, description = "No stored credential, or it was rejected")
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionUser>, (StatusCode, String)> {
    let mut popup = PopupController::new(state.panel_services(), state.popup_settings(), None);
    let user = popup.restore_session().await.map(SessionUser::from);
    user.map(Json)
        .ok_or((StatusCode::UNAUTHORIZED, "Please login first".to_string()))
}

/// POST /auth/logout - Forget the stored credential
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 503, description = "Extension storage unavailable")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut popup = PopupController::new(state.panel_services(), state.popup_settings(), None);
    popup.sign_out().await.map_err(port_error_response)?;
    Ok(StatusCode::OK)
}
