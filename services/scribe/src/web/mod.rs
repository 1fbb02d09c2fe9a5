pub mod auth;
pub mod content_socket;
pub mod host_socket;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the WebSocket handlers and the router builder to make them easily
// accessible to the binary that starts the server.
pub use content_socket::content_ws_handler;
pub use host_socket::host_ws_handler;
pub use middleware::require_auth;
pub use ws_handler::ws_handler;

use crate::web::state::AppState;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds every route of the service, including the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (extension contexts talk to these without a bearer token)
    let public_routes = Router::new()
        .route("/runtime", post(rest::runtime_handler))
        .route("/popup", get(rest::popup_data_handler))
        .route("/popup/open-note", post(rest::open_note_panel_handler))
        .route("/auth/session", get(auth::session_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/content", get(content_ws_handler))
        .route("/panel", get(ws_handler))
        .route("/host", get(host_ws_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route(
            "/questions",
            get(rest::list_questions_handler).post(rest::create_question_handler),
        )
        .route("/questions/stats", get(rest::question_stats_handler))
        .route("/questions/{id}", patch(rest::update_question_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let mut api_router = Router::new().merge(public_routes).merge(protected_routes);
    if let Some(cors) = cors_layer(app_state.config.allowed_origin.as_deref()) {
        api_router = api_router.layer(cors);
    }

    Router::new()
        .merge(api_router.with_state(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = match origin?.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            warn!("Ignoring invalid ALLOWED_ORIGIN: {}", e);
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
    )
}
