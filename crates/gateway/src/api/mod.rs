pub mod auth;
pub mod health;
pub mod inbound;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the HTTP router.
///
/// Public:
/// - `GET  /`           plain-text liveness line for platform health checks
/// - `GET  /v1/health`  JSON health with session and relay status
///
/// Protected by the bearer-token middleware:
/// - `POST /v1/inbound` inbound chat events from the chat process
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(health::root))
        .route("/v1/health", get(health::health));

    let protected = Router::new()
        .route("/v1/inbound", post(inbound::inbound))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}
