//! Bearer-token guard for the inbound route.
//!
//! The token is read from the env var named by `server.api_token_env`
//! once at startup, and only its SHA-256 digest is kept in `AppState`.
//! With no token configured every request passes (dev mode); the boot
//! path logs a warning in that case.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use sr_domain::config::Config;

use super::api_error;
use crate::state::AppState;

/// SHA-256 digest of a bearer token.
pub fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

/// Resolve the inbound token through `env` and hash it.
///
/// `None` means dev mode.
pub fn resolve_token_hash(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Vec<u8>> {
    let env_var = &config.server.api_token_env;
    match env(env_var) {
        Some(token) => {
            tracing::info!(env = %env_var, "inbound bearer-token auth enabled");
            Some(hash_token(&token))
        }
        None => {
            tracing::warn!(
                "inbound bearer-token auth DISABLED; set {env_var} to protect /v1/inbound"
            );
            None
        }
    }
}

/// Middleware for protected routes.  Attach with
/// `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_token_hash else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Compare fixed-length digests in constant time.
    let provided = Sha256::digest(provided.as_bytes());
    if !bool::from(provided.ct_eq(expected.as_slice())) {
        tracing::warn!("inbound request rejected: invalid or missing API token");
        return api_error(StatusCode::UNAUTHORIZED, "invalid or missing API token");
    }

    next.run(req).await
}
