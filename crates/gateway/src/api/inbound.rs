//! Inbound chat events.
//!
//! `POST /v1/inbound` receives `{from, body, type, timestamp}` from the
//! chat process.  The gate runs synchronously; an accepted message is
//! handed to the relay pool and the handler returns without waiting for
//! the webhook.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use sr_domain::message::InboundMessage;
use sr_domain::trace::TraceEvent;

use super::api_error;
use crate::runtime::{GateDecision, PoolClosed};
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InboundResponse {
    pub accepted: bool,
    /// Gate rejection reason, or `relay_disabled` when accepted but no
    /// webhook is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Gate `msg` at `now` and schedule the relay if it passes.
pub fn admit(
    state: &AppState,
    msg: InboundMessage,
    now: DateTime<Utc>,
) -> Result<InboundResponse, PoolClosed> {
    if let GateDecision::Reject(reason) = state.gate.evaluate(&msg, &state.cooldown, now) {
        tracing::debug!(sender = %msg.sender, %reason, "inbound message ignored");
        TraceEvent::GateRejected {
            sender: msg.sender,
            reason: reason.as_str().into(),
        }
        .emit();
        return Ok(InboundResponse {
            accepted: false,
            reason: Some(reason.as_str()),
        });
    }

    tracing::info!(sender = %msg.sender, preview = %msg.preview(30), "inbound message accepted");

    if !state.relays.dispatcher().is_enabled() {
        return Ok(InboundResponse {
            accepted: true,
            reason: Some("relay_disabled"),
        });
    }

    state.relays.submit(msg)?;
    Ok(InboundResponse {
        accepted: true,
        reason: None,
    })
}

pub async fn inbound(
    State(state): State<AppState>,
    Json(msg): Json<InboundMessage>,
) -> Response {
    match admit(&state, msg, Utc::now()) {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
