//! Relay dispatcher: forward an accepted message to the webhook and send
//! back whatever reply it returns.
//!
//! One webhook call and at most one reply per message.  No retries.
//! Failures are logged, traced and turned into a [`RelayOutcome`]; they
//! never propagate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use sr_domain::config::RelayConfig;
use sr_domain::error::Result;
use sr_domain::message::InboundMessage;
use sr_domain::trace::TraceEvent;
use sr_storage::from_reqwest;

use crate::chat::ChatClient;

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No webhook configured.
    Disabled,
    /// The webhook call (or reading its body) failed.
    CallFailed,
    /// The webhook answered without a usable reply.
    NoReply,
    /// The reply was delivered to the sender.
    Replied(String),
    /// A reply was extracted but sending it failed.
    ReplyFailed,
}

/// Pull the reply text out of a webhook response body.
///
/// Non-JSON bodies count as `{}`.  For an array the first element is
/// used.  `Reply` wins over `reply` when both are non-empty strings.
pub fn extract_reply(body: &str) -> Option<String> {
    let parsed: Value =
        serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()));
    let payload = match parsed {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => Value::Null,
        other => other,
    };

    ["Reply", "reply"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

pub struct RelayDispatcher {
    http: reqwest::Client,
    webhook_url: Option<String>,
    chat: Arc<dyn ChatClient>,
}

impl RelayDispatcher {
    pub fn new(cfg: &RelayConfig, chat: Arc<dyn ChatClient>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            http,
            webhook_url: cfg.webhook_url.clone().filter(|u| !u.trim().is_empty()),
            chat,
        })
    }

    /// `false` when the webhook URL is unset or blank.
    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn relay(&self, msg: &InboundMessage) -> RelayOutcome {
        let Some(url) = self.webhook_url.as_deref() else {
            return RelayOutcome::Disabled;
        };

        let relay_id = Uuid::new_v4();
        let span = tracing::info_span!("relay", %relay_id, sender = %msg.sender);
        self.relay_to(url, msg).instrument(span).await
    }

    async fn relay_to(&self, url: &str, msg: &InboundMessage) -> RelayOutcome {
        tracing::info!(preview = %msg.preview(30), "relaying message");

        let started = Instant::now();
        let reply = match self.call_webhook(url, msg).await {
            Ok((status, body)) => {
                let reply = extract_reply(&body);
                TraceEvent::RelayCall {
                    sender: msg.sender.clone(),
                    status,
                    duration_ms: started.elapsed().as_millis() as u64,
                    has_reply: reply.is_some(),
                }
                .emit();
                reply
            }
            Err(e) => {
                tracing::error!(error = %e, "webhook call failed");
                self.failed(msg, "webhook", e.to_string());
                return RelayOutcome::CallFailed;
            }
        };

        let Some(reply) = reply else {
            tracing::debug!("webhook returned no reply");
            return RelayOutcome::NoReply;
        };

        match self.chat.send_text(&msg.sender, &reply).await {
            Ok(()) => {
                let preview: String = reply.chars().take(30).collect();
                tracing::info!(%preview, "sent reply");
                TraceEvent::ReplySent {
                    sender: msg.sender.clone(),
                    chars: reply.chars().count(),
                }
                .emit();
                RelayOutcome::Replied(reply)
            }
            Err(e) => {
                tracing::error!(error = %e, "reply send failed");
                self.failed(msg, "reply", e.to_string());
                RelayOutcome::ReplyFailed
            }
        }
    }

    /// POST the message and read the whole body.  Non-2xx statuses are
    /// logged but the body is still inspected for a reply.
    async fn call_webhook(&self, url: &str, msg: &InboundMessage) -> Result<(u16, String)> {
        let resp = self
            .http
            .post(url)
            .json(&RelayRequest {
                from: &msg.sender,
                message: &msg.body,
            })
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "webhook returned non-success status");
        }
        let body = resp.text().await.map_err(from_reqwest)?;
        Ok((status.as_u16(), body))
    }

    fn failed(&self, msg: &InboundMessage, stage: &str, error: String) {
        TraceEvent::RelayFailed {
            sender: msg.sender.clone(),
            stage: stage.into(),
            error,
        }
        .emit();
    }
}
