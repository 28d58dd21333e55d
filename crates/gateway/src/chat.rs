//! Outbound side of the chat client.
//!
//! The chat protocol itself runs in a separate process.  The gateway only
//! needs "send this text to that conversation", which it reaches over a
//! small HTTP bridge.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use sr_domain::config::ChatConfig;
use sr_domain::error::{Error, Result};
use sr_storage::from_reqwest;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `text` to the conversation `to`.
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendTextRequest<'a> {
    to: &'a str,
    text: &'a str,
}

/// Posts `{"to", "text"}` to the chat process's send endpoint.
pub struct HttpChatBridge {
    http: reqwest::Client,
    send_url: Option<String>,
}

impl HttpChatBridge {
    pub fn new(cfg: &ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            http,
            send_url: cfg.send_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.send_url.is_some()
    }
}

#[async_trait]
impl ChatClient for HttpChatBridge {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let url = self
            .send_url
            .as_deref()
            .ok_or_else(|| Error::Chat("no chat send endpoint configured".into()))?;

        let resp = self
            .http
            .post(url)
            .json(&SendTextRequest { to, text })
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("send returned {status}: {body}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use super::*;

    async fn spawn_bridge(status: u16) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let app = Router::new().route(
            "/send",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen = seen2.clone();
                async move {
                    seen.lock().push(body);
                    axum::http::StatusCode::from_u16(status).unwrap()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/send"), seen)
    }

    fn bridge(url: Option<String>) -> HttpChatBridge {
        HttpChatBridge::new(&ChatConfig {
            send_url: url,
            ..ChatConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_target_and_text() {
        let (url, seen) = spawn_bridge(200).await;
        bridge(Some(url)).send_text("123@c.us", "hi").await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["to"], "123@c.us");
        assert_eq!(seen[0]["text"], "hi");
    }

    #[tokio::test]
    async fn non_success_status_is_chat_error() {
        let (url, _) = spawn_bridge(502).await;
        let err = bridge(Some(url)).send_text("a", "b").await.unwrap_err();
        assert!(matches!(err, Error::Chat(_)));
    }

    #[tokio::test]
    async fn unconfigured_bridge_refuses_to_send() {
        let b = bridge(None);
        assert!(!b.is_configured());
        assert!(matches!(b.send_text("a", "b").await, Err(Error::Chat(_))));
    }
}
