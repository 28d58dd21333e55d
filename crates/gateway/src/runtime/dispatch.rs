//! Bounded relay pool.
//!
//! Accepted messages are relayed on background tasks so the inbound
//! handler returns immediately.  At most `max_concurrent` relays run at
//! once, and relays for the same sender never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use sr_domain::message::InboundMessage;
use sr_sessions::KeyedLockMap;

use super::relay::{RelayDispatcher, RelayOutcome};

/// The pool no longer accepts work.
#[derive(Debug, thiserror::Error)]
#[error("relay pool is shutting down")]
pub struct PoolClosed;

pub struct RelayPool {
    dispatcher: Arc<RelayDispatcher>,
    slots: Arc<Semaphore>,
    senders: Arc<KeyedLockMap>,
    tasks: TaskTracker,
}

impl RelayPool {
    pub fn new(dispatcher: Arc<RelayDispatcher>, max_concurrent: usize) -> Self {
        Self {
            dispatcher,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            senders: Arc::new(KeyedLockMap::new()),
            tasks: TaskTracker::new(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<RelayDispatcher> {
        &self.dispatcher
    }

    /// Relays waiting or running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Schedule a relay for `msg`.
    pub fn submit(
        &self,
        msg: InboundMessage,
    ) -> Result<tokio::task::JoinHandle<RelayOutcome>, PoolClosed> {
        if self.tasks.is_closed() {
            return Err(PoolClosed);
        }

        let dispatcher = self.dispatcher.clone();
        let slots = self.slots.clone();
        let senders = self.senders.clone();

        Ok(self.tasks.spawn(async move {
            // Sender first so a busy sender does not hold a pool slot
            // while it waits.  Neither semaphore is ever closed.
            let Ok(_sender) = senders.acquire(&msg.sender).await else {
                return RelayOutcome::CallFailed;
            };
            let Ok(_slot) = slots.acquire_owned().await else {
                return RelayOutcome::CallFailed;
            };
            dispatcher.relay(&msg).await
        }))
    }

    /// Forget per-sender locks nobody holds.
    pub fn prune_idle(&self) {
        self.senders.prune_idle();
    }

    /// Stop accepting work and wait up to `grace` for running relays.
    /// Returns `true` when everything finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending == 0 {
            return true;
        }
        tracing::info!(pending, "waiting for in-flight relays");
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.tasks.len(),
                    "relays still running after grace period; abandoning"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::routing::post;
    use axum::Router;
    use sr_domain::config::RelayConfig;

    use super::*;
    use crate::runtime::relay::tests::RecordingChat;

    #[derive(Default)]
    struct Tally {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    /// Webhook that sleeps and records the peak number of concurrent calls.
    async fn slow_webhook(delay: Duration) -> (String, Arc<Tally>) {
        let tally = Arc::new(Tally::default());
        let p = tally.clone();
        let app = Router::new().route(
            "/hook",
            post(move || {
                let p = p.clone();
                async move {
                    let now = p.running.fetch_add(1, Ordering::SeqCst) + 1;
                    p.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    p.running.fetch_sub(1, Ordering::SeqCst);
                    r#"{"reply":"ok"}"#
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/hook"), tally)
    }

    fn pool(url: String, max: usize) -> (RelayPool, Arc<RecordingChat>) {
        let chat = Arc::new(RecordingChat::default());
        let cfg = RelayConfig {
            webhook_url: Some(url),
            timeout_ms: 5_000,
            ..RelayConfig::default()
        };
        let dispatcher = RelayDispatcher::new(&cfg, chat.clone()).unwrap();
        (RelayPool::new(Arc::new(dispatcher), max), chat)
    }

    fn msg(sender: &str) -> InboundMessage {
        InboundMessage::text(sender, "hello", 1_700_000_000)
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let (url, tally) = slow_webhook(Duration::from_millis(80)).await;
        let (pool, chat) = pool(url, 2);

        let handles: Vec<_> = (0..6)
            .map(|i| pool.submit(msg(&format!("{i}@c.us"))).unwrap())
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap(), RelayOutcome::Replied("ok".into()));
        }

        assert!(tally.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(chat.sent.lock().len(), 6);
    }

    #[tokio::test]
    async fn same_sender_never_overlaps() {
        let (url, tally) = slow_webhook(Duration::from_millis(50)).await;
        let (pool, _) = pool(url, 8);

        let handles: Vec<_> = (0..3).map(|_| pool.submit(msg("123@c.us")).unwrap()).collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(tally.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_waits_then_rejects_new_work() {
        let (url, _) = slow_webhook(Duration::from_millis(50)).await;
        let (pool, chat) = pool(url, 4);

        pool.submit(msg("a@c.us")).unwrap();
        pool.submit(msg("b@c.us")).unwrap();

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert_eq!(chat.sent.lock().len(), 2);
        assert_eq!(pool.in_flight(), 0);
        assert!(pool.submit(msg("c@c.us")).is_err());
    }

    #[tokio::test]
    async fn drain_gives_up_after_grace() {
        let (url, _) = slow_webhook(Duration::from_secs(2)).await;
        let (pool, _) = pool(url, 1);

        pool.submit(msg("a@c.us")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!pool.drain(Duration::from_millis(50)).await);
    }
}
