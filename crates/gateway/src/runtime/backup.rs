//! Periodic session backup.
//!
//! The auth layer asks its persistence backend to `save` on a fixed
//! interval (daily by default).  The loop runs until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sr_sessions::{SaveOutcome, SessionPersistence};

pub fn spawn_backup_sync(
    backend: Arc<dyn SessionPersistence>,
    session: String,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First save one interval after startup, not immediately.
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("backup sync loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    match backend.save(&session).await {
                        SaveOutcome::WriteThroughDisabled => {
                            tracing::debug!(session = %session, "backup sync: write-through disabled");
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use sr_domain::error::Result;

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl SessionPersistence for CountingBackend {
        async fn exists(&self, _: &str) -> bool {
            false
        }
        async fn extract(&self, _: &str, _: &Path) -> Option<PathBuf> {
            None
        }
        async fn save(&self, _: &str) -> SaveOutcome {
            self.saves.fetch_add(1, Ordering::SeqCst);
            SaveOutcome::WriteThroughDisabled
        }
        async fn delete(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn saves_once_per_interval_until_cancelled() {
        let backend = Arc::new(CountingBackend::default());
        let cancel = CancellationToken::new();
        let handle = spawn_backup_sync(
            backend.clone(),
            "bot".into(),
            Duration::from_secs(60),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(backend.saves.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }
}
