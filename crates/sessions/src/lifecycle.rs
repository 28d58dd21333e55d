//! Persistence seam consumed by the chat client's auth layer.
//!
//! The auth layer restores its state through four calls: `exists`,
//! `extract`, `save` and `delete`.  [`SessionLifecycleAdapter`] answers
//! them by delegating to [`RemoteSessionCache`] without adding logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sr_domain::error::Result;

use crate::cache::{RemoteSessionCache, SaveOutcome};

/// Backend contract for session restore.
///
/// `exists` and `extract` never fail: problems mean "no session".
/// `delete` is the only call that reports failure.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn exists(&self, session: &str) -> bool;
    async fn extract(&self, session: &str, dest: &Path) -> Option<PathBuf>;
    async fn save(&self, session: &str) -> SaveOutcome;
    async fn delete(&self, session: &str) -> Result<()>;
}

pub struct SessionLifecycleAdapter {
    cache: Arc<RemoteSessionCache>,
}

impl SessionLifecycleAdapter {
    pub fn new(cache: Arc<RemoteSessionCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<RemoteSessionCache> {
        &self.cache
    }
}

#[async_trait]
impl SessionPersistence for SessionLifecycleAdapter {
    async fn exists(&self, session: &str) -> bool {
        self.cache.exists(session).await
    }

    async fn extract(&self, session: &str, dest: &Path) -> Option<PathBuf> {
        self.cache.extract(session, dest).await
    }

    async fn save(&self, session: &str) -> SaveOutcome {
        self.cache.save(session).await
    }

    async fn delete(&self, session: &str) -> Result<()> {
        self.cache.delete(session).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Startup restore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the startup restore went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Blob staged at this path.
    Restored(PathBuf),
    /// Nothing remote; the client must pair from scratch.
    NoRemoteSession,
    /// The object was listed but could not be staged.
    ExtractFailed,
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored(_))
    }
}

/// The auth layer's restore sequence: `exists`, then `extract` to `dest`.
pub async fn restore_session(
    backend: &dyn SessionPersistence,
    session: &str,
    dest: &Path,
) -> RestoreOutcome {
    if !backend.exists(session).await {
        tracing::info!(session, "no remote session; a fresh pairing is required");
        return RestoreOutcome::NoRemoteSession;
    }
    match backend.extract(session, dest).await {
        Some(path) => {
            tracing::info!(session, path = %path.display(), "session restored");
            RestoreOutcome::Restored(path)
        }
        None => {
            tracing::warn!(session, "remote session listed but not restored");
            RestoreOutcome::ExtractFailed
        }
    }
}
