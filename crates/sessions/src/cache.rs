//! Remote session cache: one `<session>.zip` object per client identity.
//!
//! Restore is best-effort: lookups and downloads that fail are logged
//! and reported as "no session" so the caller can fall back to a fresh
//! pairing.  Deletion is the one operation whose failure reaches the
//! caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sr_domain::error::{Error, Result};
use sr_domain::trace::TraceEvent;
use sr_storage::ObjectStore;

use crate::lock::KeyedLockMap;
use crate::staging::StagingDir;

/// Remote object name for a session.
pub fn object_name(session: &str) -> String {
    format!("{session}.zip")
}

/// Whether local session changes are written back to the bucket.
///
/// The remote blob is provisioned out of band and only ever read, so
/// `save` is a no-op.  Kept as a type so the choice is visible at every
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum WritePolicy {
    #[default]
    Disabled,
}

/// Result of a `save` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing uploaded because write-through is disabled.
    WriteThroughDisabled,
}

pub struct RemoteSessionCache {
    store: Arc<dyn ObjectStore>,
    staging: StagingDir,
    write_policy: WritePolicy,
    /// Serializes `extract` + sweep per session.
    locks: KeyedLockMap,
}

impl RemoteSessionCache {
    pub fn new(store: Arc<dyn ObjectStore>, staging: StagingDir) -> Self {
        Self {
            store,
            staging,
            write_policy: WritePolicy::Disabled,
            locks: KeyedLockMap::new(),
        }
    }

    pub fn staging(&self) -> &StagingDir {
        &self.staging
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Does `<session>.zip` exist remotely?  Errors count as "no".
    pub async fn exists(&self, session: &str) -> bool {
        let name = object_name(session);
        match self.store.list("", &name).await {
            Ok(objects) => {
                // The listing search is a substring match; only the exact
                // name counts.
                let found = objects.iter().any(|o| o.name == name);
                tracing::debug!(session, found, "session lookup");
                TraceEvent::SessionLookup {
                    session: session.to_owned(),
                    found,
                    error: None,
                }
                .emit();
                found
            }
            Err(e) => {
                tracing::error!(session, error = %e, "session lookup failed; treating as absent");
                TraceEvent::SessionLookup {
                    session: session.to_owned(),
                    found: false,
                    error: Some(e.to_string()),
                }
                .emit();
                false
            }
        }
    }

    /// Download the session blob to `dest` and sweep the staging dir.
    ///
    /// Returns `None` when the object is missing or anything on the way
    /// fails; the caller then bootstraps a fresh session.
    pub async fn extract(&self, session: &str, dest: &Path) -> Option<PathBuf> {
        let _permit = match self.locks.acquire(session).await {
            Ok(p) => p,
            Err(e) => {
                self.skip(session, format!("lock: {e}"));
                return None;
            }
        };

        tracing::info!(session, dest = %dest.display(), "extracting session");

        let bytes = match self.store.download(&object_name(session)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(session, "no remote session found");
                self.skip(session, "not found".into());
                return None;
            }
            Err(e) => {
                tracing::warn!(session, error = %e, "session download failed");
                self.skip(session, e.to_string());
                return None;
            }
        };

        if let Err(e) = self.stage(dest, &bytes).await {
            tracing::warn!(session, dest = %dest.display(), error = %e, "writing staged session failed");
            self.skip(session, e.to_string());
            return None;
        }

        TraceEvent::SessionExtracted {
            session: session.to_owned(),
            path: dest.display().to_string(),
            bytes: bytes.len(),
        }
        .emit();

        self.staging.sweep_keeping(dest).await;

        Some(dest.to_path_buf())
    }

    /// Write-through hook.  Uploads nothing under [`WritePolicy::Disabled`].
    pub async fn save(&self, session: &str) -> SaveOutcome {
        match self.write_policy {
            WritePolicy::Disabled => {
                tracing::debug!(session, "save skipped: write-through disabled");
                SaveOutcome::WriteThroughDisabled
            }
        }
    }

    /// Remove the remote blob.  Failure is logged and returned.
    pub async fn delete(&self, session: &str) -> Result<()> {
        tracing::info!(session, "deleting remote session");
        match self.store.remove(&[object_name(session)]).await {
            Ok(()) => {
                tracing::info!(session, "remote session deleted");
                TraceEvent::SessionDeleted {
                    session: session.to_owned(),
                    ok: true,
                    error: None,
                }
                .emit();
                Ok(())
            }
            Err(e) => {
                tracing::error!(session, error = %e, "remote session delete failed");
                TraceEvent::SessionDeleted {
                    session: session.to_owned(),
                    ok: false,
                    error: Some(e.to_string()),
                }
                .emit();
                Err(e)
            }
        }
    }

    /// Write `bytes` to `dest` via a sibling temp file + rename so readers
    /// never see a partial blob.
    async fn stage(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        self.staging.ensure_ready().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = dest
            .file_name()
            .ok_or_else(|| Error::Other(format!("not a file path: {}", dest.display())))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".partial");
        let tmp = dest.with_file_name(tmp_name);

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn skip(&self, session: &str, reason: String) {
        TraceEvent::SessionExtractSkipped {
            session: session.to_owned(),
            reason,
        }
        .emit();
    }
}
