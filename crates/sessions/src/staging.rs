//! Local staging directory for restored session blobs.
//!
//! The directory is a single-slot cache: after a sweep it holds at most
//! one entry, the most recently modified one.  Leftovers from previous
//! runs must not pile up on small hosts.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sr_domain::trace::TraceEvent;

/// What a sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub kept: Option<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Entries that could not be inspected or removed, with the error.
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if absent.  Idempotent.
    pub async fn ensure_ready(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Keep only the most recently modified entry.
    ///
    /// Never fails: listing and per-entry errors are logged and reported.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_with(None, remove_entry).await
    }

    /// Like [`sweep`](Self::sweep), but `keep` survives regardless of its
    /// modification time when it is an entry of this directory.
    ///
    /// Used right after staging a fresh blob so a file with a skewed
    /// future mtime cannot evict it.
    pub async fn sweep_keeping(&self, keep: &Path) -> SweepReport {
        self.sweep_with(Some(keep), remove_entry).await
    }

    /// Sweep core; `remove` deletes one stale entry.
    async fn sweep_with<F, Fut>(&self, preferred: Option<&Path>, remove: F) -> SweepReport
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let mut report = SweepReport::default();

        let mut entries = match self.list_with_mtime(&mut report).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.root.display(), error = %e, "staging sweep: cannot list directory");
                return report;
            }
        };

        if entries.len() <= 1 && report.failed.is_empty() {
            report.kept = entries.pop().map(|(p, _)| p);
            return report;
        }

        // Oldest first; the name breaks mtime ties so the result is stable.
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let keep_idx = preferred
            .and_then(|want| entries.iter().position(|(p, _)| p == want))
            .or_else(|| entries.len().checked_sub(1));

        for (idx, (path, _)) in entries.into_iter().enumerate() {
            if Some(idx) == keep_idx {
                report.kept = Some(path);
                continue;
            }
            match remove(path.clone()).await {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "staging sweep: removed old entry");
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "staging sweep: removal failed");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        TraceEvent::StagingSwept {
            dir: self.root.display().to_string(),
            kept: report.kept.as_ref().map(|p| p.display().to_string()),
            removed: report.removed.len(),
            failed: report.failed.len(),
        }
        .emit();

        report
    }

    /// Every entry with its modification time.  Entries whose metadata
    /// cannot be read are recorded in `report.failed` and left alone.
    async fn list_with_mtime(
        &self,
        report: &mut SweepReport,
    ) -> io::Result<Vec<(PathBuf, SystemTime)>> {
        let mut out = Vec::new();
        let mut rd = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(mtime) => out.push((path, mtime)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "staging sweep: cannot stat entry");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        Ok(out)
    }
}

async fn remove_entry(path: PathBuf) -> io::Result<()> {
    let meta = tokio::fs::symlink_metadata(&path).await?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn touch(path: &Path, age_secs: u64) {
        std::fs::write(path, b"blob").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut v: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn ensure_ready_creates_nested_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(tmp.path().join("a/b/wa-sessions"));
        staging.ensure_ready().await.unwrap();
        staging.ensure_ready().await.unwrap();
        assert!(staging.path().is_dir());
    }

    #[tokio::test]
    async fn sweep_empty_and_single_are_noops() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(tmp.path());

        let report = staging.sweep().await;
        assert!(report.kept.is_none());
        assert!(report.removed.is_empty());

        touch(&tmp.path().join("only.zip"), 500);
        let report = staging.sweep().await;
        assert_eq!(report.kept, Some(tmp.path().join("only.zip")));
        assert!(report.removed.is_empty());
        assert_eq!(names(tmp.path()), vec!["only.zip"]);
    }

    #[tokio::test]
    async fn sweep_keeps_newest_regardless_of_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("leftover-dir")).unwrap();
        touch(&tmp.path().join("zzz-old.zip"), 3000);
        touch(&tmp.path().join("mmm-middle.zip"), 600);
        std::thread::sleep(Duration::from_millis(20));
        touch(&tmp.path().join("aaa-newest.zip"), 0);

        let report = StagingDir::new(tmp.path()).sweep().await;

        assert_eq!(names(tmp.path()), vec!["aaa-newest.zip"]);
        assert_eq!(report.kept, Some(tmp.path().join("aaa-newest.zip")));
        assert_eq!(report.removed.len(), 3);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn sweep_keeping_protects_preferred_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let fresh = tmp.path().join("fresh.zip");
        touch(&fresh, 5);
        // Clock-skewed leftover that claims to be from the future.
        let skewed = tmp.path().join("skewed.zip");
        std::fs::write(&skewed, b"x").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&skewed)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(3600))
            .unwrap();

        let report = StagingDir::new(tmp.path()).sweep_keeping(&fresh).await;

        assert_eq!(names(tmp.path()), vec!["fresh.zip"]);
        assert_eq!(report.kept, Some(fresh));
    }

    #[tokio::test]
    async fn failed_removal_is_reported_and_the_rest_still_go() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a-old.zip"), 3000);
        touch(&tmp.path().join("b-stuck.zip"), 2000);
        touch(&tmp.path().join("c-old.zip"), 1000);
        touch(&tmp.path().join("d-newest.zip"), 0);
        let stuck = tmp.path().join("b-stuck.zip");

        let report = StagingDir::new(tmp.path())
            .sweep_with(None, |path: PathBuf| {
                let stuck = stuck.clone();
                async move {
                    if path == stuck {
                        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only mount"))
                    } else {
                        remove_entry(path).await
                    }
                }
            })
            .await;

        assert_eq!(names(tmp.path()), vec!["b-stuck.zip", "d-newest.zip"]);
        assert_eq!(report.kept, Some(tmp.path().join("d-newest.zip")));
        assert_eq!(
            report.removed,
            vec![tmp.path().join("a-old.zip"), tmp.path().join("c-old.zip")]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, stuck);
        assert!(report.failed[0].1.contains("read-only mount"));
    }

    #[tokio::test]
    async fn sweep_of_missing_directory_reports_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let report = StagingDir::new(tmp.path().join("absent")).sweep().await;
        assert_eq!(report, SweepReport::default());
    }
}
