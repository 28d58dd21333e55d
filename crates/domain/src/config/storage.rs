use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote object store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the remote object store holding session blobs.
///
/// The service key never lives in the config file.  It is read from the
/// first non-empty variable listed in `key_env` at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Project URL (e.g. `https://xyz.supabase.co`).  Falls back to
    /// `url_env` when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "d_url_env")]
    pub url_env: String,
    /// Candidate variables for the service key, in priority order.
    #[serde(default = "d_key_env")]
    pub key_env: Vec<String>,
    #[serde(default = "d_bucket")]
    pub bucket: String,
    #[serde(default = "d_bucket_env")]
    pub bucket_env: String,
    #[serde(default = "d_15000")]
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            url_env: d_url_env(),
            key_env: d_key_env(),
            bucket: d_bucket(),
            bucket_env: d_bucket_env(),
            timeout_ms: 15000,
        }
    }
}

/// Resolved store location + service key.
#[derive(Clone)]
pub struct StorageCredentials {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("url", &self.url)
            .field("key", &"***")
            .finish()
    }
}

impl StorageConfig {
    /// Resolve the store URL and service key.
    ///
    /// Missing either one is a startup-fatal configuration error.
    pub fn resolve_credentials(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<StorageCredentials> {
        let url = self
            .url
            .clone()
            .or_else(|| env(&self.url_env))
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("storage URL missing (set {})", self.url_env)))?;

        let key = self
            .key_env
            .iter()
            .find_map(|name| env(name).filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                Error::Config(format!(
                    "storage key missing (set one of {})",
                    self.key_env.join(", ")
                ))
            })?;

        Ok(StorageCredentials {
            url: url.trim_end_matches('/').to_owned(),
            key,
        })
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_url_env() -> String {
    "SUPABASE_URL".into()
}
fn d_key_env() -> Vec<String> {
    vec!["SUPABASE_SERVICE_KEY".into(), "SUPABASE_KEY".into()]
}
fn d_bucket() -> String {
    "whatsapp-sessions".into()
}
fn d_bucket_env() -> String {
    "SUPABASE_BUCKET".into()
}
fn d_15000() -> u64 {
    15000
}
