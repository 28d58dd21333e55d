use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session restore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chat client identity.  The remote blob is `<client_id>.zip`.
    #[serde(default = "d_client_id")]
    pub client_id: String,
    #[serde(default = "d_client_id_env")]
    pub client_id_env: String,
    /// Local staging directory.  Defaults to `<os tmp>/wa-sessions`.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// How often the periodic backup hook runs.
    #[serde(default = "d_day")]
    pub backup_sync_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: d_client_id(),
            client_id_env: d_client_id_env(),
            staging_dir: None,
            backup_sync_interval_secs: d_day(),
        }
    }
}

impl SessionConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("wa-sessions"))
    }

    /// Where a restored blob for `client_id` is staged.
    pub fn staged_blob_path(&self) -> PathBuf {
        self.staging_dir().join(format!("{}.zip", self.client_id))
    }
}

fn d_client_id() -> String {
    "render-bot-478".into()
}
fn d_client_id_env() -> String {
    "WHATSAPP_CLIENT_ID".into()
}
fn d_day() -> u64 {
    24 * 60 * 60
}
