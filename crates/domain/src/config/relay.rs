use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Webhook relay
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// External processing endpoint.  Relay is disabled when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "d_webhook_env")]
    pub webhook_url_env: String,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// Relay sequences allowed in flight at once (across all senders).
    #[serde(default = "d_16")]
    pub max_concurrent: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_url_env: d_webhook_env(),
            timeout_ms: 30000,
            max_concurrent: 16,
        }
    }
}

impl RelayConfig {
    /// A non-blank webhook URL is configured.
    pub fn has_webhook(&self) -> bool {
        self.webhook_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }
}

fn d_webhook_env() -> String {
    "N8N_WEBHOOK_URL".into()
}
fn d_30000() -> u64 {
    30000
}
fn d_16() -> usize {
    16
}
