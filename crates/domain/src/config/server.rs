use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server (health + inbound bridge)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3000")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Environment variable that overrides `port` when set.
    /// Hosting platforms (Render, Fly, Heroku) inject `PORT`.
    #[serde(default = "d_port_env")]
    pub port_env: String,
    /// Upper bound on concurrently served HTTP requests.
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
    /// Environment variable holding the bearer token for `/v1/inbound`.
    /// Unset or empty leaves the route open (dev mode).
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: d_host(),
            port_env: d_port_env(),
            max_concurrent_requests: 256,
            api_token_env: d_api_token_env(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_3000() -> u16 {
    3000
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_port_env() -> String {
    "PORT".into()
}
fn d_256() -> usize {
    256
}
fn d_api_token_env() -> String {
    "SR_API_TOKEN".into()
}
