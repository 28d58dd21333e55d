use serde::{Deserialize, Serialize};

/// HTTP bridge to the external chat client.
///
/// Replies are POSTed as `{"to", "text"}` to `send_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub send_url: Option<String>,
    #[serde(default = "d_send_url_env")]
    pub send_url_env: String,
    #[serde(default = "d_15000")]
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            send_url: None,
            send_url_env: d_send_url_env(),
            timeout_ms: 15000,
        }
    }
}

fn d_send_url_env() -> String {
    "CHAT_SEND_URL".into()
}
fn d_15000() -> u64 {
    15000
}
