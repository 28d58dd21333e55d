use serde::{Deserialize, Serialize};

/// Pseudo-conversation the chat network uses for status updates.
pub const BROADCAST_SENDER: &str = "status@broadcast";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Quiet period after startup during which every event is dropped.
    #[serde(default = "d_120")]
    pub cooldown_secs: u64,
    #[serde(default = "d_broadcast")]
    pub broadcast_sender: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 120,
            broadcast_sender: d_broadcast(),
        }
    }
}

fn d_120() -> u64 {
    120
}
fn d_broadcast() -> String {
    BROADCAST_SENDER.into()
}
