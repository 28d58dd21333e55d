mod chat;
mod gate;
mod observability;
mod relay;
mod server;
mod session;
mod storage;

pub use chat::*;
pub use gate::*;
pub use observability::*;
pub use relay::*;
pub use server::*;
pub use session::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Read a non-empty environment variable.
pub fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Fold environment overrides into the file config.
    ///
    /// Each section names the variables it honours (`port_env`,
    /// `bucket_env`, ...).  An override only applies when the variable
    /// is set and non-empty.  Secrets are not folded in; see
    /// [`StorageConfig::resolve_credentials`].
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(port) = env(&self.server.port_env).and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(bucket) = env(&self.storage.bucket_env) {
            self.storage.bucket = bucket;
        }
        if self.storage.url.is_none() {
            self.storage.url = env(&self.storage.url_env);
        }
        if let Some(id) = env(&self.session.client_id_env) {
            self.session.client_id = id;
        }
        if !self.relay.has_webhook() {
            self.relay.webhook_url = env(&self.relay.webhook_url_env);
        }
        if self.chat.send_url.is_none() {
            self.chat.send_url = env(&self.chat.send_url_env);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.  Credentials are
    /// not checked here; they live in the environment and are resolved
    /// at startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.storage.bucket.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "storage.bucket".into(),
                message: "bucket must not be empty".into(),
            });
        }

        if self.session.client_id.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.client_id".into(),
                message: "client_id must not be empty".into(),
            });
        }

        // The id becomes an object name inside a URL path.
        if let Some(bad) = self
            .session
            .client_id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')))
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.client_id".into(),
                message: format!(
                    "client_id may only contain letters, digits, '-', '_', '.' or '@' (found {bad:?})"
                ),
            });
        }

        if self.relay.max_concurrent == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "relay.max_concurrent".into(),
                message: "max_concurrent must be greater than 0".into(),
            });
        }

        if !self.relay.has_webhook() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "relay.webhook_url".into(),
                message: format!(
                    "no webhook URL (set {} or relay.webhook_url); relay is disabled",
                    self.relay.webhook_url_env
                ),
            });
        }

        if self.gate.cooldown_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "gate.cooldown_secs".into(),
                message: "cooldown of 0 relays backlog delivered right after login".into(),
            });
        }

        errors
    }
}
