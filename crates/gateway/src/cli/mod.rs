pub mod config;
pub mod session;

use clap::{Parser, Subcommand};

use sr_domain::config::{env_nonempty, Config};

/// SessionRelay: restores a chat client's session from object storage and
/// relays inbound messages to a webhook.
#[derive(Debug, Parser)]
#[command(name = "sessionrelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Inspect or manage the remote session blob.
    #[command(subcommand)]
    Session(SessionCommand),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Report whether the remote session exists.
    Exists,
    /// Download the remote session into the staging directory.
    Fetch {
        /// Destination path (defaults to `<staging_dir>/<client_id>.zip`).
        #[arg(long)]
        dest: Option<std::path::PathBuf>,
    },
    /// Delete the remote session.  Exits non-zero if deletion fails.
    Delete,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `SR_CONFIG` (or `config.toml`
/// by default) and fold in environment overrides.  A missing file means
/// all defaults.  Returns the config and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("SR_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let mut config = read_config(&config_path)?;
    config.apply_env(env_nonempty);
    Ok((config, config_path))
}

fn read_config(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
