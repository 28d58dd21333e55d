//! `sessionrelay session ...` operator commands.
//!
//! Each command talks to the real object store using the same
//! credentials and session backend as `serve`.

use std::path::PathBuf;

use sr_domain::config::Config;
use sr_sessions::SessionPersistence;

use crate::bootstrap::{connect_store, session_backend};

use super::SessionCommand;

/// Run a session command.  Returns `false` when the command should exit
/// non-zero.
pub async fn run(config: &Config, cmd: SessionCommand) -> anyhow::Result<bool> {
    let backend = session_backend(config, connect_store(config)?);
    execute(backend.as_ref(), config, cmd).await
}

pub async fn execute(
    backend: &dyn SessionPersistence,
    config: &Config,
    cmd: SessionCommand,
) -> anyhow::Result<bool> {
    let session = config.session.client_id.as_str();
    match cmd {
        SessionCommand::Exists => {
            let found = backend.exists(session).await;
            println!("{}", if found { "present" } else { "absent" });
            Ok(found)
        }
        SessionCommand::Fetch { dest } => {
            let dest: PathBuf = dest.unwrap_or_else(|| config.session.staged_blob_path());
            match backend.extract(session, &dest).await {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(true)
                }
                None => {
                    eprintln!("no session restored for {session}");
                    Ok(false)
                }
            }
        }
        SessionCommand::Delete => {
            backend.delete(session).await?;
            println!("deleted {session}");
            Ok(true)
        }
    }
}
