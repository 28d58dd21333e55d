//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! [`build_app_state`] is the production boot path: it resolves storage
//! credentials from the environment and wires real HTTP clients.
//! [`build_app_state_with`] takes the collaborators directly so tests can
//! boot the same wiring against in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use sr_domain::config::{env_nonempty, Config, ConfigSeverity};
use sr_sessions::{
    restore_session, RemoteSessionCache, SessionLifecycleAdapter, SessionPersistence, StagingDir,
};
use sr_storage::ObjectStore;

use crate::chat::{ChatClient, HttpChatBridge};
use crate::runtime::{spawn_backup_sync, CooldownContext, MessageGate, RelayDispatcher, RelayPool};
use crate::state::AppState;

/// Log every config issue and fail on errors.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Build the object store from config plus environment credentials.
///
/// Missing credentials are fatal; the caller exits.
pub fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let creds = config
        .storage
        .resolve_credentials(env_nonempty)
        .context("resolving object store credentials")?;
    sr_storage::create_store(&config.storage, &creds).context("creating object store client")
}

/// Session cache over `store`, staging under the configured directory.
pub fn session_backend(
    config: &Config,
    store: Arc<dyn ObjectStore>,
) -> Arc<SessionLifecycleAdapter> {
    let staging = StagingDir::new(config.session.staging_dir());
    let cache = RemoteSessionCache::new(store, staging);
    Arc::new(SessionLifecycleAdapter::new(Arc::new(cache)))
}

/// Validate config, connect every collaborator and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // The cooldown clock starts at process entry, before any network I/O.
    let cooldown = CooldownContext::starting_now(Duration::from_secs(config.gate.cooldown_secs));

    check_config(&config)?;
    let store = connect_store(&config)?;

    let bridge = HttpChatBridge::new(&config.chat).context("creating chat bridge")?;
    if !bridge.is_configured() {
        tracing::warn!("chat.send_url not set; replies cannot be delivered");
    }

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = crate::api::auth::resolve_token_hash(&config, env_nonempty);

    let mut state = build_app_state_with(config, store, Arc::new(bridge), cooldown).await?;
    state.api_token_hash = api_token_hash;
    Ok(state)
}

/// Wire the state from explicit collaborators and run the startup restore.
///
/// The returned state has no API token; callers that want the inbound
/// route protected set `api_token_hash` afterwards.
pub async fn build_app_state_with(
    config: Arc<Config>,
    store: Arc<dyn ObjectStore>,
    chat: Arc<dyn ChatClient>,
    cooldown: CooldownContext,
) -> anyhow::Result<AppState> {
    // ── Session restore ──────────────────────────────────────────────
    let sessions: Arc<dyn SessionPersistence> = session_backend(&config, store);
    let client_id = &config.session.client_id;
    let restore = restore_session(
        sessions.as_ref(),
        client_id,
        &config.session.staged_blob_path(),
    )
    .await;
    tracing::info!(session = %client_id, outcome = ?restore, "startup restore finished");

    // ── Relay path ───────────────────────────────────────────────────
    let dispatcher =
        RelayDispatcher::new(&config.relay, chat).context("creating relay dispatcher")?;
    if dispatcher.is_enabled() {
        tracing::info!(max_concurrent = config.relay.max_concurrent, "relay enabled");
    } else {
        tracing::warn!("relay.webhook_url not set; accepted messages are not relayed");
    }
    let relays = Arc::new(RelayPool::new(
        Arc::new(dispatcher),
        config.relay.max_concurrent,
    ));

    Ok(AppState {
        gate: Arc::new(MessageGate::new(&config.gate)),
        config,
        sessions,
        restore,
        cooldown,
        relays,
        api_token_hash: None,
        shutdown: CancellationToken::new(),
    })
}

/// Spawn the periodic loops.  All of them stop when `state.shutdown` is
/// cancelled.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Session backup sync ──────────────────────────────────────────
    spawn_backup_sync(
        state.sessions.clone(),
        state.config.session.client_id.clone(),
        Duration::from_secs(state.config.session.backup_sync_interval_secs.max(1)),
        state.shutdown.clone(),
    );

    // ── Per-sender lock pruning ──────────────────────────────────────
    {
        let relays = state.relays.clone();
        let cancel = state.shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => relays.prune_idle(),
                }
            }
        });
    }
}
