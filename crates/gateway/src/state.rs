use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sr_domain::config::Config;
use sr_sessions::{RestoreOutcome, SessionPersistence};

use crate::runtime::{CooldownContext, MessageGate, RelayPool};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────────
    pub config: Arc<Config>,

    // ── Session ───────────────────────────────────────────────────────
    pub sessions: Arc<dyn SessionPersistence>,
    /// Result of the startup restore.
    pub restore: RestoreOutcome,

    // ── Inbound path ──────────────────────────────────────────────────
    /// Captured once at startup; never changes.
    pub cooldown: CooldownContext,
    pub gate: Arc<MessageGate>,
    pub relays: Arc<RelayPool>,
    /// SHA-256 of the inbound bearer token; `None` in dev mode.
    pub api_token_hash: Option<Vec<u8>>,

    // ── Lifecycle ─────────────────────────────────────────────────────
    /// Cancelled on shutdown; background loops watch it.
    pub shutdown: CancellationToken,
}
