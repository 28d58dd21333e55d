//! Steady-state runtime: gate inbound events, relay the accepted ones,
//! and keep the session backup loop ticking.

pub mod backup;
pub mod dispatch;
pub mod gate;
pub mod relay;

pub use backup::spawn_backup_sync;
pub use dispatch::{PoolClosed, RelayPool};
pub use gate::{CooldownContext, GateDecision, MessageGate, RejectReason};
pub use relay::{extract_reply, RelayDispatcher, RelayOutcome};
