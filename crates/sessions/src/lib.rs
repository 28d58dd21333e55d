//! Session persistence for SessionRelay.
//!
//! A chat client's authentication state lives remotely as one
//! `<client-id>.zip` object.  This crate stages that blob locally at
//! startup, keeps the staging directory down to a single entry, and
//! exposes the four-call persistence contract the auth layer expects.

pub mod cache;
pub mod lifecycle;
pub mod lock;
pub mod staging;

pub use cache::{object_name, RemoteSessionCache, SaveOutcome, WritePolicy};
pub use lifecycle::{restore_session, RestoreOutcome, SessionLifecycleAdapter, SessionPersistence};
pub use lock::{KeyedLockMap, LockClosed};
pub use staging::{StagingDir, SweepReport};
