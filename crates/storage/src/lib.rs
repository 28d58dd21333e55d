//! `sr-storage`: remote object store access for SessionRelay.
//!
//! Provides the [`ObjectStore`] trait the session cache is written
//! against, a production REST implementation for Supabase Storage
//! ([`SupabaseStorageClient`]), and an in-memory double
//! ([`InMemoryObjectStore`]) with failure injection for tests.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use sr_domain::config::StorageConfig;
//! use sr_storage::{create_store, ObjectStore};
//!
//! # async fn example() -> sr_domain::error::Result<()> {
//! let cfg = StorageConfig::default();
//! let creds = cfg.resolve_credentials(sr_domain::config::env_nonempty)?;
//! let store = create_store(&cfg, &creds)?;
//!
//! let hits = store.list("", "render-bot-478.zip").await?;
//! println!("found {} objects", hits.len());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod provider;
pub mod supabase;
pub mod types;

pub use memory::InMemoryObjectStore;
pub use provider::ObjectStore;
pub use supabase::{from_reqwest, SupabaseStorageClient};
pub use types::{ListRequest, ObjectInfo, RemoveRequest};

use std::sync::Arc;

use sr_domain::config::{StorageConfig, StorageCredentials};
use sr_domain::error::Result;

/// Build the object store the gateway talks to.
pub fn create_store(
    cfg: &StorageConfig,
    creds: &StorageCredentials,
) -> Result<Arc<dyn ObjectStore>> {
    let client = SupabaseStorageClient::new(cfg, creds)?;
    tracing::info!(
        url = %creds.url,
        bucket = %cfg.bucket,
        timeout_ms = cfg.timeout_ms,
        "object store client ready"
    );
    Ok(Arc::new(client))
}
