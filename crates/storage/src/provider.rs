//! The `ObjectStore` trait defines the interface for all remote blob
//! backends (Supabase REST, in-memory test double).

use async_trait::async_trait;
use sr_domain::error::Result;

use crate::types::ObjectInfo;

/// Flat object namespace inside a single bucket.
///
/// Implementations must not retry on their own; the session cache decides
/// which failures are recoverable.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects under `prefix` whose name contains `search`.
    async fn list(&self, prefix: &str, search: &str) -> Result<Vec<ObjectInfo>>;

    /// Fetch an object's bytes.  `Ok(None)` when no such object exists.
    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the named objects.
    async fn remove(&self, names: &[String]) -> Result<()>;
}
