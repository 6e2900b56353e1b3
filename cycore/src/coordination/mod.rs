//! Coordination-service access.
//!
//! - `KeyValueStore` - get-by-key seam used by the config resolver
//! - `EtcdStore` - etcd v2 keys API over HTTP
//! - `StaticStore` - in-memory map, for tests and embedders

mod etcd;
mod memory;

pub use etcd::EtcdStore;
pub use memory::StaticStore;

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;

/// Read-only view of a distributed key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch `key`.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - key exists (value may be empty)
    /// * `Ok(None)` - key does not exist
    /// * `Err(CycoreError::Store)` - the store could not be queried
    async fn get(&self, key: &str) -> CycoreResult<Option<String>>;
}
