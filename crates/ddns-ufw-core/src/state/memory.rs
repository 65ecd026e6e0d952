// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Useful when the engine is embedded in a long-running process that keeps its
// own lifecycle, and for tests. Nothing survives the process, so the first run
// treats every host as never seen before.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StateReadError, StateWriteError};
use crate::traits::state_store::{HostMap, StateStore};

/// In-memory state store implementation
///
/// Clones share the same mapping.
///
/// # Example
///
/// ```rust
/// use ddns_ufw_core::state::MemoryStateStore;
/// use ddns_ufw_core::traits::{HostMap, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     let mut updates = HostMap::new();
///     updates.insert("my.ddns.com".to_string(), "203.0.113.9".to_string());
///     store.merge_and_save(&updates).await?;
///
///     assert_eq!(store.load().await?, updates);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HostMap>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `snapshot`
    pub fn with_snapshot(snapshot: HostMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<HostMap, StateReadError> {
        Ok(self.inner.read().await.clone())
    }

    async fn merge_and_save(&self, updates: &HostMap) -> Result<(), StateWriteError> {
        let mut guard = self.inner.write().await;
        for (hostname, address) in updates {
            guard.insert(hostname.clone(), address.clone());
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
