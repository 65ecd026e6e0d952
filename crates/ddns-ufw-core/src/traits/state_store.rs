// # State Store Trait
//
// Defines the interface for persistent state management.
//
// ## Purpose
//
// The state store remembers the last-known address of every tracked hostname
// so that a run can tell whether the host moved since the previous run.
//
// ## Snapshot Semantics
//
// - The whole mapping is read and written as one snapshot
// - A missing snapshot is an empty mapping, not an error
// - A corrupt snapshot is reported, never partially returned
// - A save replaces the snapshot all-or-nothing

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{StateReadError, StateWriteError};

/// Hostname → last-known address
pub type HostMap = BTreeMap<String, String>;

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O on its own backing resource
/// - ✅ Replace the snapshot atomically
///
/// ## Forbidden Capabilities
/// - ❌ Decide whether a host changed (owned by `SyncEngine`)
/// - ❌ Touch the firewall (owned by `FirewallGateway`)
/// - ❌ Cache a snapshot across calls
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the full persisted snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(HostMap)`: The snapshot, empty if nothing was persisted yet
    /// - `Err(StateReadError::Corrupt)`: The snapshot exists but cannot be parsed
    /// - `Err(StateReadError::Io)`: The snapshot exists but cannot be read
    async fn load(&self) -> Result<HostMap, StateReadError>;

    /// Re-read the snapshot, overwrite the keys in `updates`, and replace it
    ///
    /// On error the previously persisted snapshot is left untouched.
    async fn merge_and_save(&self, updates: &HostMap) -> Result<(), StateWriteError>;

    /// Get the store name (for logging)
    fn store_name(&self) -> &'static str;
}
