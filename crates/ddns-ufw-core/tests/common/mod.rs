//! Test doubles and common utilities for sync contract tests
//!
//! Every double records its calls in shared state so a test can keep a clone
//! after boxing the original into the engine.

#![allow(dead_code)]

use ddns_ufw_core::error::{GatewayError, ResolutionFailure, StateReadError, StateWriteError};
use ddns_ufw_core::traits::{FirewallGateway, HostMap, ResolutionResult, Resolver, StateStore};
use ddns_ufw_core::{MemoryStateStore, RecordType, SyncConfig, SyncEngine};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A resolver that returns a scripted answer
#[derive(Clone)]
pub struct ScriptedResolver {
    answer: Arc<Mutex<ResolutionResult>>,
    calls: Arc<Mutex<Vec<(String, RecordType, IpAddr)>>>,
}

impl ScriptedResolver {
    /// Resolver that always answers `address`
    pub fn answering(address: &str) -> Self {
        Self::with_result(Ok(address.to_string()))
    }

    /// Resolver that always fails with `failure`
    pub fn failing(failure: ResolutionFailure) -> Self {
        Self::with_result(Err(failure))
    }

    fn with_result(answer: ResolutionResult) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Change the answer for subsequent calls
    pub fn set_answer(&self, address: &str) {
        *self.answer.lock().unwrap() = Ok(address.to_string());
    }

    /// Every (hostname, record type, nameserver) this resolver was asked for
    pub fn calls(&self) -> Vec<(String, RecordType, IpAddr)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(
        &self,
        hostname: &str,
        record_type: RecordType,
        nameserver: IpAddr,
    ) -> ResolutionResult {
        self.calls
            .lock()
            .unwrap()
            .push((hostname.to_string(), record_type, nameserver));
        self.answer.lock().unwrap().clone()
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// One call received by [`RecordingGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Insert { address: String, tag: String },
    Remove { address: String, tag: String },
}

impl GatewayCall {
    pub fn insert(address: &str, tag: &str) -> Self {
        GatewayCall::Insert {
            address: address.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn remove(address: &str, tag: &str) -> Self {
        GatewayCall::Remove {
            address: address.to_string(),
            tag: tag.to_string(),
        }
    }
}

/// A firewall gateway that records calls in order and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    fail_insert: Arc<AtomicBool>,
    fail_remove: Arc<AtomicBool>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Calls in the order they were received
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FirewallGateway for RecordingGateway {
    async fn allow_insert(&self, address: &str, tag: &str) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::insert(address, tag));
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(GatewayError::InsertFailed {
                address: address.to_string(),
                tag: tag.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }

    async fn allow_remove(&self, address: &str, tag: &str) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::remove(address, tag));
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(GatewayError::RemoveFailed {
                address: address.to_string(),
                tag: tag.to_string(),
                reason: "Could not delete non-existent rule".to_string(),
            });
        }
        Ok(())
    }

    fn gateway_name(&self) -> &'static str {
        "recording"
    }
}

/// A state store over [`MemoryStateStore`] that counts calls and can misbehave
#[derive(Clone, Default)]
pub struct CountingStateStore {
    inner: MemoryStateStore,
    load_count: Arc<AtomicUsize>,
    save_count: Arc<AtomicUsize>,
    corrupt: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl CountingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one `hostname → address` record
    pub fn with_record(hostname: &str, address: &str) -> Self {
        let mut snapshot = HostMap::new();
        snapshot.insert(hostname.to_string(), address.to_string());
        Self {
            inner: MemoryStateStore::with_snapshot(snapshot),
            ..Self::default()
        }
    }

    /// Make `load()` report a corrupt snapshot
    pub fn corrupt(&self, corrupt: bool) {
        self.corrupt.store(corrupt, Ordering::SeqCst);
    }

    /// Make `merge_and_save()` fail without changing anything
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Current contents, bypassing the counters
    pub async fn snapshot(&self) -> HostMap {
        self.inner.load().await.unwrap()
    }
}

#[async_trait::async_trait]
impl StateStore for CountingStateStore {
    async fn load(&self) -> Result<HostMap, StateReadError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.corrupt.load(Ordering::SeqCst) {
            let source = serde_json::from_str::<HostMap>("{").unwrap_err();
            return Err(StateReadError::Corrupt {
                path: "ips.json".into(),
                source,
            });
        }
        self.inner.load().await
    }

    async fn merge_and_save(&self, updates: &HostMap) -> Result<(), StateWriteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateWriteError::Io {
                path: "ips.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.merge_and_save(updates).await?;
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "counting"
    }
}

/// Configuration used by the contract tests
pub fn test_config() -> SyncConfig {
    SyncConfig::default()
}

/// Build an engine from clones of the given doubles
pub fn engine_with(
    resolver: &ScriptedResolver,
    gateway: &RecordingGateway,
    store: &CountingStateStore,
) -> SyncEngine {
    SyncEngine::new(
        Box::new(resolver.clone()),
        Box::new(gateway.clone()),
        Box::new(store.clone()),
        &test_config(),
    )
    .expect("engine construction succeeds")
}
