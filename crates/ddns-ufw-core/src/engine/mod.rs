//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Resolving the current address of one hostname via Resolver
//! - Comparing it with the last-known address from StateStore
//! - Replacing the firewall allow-rule via FirewallGateway
//! - Committing the new address to StateStore
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────┐
//!   SyncTarget ─────────▶│  SyncEngine  │───────▶ SyncOutcome
//!                        └──────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//! ┌─────────────┐        ┌──────────────┐       ┌─────────────────┐
//! │  Resolver   │        │  StateStore  │       │ FirewallGateway │
//! │  (lookup)   │        │ (load/save)  │       │ (remove/insert) │
//! └─────────────┘        └──────────────┘       └─────────────────┘
//! ```
//!
//! ## Invocation Flow
//!
//! `Start → Resolved → Compared → {NoChange | Updated | Failed}`
//!
//! 1. Resolve. Any failure ends the run as `Failed` before anything is touched
//! 2. Load the previous address (`None` when never seen)
//! 3. Equal strings end the run as `NoChange`
//! 4. Otherwise remove the old rule, insert the new one, commit the address.
//!    Failures in this phase are logged and the remaining steps still run

use std::fmt;
use std::net::IpAddr;

use crate::config::{RecordType, SyncConfig};
use crate::error::{ResolutionFailure, Result};
use crate::traits::{FirewallGateway, HostMap, Resolver, StateStore};
use tracing::{debug, error, info, warn};

/// What to synchronize in one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Hostname to track, also used as the firewall rule tag
    pub hostname: String,
    /// Nameserver override; the configured default is used when `None`
    pub nameserver: Option<IpAddr>,
}

impl SyncTarget {
    /// Create a target that uses the default nameserver
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            nameserver: None,
        }
    }

    /// Query `nameserver` instead of the default
    pub fn with_nameserver(mut self, nameserver: IpAddr) -> Self {
        self.nameserver = Some(nameserver);
        self
    }
}

/// Comparison of a fresh resolution with the recorded address
///
/// Derived on every invocation and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDecision {
    pub hostname: String,
    pub previous_address: Option<String>,
    pub new_address: String,
    pub changed: bool,
}

impl SyncDecision {
    /// Compare by exact string equality; no address normalization
    pub fn compute(
        hostname: impl Into<String>,
        previous_address: Option<String>,
        new_address: impl Into<String>,
    ) -> Self {
        let new_address = new_address.into();
        let changed = previous_address.as_deref() != Some(new_address.as_str());
        Self {
            hostname: hostname.into(),
            previous_address,
            new_address,
            changed,
        }
    }
}

/// Result of one mutation step during an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Step not needed (no previous rule to remove)
    Skipped,
    /// Step completed
    Done,
    /// Step failed; the message was logged
    Failed(String),
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

/// What happened during the `Updated` branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub decision: SyncDecision,
    pub rule_removed: StepStatus,
    pub rule_inserted: StepStatus,
    pub state_committed: StepStatus,
}

impl UpdateReport {
    /// True when every step either completed or was not needed
    pub fn is_clean(&self) -> bool {
        !self.rule_removed.is_failed()
            && !self.rule_inserted.is_failed()
            && !self.state_committed.is_failed()
    }
}

/// Terminal state of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Resolved address equals the recorded one; nothing was mutated
    NoChange { hostname: String, address: String },

    /// Address differs (or was never seen); mutations were attempted
    Updated(UpdateReport),

    /// No address could be resolved; nothing was mutated
    Failed {
        hostname: String,
        failure: ResolutionFailure,
    },
}

impl SyncOutcome {
    pub fn hostname(&self) -> &str {
        match self {
            SyncOutcome::NoChange { hostname, .. } => hostname,
            SyncOutcome::Updated(report) => &report.decision.hostname,
            SyncOutcome::Failed { hostname, .. } => hostname,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::NoChange { hostname, address } => {
                write!(f, "{} unchanged at {}", hostname, address)
            }
            SyncOutcome::Updated(report) => write!(
                f,
                "{} changed {} -> {}",
                report.decision.hostname,
                report.decision.previous_address.as_deref().unwrap_or("<none>"),
                report.decision.new_address
            ),
            SyncOutcome::Failed { hostname, failure } => {
                write!(f, "{} not synchronized: {}", hostname, failure)
            }
        }
    }
}

/// Core sync engine
///
/// One engine value may serve many invocations, but it keeps no state between
/// them: every [`SyncEngine::sync`] call reads the store afresh and writes it
/// at most once.
pub struct SyncEngine {
    /// Resolver for the current address
    resolver: Box<dyn Resolver>,

    /// Firewall gateway for rule mutation
    gateway: Box<dyn FirewallGateway>,

    /// State store holding last-known addresses
    state_store: Box<dyn StateStore>,

    /// Nameserver used when the target names none
    default_nameserver: IpAddr,

    /// Record type to resolve
    record_type: RecordType,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: Resolver implementation
    /// - `gateway`: Firewall gateway implementation
    /// - `state_store`: State store implementation
    /// - `config`: Sync configuration
    pub fn new(
        resolver: Box<dyn Resolver>,
        gateway: Box<dyn FirewallGateway>,
        state_store: Box<dyn StateStore>,
        config: &SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            resolver,
            gateway,
            state_store,
            default_nameserver: config.default_nameserver,
            record_type: config.record_type,
        })
    }

    /// Run one synchronization for `target`
    pub async fn sync(&self, target: &SyncTarget) -> SyncOutcome {
        let hostname = target.hostname.as_str();
        let nameserver = target.nameserver.unwrap_or(self.default_nameserver);

        debug!(
            "Resolving {} {} via {} ({})",
            hostname,
            self.record_type,
            nameserver,
            self.resolver.resolver_name()
        );

        let new_address = match self
            .resolver
            .resolve(hostname, self.record_type, nameserver)
            .await
        {
            Ok(address) => address,
            Err(failure) => {
                error!("Cannot retrieve IP for {} [{}]: {}", hostname, failure.kind(), failure);
                return SyncOutcome::Failed {
                    hostname: hostname.to_string(),
                    failure,
                };
            }
        };

        let previous_address = self.load_previous(hostname).await;
        let decision = SyncDecision::compute(hostname, previous_address, new_address);

        if !decision.changed {
            info!("{} unchanged at {}", hostname, decision.new_address);
            return SyncOutcome::NoChange {
                hostname: decision.hostname,
                address: decision.new_address,
            };
        }

        SyncOutcome::Updated(self.apply(decision).await)
    }

    /// Last-known address, degrading unreadable state to "never seen"
    async fn load_previous(&self, hostname: &str) -> Option<String> {
        match self.state_store.load().await {
            Ok(snapshot) => snapshot.get(hostname).cloned(),
            Err(e) => {
                warn!(
                    "{}. Treating {} state as empty for this run.",
                    e,
                    self.state_store.store_name()
                );
                None
            }
        }
    }

    /// Remove the old rule, insert the new one, commit the new address
    async fn apply(&self, decision: SyncDecision) -> UpdateReport {
        let hostname = decision.hostname.as_str();
        let new_address = decision.new_address.as_str();

        info!(
            "{} changed: {} -> {}",
            hostname,
            decision.previous_address.as_deref().unwrap_or("<none>"),
            new_address
        );

        let rule_removed = match decision.previous_address.as_deref() {
            Some(old_address) => match self.gateway.allow_remove(old_address, hostname).await {
                Ok(()) => {
                    info!("Removed allow-rule for {} ({})", old_address, hostname);
                    StepStatus::Done
                }
                Err(e) => {
                    error!("{}", e);
                    StepStatus::Failed(e.to_string())
                }
            },
            None => StepStatus::Skipped,
        };

        let rule_inserted = match self.gateway.allow_insert(new_address, hostname).await {
            Ok(()) => {
                info!("Added allow-rule for {} ({})", new_address, hostname);
                StepStatus::Done
            }
            Err(e) => {
                error!("{}", e);
                StepStatus::Failed(e.to_string())
            }
        };

        let mut updates = HostMap::new();
        updates.insert(hostname.to_string(), new_address.to_string());
        let state_committed = match self.state_store.merge_and_save(&updates).await {
            Ok(()) => {
                info!("New IP {} written to state", new_address);
                StepStatus::Done
            }
            Err(e) => {
                error!("Failed to record {} for {}: {}", new_address, hostname, e);
                StepStatus::Failed(e.to_string())
            }
        };

        UpdateReport {
            decision,
            rule_removed,
            rule_inserted,
            state_committed,
        }
    }
}
