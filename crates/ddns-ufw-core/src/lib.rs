// # ddns-ufw-core
//
// Core library for keeping firewall allow-rules in sync with dynamic DNS hosts.
//
// ## Architecture Overview
//
// - **Resolver**: Trait for looking up the current address of a hostname
// - **FirewallGateway**: Trait for inserting and removing tagged allow-rules
// - **StateStore**: Trait for the persisted hostname → address snapshot
// - **SyncEngine**: Core engine that decides whether a host moved and drives
//   the firewall and state mutations that follow
//
// ## Design Principles
//
// 1. **Fail Closed**: No address means no mutation, ever
// 2. **Single Shot**: One resolution, at most two rule changes and one save per run
// 3. **Library-First**: Concrete resolvers and gateways live in their own crates
// 4. **Idempotency**: A second run against an unchanged host does nothing

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{RecordType, SyncConfig};
pub use engine::{StepStatus, SyncDecision, SyncEngine, SyncOutcome, SyncTarget, UpdateReport};
pub use error::{
    Error, GatewayError, ResolutionFailure, Result, StateReadError, StateWriteError,
};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{FirewallGateway, HostMap, ResolutionResult, Resolver, StateStore};
