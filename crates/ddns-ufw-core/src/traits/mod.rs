//! Core traits for the sync system
//!
//! This module defines the abstract interfaces the engine is composed from.
//!
//! - [`Resolver`]: Look up the current address of a hostname
//! - [`FirewallGateway`]: Insert and remove tagged allow-rules
//! - [`StateStore`]: Persist the last-known address of each hostname

pub mod firewall;
pub mod resolver;
pub mod state_store;

pub use firewall::FirewallGateway;
pub use resolver::{ResolutionResult, Resolver};
pub use state_store::{HostMap, StateStore};
