//! Error types for the sync system
//!
//! Every fallible collaborator operation has its own tagged error type so the
//! engine has to handle each failure kind by name:
//!
//! - [`ResolutionFailure`]: the resolver could not produce an address
//! - [`StateReadError`]: the persisted snapshot could not be read
//! - [`StateWriteError`]: the persisted snapshot could not be replaced
//! - [`GatewayError`]: a firewall rule could not be inserted or removed
//!
//! [`Error`] covers everything outside the per-invocation contract
//! (configuration, state directory setup).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crate-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for setup and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The directory holding the state file could not be created
    #[error("Failed to create state directory {}: {source}", .path.display())]
    StateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Why a resolver produced no address
///
/// None of these may ever be turned into an "empty" address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The domain does not exist (NXDOMAIN)
    #[error("domain '{hostname}' does not exist at {nameserver}")]
    NameNotFound { hostname: String, nameserver: String },

    /// The domain exists but has no record of the requested type
    #[error("no {record_type} record found for '{hostname}' at {nameserver}")]
    NoRecordOfType {
        hostname: String,
        record_type: String,
        nameserver: String,
    },

    /// Timeout, unreachable nameserver, server failure or malformed response
    #[error("lookup of '{hostname}' via {nameserver} failed: {reason}")]
    TransportFailure {
        hostname: String,
        nameserver: String,
        reason: String,
    },
}

impl ResolutionFailure {
    /// Short tag for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionFailure::NameNotFound { .. } => "NXDOMAIN",
            ResolutionFailure::NoRecordOfType { .. } => "NOANSWER",
            ResolutionFailure::TransportFailure { .. } => "TRANSPORT",
        }
    }
}

/// Failure to read the persisted snapshot
///
/// A missing snapshot is not an error; stores return an empty mapping.
#[derive(Error, Debug)]
pub enum StateReadError {
    /// The snapshot exists but is not a valid mapping
    #[error("state file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot exists but could not be read
    #[error("failed to read state file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to replace the persisted snapshot
///
/// When any of these is returned the previous snapshot is still in place.
#[derive(Error, Debug)]
pub enum StateWriteError {
    /// The current snapshot could not be re-read before merging
    #[error("refusing to save, state could not be re-read: {0}")]
    Reload(#[source] StateReadError),

    /// The merged mapping could not be encoded
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A corrupt snapshot could not be copied aside, so it was left in place
    #[error("refusing to replace corrupt state file {}, no copy could be kept: {source}", .path.display())]
    Quarantine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing, syncing or renaming the new snapshot failed
    #[error("failed to write state file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a firewall gateway operation
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The allow-rule could not be inserted
    #[error("unable to add {address} ({tag}) to firewall: {reason}")]
    InsertFailed {
        address: String,
        tag: String,
        reason: String,
    },

    /// The allow-rule could not be removed
    #[error("unable to delete {address} ({tag}) from firewall: {reason}")]
    RemoveFailed {
        address: String,
        tag: String,
        reason: String,
    },

    /// The address is not an IP literal, nothing was executed
    #[error("refusing firewall rule for non-IP address '{0}'")]
    InvalidAddress(String),

    /// The firewall tool could not be started at all
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
