//! Configuration types for the sync system
//!
//! Process-wide defaults (nameserver, state file, record type) live here and
//! are handed to the engine at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

/// Default public resolver queried when the caller names none
pub const DEFAULT_NAMESERVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Default state snapshot path, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "ips.json";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Nameserver used when the target does not name one
    #[serde(default = "default_nameserver")]
    pub default_nameserver: IpAddr,

    /// Record type to track
    #[serde(default)]
    pub record_type: RecordType,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Firewall gateway settings
    #[serde(default)]
    pub firewall: FirewallConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            default_nameserver: default_nameserver(),
            record_type: RecordType::default(),
            state_store: StateStoreConfig::default(),
            resolver: ResolverConfig::default(),
            firewall: FirewallConfig::default(),
        }
    }

    /// Set the default nameserver
    pub fn with_default_nameserver(mut self, nameserver: IpAddr) -> Self {
        self.default_nameserver = nameserver;
        self
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_nameserver.is_unspecified() {
            return Err(crate::Error::config(
                "Default nameserver cannot be an unspecified address",
            ));
        }

        self.state_store.validate()?;
        self.resolver.validate()?;
        self.firewall.validate()?;

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// DNS record type to track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// A record (IPv4)
    #[default]
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            _ => Err(crate::Error::config(format!(
                "Unsupported record type '{}'. Supported: A, AAAA",
                s
            ))),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// JSON snapshot file
    File {
        /// Path to the state file
        path: PathBuf,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("State file path cannot be empty"));
                }
                Ok(())
            }
            StateStoreConfig::Memory => Ok(()),
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Timeout of a single query attempt (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per query before reporting a transport failure
    #[serde(default = "default_resolve_attempts")]
    pub attempts: usize,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Resolver timeout must be between 1 and 60 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        if !(1..=5).contains(&self.attempts) {
            return Err(crate::Error::config(format!(
                "Resolver attempts must be between 1 and 5. Got: {}",
                self.attempts
            )));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_resolve_timeout_secs(),
            attempts: default_resolve_attempts(),
        }
    }
}

/// Firewall gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Firewall executable
    #[serde(default = "default_firewall_binary")]
    pub binary: String,

    /// Run the firewall executable through `sudo`
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,

    /// Log the commands instead of running them
    #[serde(default)]
    pub dry_run: bool,
}

impl FirewallConfig {
    /// Validate the firewall configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.binary.trim().is_empty() {
            return Err(crate::Error::config("Firewall binary cannot be empty"));
        }
        Ok(())
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            binary: default_firewall_binary(),
            use_sudo: default_use_sudo(),
            dry_run: false,
        }
    }
}

fn default_nameserver() -> IpAddr {
    DEFAULT_NAMESERVER
}

fn default_resolve_timeout_secs() -> u64 {
    5
}

fn default_resolve_attempts() -> usize {
    2
}

fn default_firewall_binary() -> String {
    "ufw".to_string()
}

fn default_use_sudo() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.default_nameserver, IpAddr::from([8, 8, 8, 8]));
        assert_eq!(config.record_type, RecordType::A);
        assert!(config.firewall.use_sudo);
        assert!(!config.firewall.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn record_type_parses_case_insensitively() {
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!("A".parse::<RecordType>().unwrap(), RecordType::A);
        assert!("MX".parse::<RecordType>().is_err());
    }

    #[test]
    fn partial_json_config_fills_defaults() {
        let config: SyncConfig = serde_json::from_str(
            r#"{ "record_type": "AAAA", "state_store": { "type": "memory" } }"#,
        )
        .unwrap();
        assert_eq!(config.record_type, RecordType::Aaaa);
        assert!(matches!(config.state_store, StateStoreConfig::Memory));
        assert_eq!(config.resolver.attempts, 2);
    }

    #[test]
    fn out_of_range_resolver_settings_are_rejected() {
        let mut config = SyncConfig::default();
        config.resolver.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.firewall.binary = " ".to_string();
        assert!(config.validate().is_err());
    }
}
