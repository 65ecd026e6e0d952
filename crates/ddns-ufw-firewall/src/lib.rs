// # UFW Firewall Gateway
//
// This crate provides a FirewallGateway implementation that drives the
// Uncomplicated Firewall command line tool.
//
// ## Commands
//
// - insert: `[sudo] ufw allow from <address> to any comment <tag>`
// - remove: `[sudo] ufw delete allow from <address> to any comment <tag>`
//
// The exit status of the command decides success. Arguments are passed
// directly to the process, never through a shell.
//
// ## Architectural Constraints
//
// - Single-shot: one command per call, no retries (re-invocation retries)
// - Stateless: no knowledge of the state store or of previous calls
// - The address must be an IP literal before anything is executed
//
// ## Dry-Run Mode
//
// When `dry_run` is true the gateway logs the exact command line it would run
// and reports success without executing anything.

use async_trait::async_trait;
use ddns_ufw_core::config::FirewallConfig;
use ddns_ufw_core::error::GatewayError;
use ddns_ufw_core::traits::FirewallGateway;
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

/// Privilege escalation helper prepended when `use_sudo` is set
const SUDO: &str = "sudo";

/// Which rule mutation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    Allow,
    Delete,
}

/// UFW-backed firewall gateway
#[derive(Debug, Clone)]
pub struct UfwGateway {
    /// Firewall executable
    binary: String,

    /// Prefix commands with `sudo`
    use_sudo: bool,

    /// Log commands instead of running them
    dry_run: bool,
}

impl UfwGateway {
    /// Create a new UFW gateway
    ///
    /// # Parameters
    ///
    /// - `binary`: The `ufw` executable (name on `PATH` or absolute path)
    /// - `use_sudo`: Run through `sudo` (needed unless already root)
    /// - `dry_run`: Log commands instead of running them
    pub fn new(binary: impl Into<String>, use_sudo: bool, dry_run: bool) -> Self {
        Self {
            binary: binary.into(),
            use_sudo,
            dry_run,
        }
    }

    /// Create a gateway from the firewall section of the sync configuration
    pub fn from_config(config: &FirewallConfig) -> Self {
        Self::new(config.binary.clone(), config.use_sudo, config.dry_run)
    }

    /// Full command line, program first
    fn command_line(&self, action: RuleAction, address: &str, tag: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(10);
        if self.use_sudo {
            argv.push(SUDO.to_string());
        }
        argv.push(self.binary.clone());
        if action == RuleAction::Delete {
            argv.push("delete".to_string());
        }
        argv.extend(
            ["allow", "from", address, "to", "any", "comment", tag]
                .iter()
                .map(|s| s.to_string()),
        );
        argv
    }

    /// Run one rule mutation
    async fn run(&self, action: RuleAction, address: &str, tag: &str) -> Result<(), GatewayError> {
        if address.parse::<IpAddr>().is_err() {
            return Err(GatewayError::InvalidAddress(address.to_string()));
        }

        let argv = self.command_line(action, address, tag);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would run: {}", argv.join(" "));
            return Ok(());
        }

        tracing::debug!("Running: {}", argv.join(" "));

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| GatewayError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                tracing::debug!("{}: {}", self.binary, stdout.trim());
            }
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            format!("{} ({})", stderr.trim(), output.status)
        };

        Err(match action {
            RuleAction::Allow => GatewayError::InsertFailed {
                address: address.to_string(),
                tag: tag.to_string(),
                reason,
            },
            RuleAction::Delete => GatewayError::RemoveFailed {
                address: address.to_string(),
                tag: tag.to_string(),
                reason,
            },
        })
    }
}

impl Default for UfwGateway {
    fn default() -> Self {
        Self::from_config(&FirewallConfig::default())
    }
}

#[async_trait]
impl FirewallGateway for UfwGateway {
    async fn allow_insert(&self, address: &str, tag: &str) -> Result<(), GatewayError> {
        self.run(RuleAction::Allow, address, tag).await
    }

    async fn allow_remove(&self, address: &str, tag: &str) -> Result<(), GatewayError> {
        self.run(RuleAction::Delete, address, tag).await
    }

    fn gateway_name(&self) -> &'static str {
        "ufw"
    }
}
