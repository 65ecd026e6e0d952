// # Firewall Gateway Trait
//
// Defines the interface for mutating host firewall allow-rules.
//
// ## Implementations
//
// - UFW: `ddns-ufw-firewall` crate
//
// Rules are identified by (address, tag). The engine always uses the tracked
// hostname as tag, so a rule can be found and removed once the host moves.

use async_trait::async_trait;

use crate::error::GatewayError;

/// Trait for firewall gateway implementations
///
/// # Contract
///
/// - Single-shot: one firewall mutation per call, no retries
/// - No state: the gateway never decides whether a rule is needed
/// - Failures are returned, never panicked; the engine logs and continues
#[async_trait]
pub trait FirewallGateway: Send + Sync {
    /// Allow inbound traffic from `address`, tagged with `tag`
    async fn allow_insert(&self, address: &str, tag: &str) -> Result<(), GatewayError>;

    /// Remove the allow-rule for `address` tagged with `tag`
    async fn allow_remove(&self, address: &str, tag: &str) -> Result<(), GatewayError>;

    /// Get the gateway name (for logging)
    fn gateway_name(&self) -> &'static str;
}
