// # Resolver Trait
//
// Defines the interface for looking up the current address of a hostname.
//
// ## Implementations
//
// - Hickory: `ddns-ufw-resolver` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_ufw_core::{RecordType, Resolver};
//
// let resolver = /* Resolver implementation */;
// match resolver.resolve("my.ddns.com", RecordType::A, "8.8.8.8".parse()?).await {
//     Ok(address) => println!("{address}"),
//     Err(failure) => eprintln!("{failure}"),
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::RecordType;
use crate::error::ResolutionFailure;

/// Outcome of a single lookup: the textual address, or why there is none
pub type ResolutionResult = Result<String, ResolutionFailure>;

/// Trait for resolver implementations
///
/// # Contract
///
/// - One lookup per call, no retry loop across calls and no caching
/// - Never panics; every failure is one of the [`ResolutionFailure`] kinds
/// - On success, returns the first address record of the answer in its
///   canonical textual form
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname` against `nameserver`
    ///
    /// # Parameters
    ///
    /// - `hostname`: The name to look up
    /// - `record_type`: Which address record to ask for
    /// - `nameserver`: The server to query
    async fn resolve(
        &self,
        hostname: &str,
        record_type: RecordType,
        nameserver: IpAddr,
    ) -> ResolutionResult;

    /// Get the resolver name (for logging)
    fn resolver_name(&self) -> &'static str;
}
