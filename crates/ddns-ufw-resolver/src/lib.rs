// # Hickory Resolver
//
// This crate provides a Resolver implementation for the ddns-ufw system,
// backed by hickory-resolver.
//
// ## Behaviour
//
// - One lookup per call against exactly the nameserver the engine names
// - UDP on port 53 with TCP fallback for truncated answers
// - No cache: a fresh resolver is built for every call, so two runs never
//   share an answer
// - No hosts file, no search domains
//
// ## Failure Mapping
//
// | hickory outcome                          | ResolutionFailure  |
// |------------------------------------------|--------------------|
// | NoRecordsFound, rcode NXDOMAIN           | NameNotFound       |
// | NoRecordsFound, rcode NOERROR            | NoRecordOfType     |
// | answer without a record of the asked type| NoRecordOfType     |
// | NoRecordsFound, any other rcode          | TransportFailure   |
// | timeout, I/O, protocol errors            | TransportFailure   |

use async_trait::async_trait;
use ddns_ufw_core::config::ResolverConfig as ResolverSettings;
use ddns_ufw_core::traits::{ResolutionResult, Resolver};
use ddns_ufw_core::{RecordType, ResolutionFailure};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType as WireRecordType};
use std::net::IpAddr;
use std::time::Duration;

/// Standard DNS port
const DNS_PORT: u16 = 53;

/// Hickory-backed resolver
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    /// Timeout of one query attempt
    timeout: Duration,

    /// Attempts before giving up
    attempts: usize,
}

impl HickoryResolver {
    /// Create a new resolver
    ///
    /// # Parameters
    ///
    /// - `timeout`: Timeout of a single query attempt
    /// - `attempts`: Attempts per lookup before a transport failure is reported
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        Self {
            timeout,
            attempts: attempts.max(1),
        }
    }

    /// Create a resolver from the resolver section of the sync configuration
    pub fn from_config(settings: &ResolverSettings) -> Self {
        Self::new(Duration::from_secs(settings.timeout_secs), settings.attempts)
    }

    fn build(&self, nameserver: IpAddr) -> TokioAsyncResolver {
        let name_servers = NameServerConfigGroup::from_ips_clear(&[nameserver], DNS_PORT, true);
        let config = ResolverConfig::from_parts(None, vec![], name_servers);

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = self.attempts;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        TokioAsyncResolver::tokio(config, opts)
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::from_config(&ResolverSettings::default())
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(
        &self,
        hostname: &str,
        record_type: RecordType,
        nameserver: IpAddr,
    ) -> ResolutionResult {
        let resolver = self.build(nameserver);

        let lookup = match resolver.lookup(hostname, wire_record_type(record_type)).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::debug!("Lookup of {} via {} failed: {}", hostname, nameserver, e);
                return Err(Failure::from(&e).into_resolution_failure(
                    hostname,
                    record_type,
                    nameserver,
                ));
            }
        };

        let address = lookup.iter().find_map(|rdata| match (record_type, rdata) {
            (RecordType::A, RData::A(a)) => Some(a.0.to_string()),
            (RecordType::Aaaa, RData::AAAA(aaaa)) => Some(aaaa.0.to_string()),
            _ => None,
        });

        match address {
            Some(address) => {
                tracing::debug!("{} {} resolved to {}", hostname, record_type, address);
                Ok(address)
            }
            None => Err(Failure::NoRecordOfType.into_resolution_failure(
                hostname,
                record_type,
                nameserver,
            )),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "hickory"
    }
}

fn wire_record_type(record_type: RecordType) -> WireRecordType {
    match record_type {
        RecordType::A => WireRecordType::A,
        RecordType::Aaaa => WireRecordType::AAAA,
    }
}

/// Failure kind before the query context is attached
#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    NameNotFound,
    NoRecordOfType,
    Transport(String),
}

impl Failure {
    fn from_response_code(code: ResponseCode) -> Self {
        match code {
            ResponseCode::NXDomain => Failure::NameNotFound,
            ResponseCode::NoError => Failure::NoRecordOfType,
            ResponseCode::ServFail => Failure::Transport("server returned general failure".into()),
            ResponseCode::Refused => Failure::Transport("server refused query".into()),
            ResponseCode::FormErr => {
                Failure::Transport("server claims query was malformed".into())
            }
            other => Failure::Transport(format!("unexpected response code {}", other)),
        }
    }

    fn into_resolution_failure(
        self,
        hostname: &str,
        record_type: RecordType,
        nameserver: IpAddr,
    ) -> ResolutionFailure {
        let hostname = hostname.to_string();
        let nameserver = nameserver.to_string();
        match self {
            Failure::NameNotFound => ResolutionFailure::NameNotFound {
                hostname,
                nameserver,
            },
            Failure::NoRecordOfType => ResolutionFailure::NoRecordOfType {
                hostname,
                record_type: record_type.to_string(),
                nameserver,
            },
            Failure::Transport(reason) => ResolutionFailure::TransportFailure {
                hostname,
                nameserver,
                reason,
            },
        }
    }
}

impl From<&ResolveError> for Failure {
    fn from(e: &ResolveError) -> Self {
        match e.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                Failure::from_response_code(*response_code)
            }
            ResolveErrorKind::Timeout => Failure::Transport("request timed out".into()),
            _ => Failure::Transport(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nxdomain_is_name_not_found() {
        assert_eq!(
            Failure::from_response_code(ResponseCode::NXDomain),
            Failure::NameNotFound
        );
    }

    #[test]
    fn empty_noerror_answer_is_no_record_of_type() {
        assert_eq!(
            Failure::from_response_code(ResponseCode::NoError),
            Failure::NoRecordOfType
        );
    }

    #[test]
    fn server_side_errors_are_transport_failures() {
        for code in [ResponseCode::ServFail, ResponseCode::Refused, ResponseCode::NotImp] {
            assert!(matches!(
                Failure::from_response_code(code),
                Failure::Transport(_)
            ));
        }
    }

    #[test]
    fn timeout_error_is_transport_failure() {
        let error = ResolveError::from(ResolveErrorKind::Timeout);
        assert_eq!(
            Failure::from(&error),
            Failure::Transport("request timed out".into())
        );
    }

    #[test]
    fn context_is_attached_to_failures() {
        let nameserver: IpAddr = "8.8.8.8".parse().unwrap();
        let failure =
            Failure::NoRecordOfType.into_resolution_failure("my.ddns.com", RecordType::Aaaa, nameserver);
        assert_eq!(
            failure,
            ResolutionFailure::NoRecordOfType {
                hostname: "my.ddns.com".to_string(),
                record_type: "AAAA".to_string(),
                nameserver: "8.8.8.8".to_string(),
            }
        );
        assert_eq!(
            failure.to_string(),
            "no AAAA record found for 'my.ddns.com' at 8.8.8.8"
        );
    }

    #[test]
    fn record_types_map_to_wire_types() {
        assert_eq!(wire_record_type(RecordType::A), WireRecordType::A);
        assert_eq!(wire_record_type(RecordType::Aaaa), WireRecordType::AAAA);
    }

    #[tokio::test]
    async fn unreachable_nameserver_is_transport_failure() {
        // TEST-NET-1 is never routed; the query can only time out or fail to send
        let resolver = HickoryResolver::new(Duration::from_millis(300), 1);
        let nameserver: IpAddr = "192.0.2.1".parse().unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            resolver.resolve("my.ddns.com", RecordType::A, nameserver),
        )
        .await
        .expect("resolver honours its own timeout");

        let failure = tokio_test::assert_err!(result);
        assert!(
            matches!(failure, ResolutionFailure::TransportFailure { .. }),
            "got {:?}",
            failure
        );
    }
}
