// # ddns-ufw
//
// Keeps a UFW allow-rule in sync with the current address of a dynamic DNS
// hostname. One invocation handles one hostname once; schedule it with cron or
// a systemd timer to keep the rule current.
//
// This binary is a THIN integration layer: it reads arguments and environment
// variables, sets up logging and the runtime, wires the hickory resolver, the
// ufw gateway and the file state store into `SyncEngine`, and maps the outcome
// to an exit code. All decision logic lives in ddns-ufw-core.
//
// ## Usage
//
// ```bash
// ddns-ufw my.ddns.com            # query the default nameserver
// ddns-ufw my.ddns.com 1.1.1.1    # query 1.1.1.1
// ```
//
// ## Configuration
//
// - `DDNS_UFW_STATE_FILE`: State snapshot path (default `ips.json`)
// - `DDNS_UFW_RECORD_TYPE`: `A` or `AAAA` (default `A`)
// - `DDNS_UFW_DEFAULT_NAMESERVER`: Nameserver when none is given (default `8.8.8.8`)
// - `DDNS_UFW_RESOLVE_TIMEOUT_SECS`: Per-query timeout (default 5)
// - `DDNS_UFW_RESOLVE_ATTEMPTS`: Attempts per query (default 2)
// - `DDNS_UFW_SUDO`: Run ufw through sudo (default true)
// - `DDNS_UFW_BINARY`: ufw executable (default `ufw`)
// - `DDNS_UFW_DRY_RUN`: Log firewall commands instead of running them
// - `DDNS_UFW_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Exit Codes
//
// - 0: address unchanged, or updated
// - 1: missing arguments or configuration error
// - 2: the hostname could not be resolved
// - 3: runtime setup failed

use anyhow::{Context, Result};
use ddns_ufw_core::config::{FirewallConfig, ResolverConfig, StateStoreConfig};
use ddns_ufw_core::{
    FileStateStore, MemoryStateStore, RecordType, StateStore, SyncConfig, SyncEngine,
    SyncOutcome, SyncTarget,
};
use ddns_ufw_firewall::UfwGateway;
use ddns_ufw_resolver::HickoryResolver;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the different terminal states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsUfwExitCode {
    /// No change, or the address was updated
    Success = 0,
    /// Missing arguments or configuration error
    ConfigError = 1,
    /// The hostname could not be resolved
    ResolutionFailed = 2,
    /// Runtime setup failed
    RuntimeError = 3,
}

impl From<DdnsUfwExitCode> for ExitCode {
    fn from(code: DdnsUfwExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&SyncOutcome> for DdnsUfwExitCode {
    fn from(outcome: &SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::NoChange { .. } | SyncOutcome::Updated(_) => DdnsUfwExitCode::Success,
            SyncOutcome::Failed { .. } => DdnsUfwExitCode::ResolutionFailed,
        }
    }
}

/// What the positional arguments asked for
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    /// Print usage and exit successfully
    Help,
    /// Print usage and fail
    Usage,
    /// Synchronize one hostname
    Sync {
        hostname: String,
        nameserver: Option<String>,
    },
}

impl Invocation {
    /// Interpret `args` (without the program name)
    fn parse(args: &[String]) -> Self {
        match args {
            [] => Invocation::Usage,
            [flag, ..] if flag == "-h" || flag == "--help" => Invocation::Help,
            [hostname] => Invocation::Sync {
                hostname: hostname.clone(),
                nameserver: None,
            },
            [hostname, nameserver, ..] => Invocation::Sync {
                hostname: hostname.clone(),
                nameserver: Some(nameserver.clone()),
            },
        }
    }
}

fn usage(program: &str) -> String {
    format!(
        "DNS - UFW Updater\n\
         To use, pass the DNS entry as a command-line argument to update UFW rules\n\
         Example:  {program} my.ddns.com\n\
         You can optionally pass a DNS server to use:  {program} my.ddns.com 8.8.8.8"
    )
}

/// Application configuration
struct Config {
    hostname: String,
    nameserver: Option<String>,
    state_file: PathBuf,
    record_type: String,
    default_nameserver: String,
    resolve_timeout_secs: u64,
    resolve_attempts: usize,
    use_sudo: bool,
    ufw_binary: String,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from the positional arguments and environment variables
    fn from_env(hostname: String, nameserver: Option<String>) -> Result<Self> {
        Self::from_vars(hostname, nameserver, |key| env::var(key).ok())
    }

    fn from_vars(
        hostname: String,
        nameserver: Option<String>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            hostname: canonical_hostname(hostname),
            nameserver,
            state_file: var("DDNS_UFW_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(ddns_ufw_core::config::DEFAULT_STATE_FILE)),
            record_type: var("DDNS_UFW_RECORD_TYPE").unwrap_or_else(|| "A".to_string()),
            default_nameserver: var("DDNS_UFW_DEFAULT_NAMESERVER")
                .unwrap_or_else(|| ddns_ufw_core::config::DEFAULT_NAMESERVER.to_string()),
            resolve_timeout_secs: parse_number(&var, "DDNS_UFW_RESOLVE_TIMEOUT_SECS", 5)?,
            resolve_attempts: parse_number(&var, "DDNS_UFW_RESOLVE_ATTEMPTS", 2)?,
            use_sudo: parse_flag(&var, "DDNS_UFW_SUDO", true)?,
            ufw_binary: var("DDNS_UFW_BINARY").unwrap_or_else(|| "ufw".to_string()),
            dry_run: parse_flag(&var, "DDNS_UFW_DRY_RUN", false)?,
            log_level: var("DDNS_UFW_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration and build the engine configuration
    ///
    /// Performs the checks the library cannot: hostname syntax, nameserver
    /// literals and the log level.
    fn validate(&self) -> Result<SyncConfig> {
        validate_domain_name(&self.hostname)?;

        let default_nameserver: IpAddr = self.default_nameserver.parse().map_err(|_| {
            anyhow::anyhow!(
                "DDNS_UFW_DEFAULT_NAMESERVER must be an IP address. Got: {}",
                self.default_nameserver
            )
        })?;

        if let Some(ref nameserver) = self.nameserver {
            nameserver.parse::<IpAddr>().map_err(|_| {
                anyhow::anyhow!("Nameserver must be an IP address. Got: {}", nameserver)
            })?;
        }

        let record_type: RecordType = self.record_type.parse()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_UFW_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        let sync_config = SyncConfig {
            default_nameserver,
            record_type,
            state_store: StateStoreConfig::File {
                path: self.state_file.clone(),
            },
            resolver: ResolverConfig {
                timeout_secs: self.resolve_timeout_secs,
                attempts: self.resolve_attempts,
            },
            firewall: FirewallConfig {
                binary: self.ufw_binary.clone(),
                use_sudo: self.use_sudo,
                dry_run: self.dry_run,
            },
        };
        sync_config.validate()?;

        Ok(sync_config)
    }

    fn target(&self) -> Result<SyncTarget> {
        let target = SyncTarget::new(self.hostname.clone());
        Ok(match self.nameserver {
            Some(ref nameserver) => target.with_nameserver(nameserver.parse()?),
            None => target,
        })
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_flag(var: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match var(key) {
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
        },
        None => Ok(default),
    }
}

/// Drop a single trailing dot so `my.ddns.com.` and `my.ddns.com` share one
/// state entry and one firewall tag
fn canonical_hostname(hostname: String) -> String {
    match hostname.strip_suffix('.') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => hostname,
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; a single trailing dot is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "ddns-ufw".to_string());
    let args: Vec<String> = args.collect();

    let (hostname, nameserver) = match Invocation::parse(&args) {
        Invocation::Help => {
            println!("{}", usage(&program));
            return DdnsUfwExitCode::Success.into();
        }
        Invocation::Usage => {
            println!("{}", usage(&program));
            return DdnsUfwExitCode::ConfigError.into();
        }
        Invocation::Sync {
            hostname,
            nameserver,
        } => (hostname, nameserver),
    };

    let config = match Config::from_env(hostname, nameserver) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsUfwExitCode::ConfigError.into();
        }
    };

    let sync_config = match config.validate() {
        Ok(sync_config) => sync_config,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DdnsUfwExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsUfwExitCode::ConfigError.into();
    }

    // Every step is awaited in sequence; a single thread is all this needs
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsUfwExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_once(&config, &sync_config).await {
            Ok(outcome) => {
                info!("{}", outcome);
                DdnsUfwExitCode::from(&outcome)
            }
            Err(e) => {
                error!("Setup error: {:#}", e);
                DdnsUfwExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wire the concrete collaborators and run one synchronization
async fn run_once(config: &Config, sync_config: &SyncConfig) -> Result<SyncOutcome> {
    let state_store: Box<dyn StateStore> = match &sync_config.state_store {
        StateStoreConfig::File { path } => Box::new(
            FileStateStore::new(path)
                .await
                .with_context(|| format!("opening state file {}", path.display()))?,
        ),
        StateStoreConfig::Memory => Box::new(MemoryStateStore::new()),
    };

    let resolver = HickoryResolver::from_config(&sync_config.resolver);
    let gateway = UfwGateway::from_config(&sync_config.firewall);

    if sync_config.firewall.dry_run {
        info!("Dry-run mode: firewall commands will be logged, not executed");
    }

    let engine = SyncEngine::new(
        Box::new(resolver),
        Box::new(gateway),
        state_store,
        sync_config,
    )?;

    Ok(engine.sync(&config.target()?).await)
}
