//! Hub-wide configuration, read from the environment: explicit defaults,
//! builder methods, no global statics.

use std::net::IpAddr;
use std::time::Duration;

/// `$SAMP_HUB` — if it begins with `std-lockurl:`, the remainder overrides
/// lockfile discovery (§6).
pub const ENV_SAMP_HUB: &str = "SAMP_HUB";
const SAMP_HUB_LOCKURL_PREFIX: &str = "std-lockurl:";

/// Override for the loopback hostname embedded in URLs (§6).
pub const ENV_LOCALHOST_OVERRIDE: &str = "SAMP_LOCALHOST";

/// Maximum concurrent registrations (§5).
pub const DEFAULT_MAX_CLIENTS: usize = 4096;
/// Maximum pending Web Profile pull-queue entries per client (§4.6/§5).
pub const DEFAULT_MAX_PENDING_QUEUE: usize = 4096;
/// Maximum concurrent callback deliveries per target client (§5).
pub const DEFAULT_MAX_CALLBACK_CONCURRENCY: usize = 16;
/// Default bounded HTTP worker pool size (§5).
pub const DEFAULT_HTTP_WORKERS: usize = 20;
/// Default outbound callback transport timeout (§5).
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);
/// Grace period the hub drains in-flight deliveries for during shutdown
/// (§4.4 "Shutdown").
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Hub-wide configuration, independent of which profile(s) are active.
///
/// A plain struct with a `Default` impl and a fluent builder, constructed
/// once at startup and handed by reference to the hub and to each profile.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of simultaneously registered clients.
    pub max_clients: usize,
    /// Maximum pending Web pull-queue entries before the oldest are dropped.
    pub max_pending_queue: usize,
    /// Maximum concurrent outbound callback deliveries per recipient.
    pub max_callback_concurrency: usize,
    /// Bounded HTTP worker pool size for profiles that serve HTTP.
    pub http_workers: usize,
    /// Connect/read timeout for outbound callback deliveries.
    pub callback_timeout: Duration,
    /// How long shutdown waits for in-flight deliveries to drain.
    pub shutdown_grace: Duration,
    /// Loopback hostname to embed in URLs (lockfile, Web Profile base URL).
    pub localhost_override: Option<LocalhostOverride>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            max_pending_queue: DEFAULT_MAX_PENDING_QUEUE,
            max_callback_concurrency: DEFAULT_MAX_CALLBACK_CONCURRENCY,
            http_workers: DEFAULT_HTTP_WORKERS,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            localhost_override: None,
        }
    }
}

impl HubConfig {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the process environment (`$SAMP_HUB`'s
    /// non-lockurl-override case is handled by [`LockUrlOverride::from_env`]
    /// separately; this only reads the localhost override).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var(ENV_LOCALHOST_OVERRIDE) {
            if !raw.is_empty() {
                cfg.localhost_override = Some(LocalhostOverride::parse(&raw));
            }
        }
        cfg
    }

    /// Builder-style setter for `max_clients`.
    #[must_use]
    pub fn with_max_clients(mut self, n: usize) -> Self {
        self.max_clients = n;
        self
    }

    /// Builder-style setter for `max_pending_queue`.
    #[must_use]
    pub fn with_max_pending_queue(mut self, n: usize) -> Self {
        self.max_pending_queue = n;
        self
    }

    /// Builder-style setter for `callback_timeout`.
    #[must_use]
    pub fn with_callback_timeout(mut self, d: Duration) -> Self {
        self.callback_timeout = d;
        self
    }
}

/// How to resolve the hostname embedded in hub/client URLs. Two sentinels
/// from §6: `[hostname]` (fully-qualified DNS lookup) and
/// `[hostnumber]` (IP-literal lookup); any other value is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalhostOverride {
    /// Use this literal hostname/IP text.
    Literal(String),
    /// Resolve the fully-qualified DNS name of this host.
    FullyQualifiedHostname,
    /// Resolve this host's IP literal.
    HostNumber,
}

impl LocalhostOverride {
    fn parse(raw: &str) -> Self {
        match raw {
            "[hostname]" => Self::FullyQualifiedHostname,
            "[hostnumber]" => Self::HostNumber,
            other => Self::Literal(other.to_string()),
        }
    }

    /// Resolve to a concrete host string to embed in a URL. Any DNS lookup
    /// failure falls back to `127.0.0.1` (§6).
    pub fn resolve(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::FullyQualifiedHostname => hostname_fqdn().unwrap_or_else(|| "127.0.0.1".into()),
            Self::HostNumber => hostname_ip().unwrap_or_else(|| "127.0.0.1".into()),
        }
    }
}

fn hostname_fqdn() -> Option<String> {
    // No portable, dependency-free FQDN lookup in std; `gethostname`-style
    // crates aren't in the dependency stack, so fall back to resolving
    // "localhost" via the system resolver as a best-effort stand-in.
    hostname_ip().map(|_| "localhost".to_string())
}

fn hostname_ip() -> Option<IpAddr> {
    use std::net::ToSocketAddrs;
    ("localhost", 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
}

/// The parsed effect of `$SAMP_HUB` (§6). `Unset` and `Ignored` both
/// mean "fall through to the default lockfile path"; `Ignored` additionally
/// carries the raw value so a caller can log it, per spec: "any other
/// non-empty value is logged and ignored".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampHubEnv {
    /// `$SAMP_HUB` was unset or empty.
    Unset,
    /// `$SAMP_HUB` began with `std-lockurl:`; carries the remainder.
    LockUrl(String),
    /// `$SAMP_HUB` had some other non-empty value; it's ignored.
    Ignored(String),
}

impl SampHubEnv {
    /// Read and classify `$SAMP_HUB` from the process environment.
    pub fn from_env() -> Self {
        match std::env::var(ENV_SAMP_HUB) {
            Ok(raw) if raw.is_empty() => Self::Unset,
            Ok(raw) => Self::classify(raw),
            Err(_) => Self::Unset,
        }
    }

    fn classify(raw: String) -> Self {
        match raw.strip_prefix(SAMP_HUB_LOCKURL_PREFIX) {
            Some(rest) => Self::LockUrl(rest.to_string()),
            None => Self::Ignored(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let cfg = HubConfig::default();
        assert_eq!(cfg.max_clients, 4096);
        assert_eq!(cfg.max_pending_queue, 4096);
        assert_eq!(cfg.max_callback_concurrency, 16);
        assert_eq!(cfg.http_workers, 20);
    }

    #[test]
    fn classifies_lockurl_prefix() {
        assert_eq!(
            SampHubEnv::classify("std-lockurl:http://x/y".to_string()),
            SampHubEnv::LockUrl("http://x/y".to_string())
        );
    }

    #[test]
    fn classifies_other_values_as_ignored() {
        assert_eq!(
            SampHubEnv::classify("something-else".to_string()),
            SampHubEnv::Ignored("something-else".to_string())
        );
    }

    #[test]
    fn parses_localhost_sentinels() {
        assert_eq!(
            LocalhostOverride::parse("[hostname]"),
            LocalhostOverride::FullyQualifiedHostname
        );
        assert_eq!(
            LocalhostOverride::parse("[hostnumber]"),
            LocalhostOverride::HostNumber
        );
        assert_eq!(
            LocalhostOverride::parse("my.host"),
            LocalhostOverride::Literal("my.host".to_string())
        );
    }
}
