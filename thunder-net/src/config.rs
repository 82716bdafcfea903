//! Network layer configuration
//!
//! Every timing constant is configurable; defaults follow the conservative
//! (longer) backoff windows.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use thunder_core::{DEFAULT_CONTROL_ADDR, DEFAULT_PROXY_FILE, DEFAULT_SOCKS_ADDR};

/// Endpoints queried, in order, to learn the apparent external IP
pub const DEFAULT_IP_ENDPOINTS: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

/// Retry and backoff policy for the resilient executor
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per request (including the first)
    pub max_retries: u32,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Sleep window after a transport failure
    pub transport_backoff: RangeInclusive<Duration>,
    /// Sleep window after a detected ban
    pub ban_backoff: RangeInclusive<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(10),
            transport_backoff: Duration::from_secs(1)..=Duration::from_secs(3),
            ban_backoff: Duration::from_secs(2)..=Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps between attempts
    pub fn without_backoff(max_retries: u32) -> Self {
        Self {
            max_retries,
            transport_backoff: Duration::ZERO..=Duration::ZERO,
            ban_backoff: Duration::ZERO..=Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Pick a uniformly random duration inside the window
pub fn jitter(window: &RangeInclusive<Duration>) -> Duration {
    use rand::Rng;

    let (low, high) = (window.start().as_millis(), window.end().as_millis());
    if high <= low {
        return *window.start();
    }
    let millis = rand::thread_rng().gen_range(low..=high);
    Duration::from_millis(millis as u64)
}

/// Network layer configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// SOCKS gateway of the local anonymity daemon
    pub socks_addr: String,
    /// Control port address (`host:port`)
    pub control_addr: String,
    /// Control port password, empty/None for null authentication
    pub control_password: Option<String>,
    /// Whether to probe for and use the anonymity circuit at all
    pub use_anonymity: bool,
    /// Timeout for capability probes (control handshake, SOCKS connect)
    pub probe_timeout: Duration,
    /// Sleep after a NEWNYM signal so the new circuit can settle
    pub renew_settle: Duration,
    /// Proxy list file; missing file means no pool
    pub proxy_file: Option<PathBuf>,
    /// Manually supplied proxy, overrides the proxy file
    pub manual_proxy: Option<String>,
    /// Optional file of user agents, one per line
    pub user_agent_file: Option<PathBuf>,
    /// External IP check endpoints, tried in order
    pub ip_endpoints: Vec<String>,
    /// Timeout for each external IP check
    pub ip_timeout: Duration,
    /// Retry policy for the resilient executor
    pub retry: RetryPolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            socks_addr: DEFAULT_SOCKS_ADDR.to_string(),
            control_addr: DEFAULT_CONTROL_ADDR.to_string(),
            control_password: None,
            use_anonymity: true,
            probe_timeout: Duration::from_secs(2),
            renew_settle: Duration::from_secs(2),
            proxy_file: Some(PathBuf::from(DEFAULT_PROXY_FILE)),
            manual_proxy: None,
            user_agent_file: None,
            ip_endpoints: DEFAULT_IP_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            ip_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl NetConfig {
    /// `host:port` of the SOCKS gateway, without the scheme
    pub fn socks_host_port(&self) -> &str {
        self.socks_addr
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.socks_addr)
            .trim_end_matches('/')
    }
}
