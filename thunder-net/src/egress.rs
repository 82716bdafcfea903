//! Egress identity source
//!
//! Decides which route the next request takes and how to rotate identity:
//! - Proxy pool configured: round-robin through it (rotation is simply the
//!   next `next_route()` call)
//! - Otherwise, anonymity circuit when the local daemon is usable: rotation
//!   is a `NEWNYM` over the control port
//! - Otherwise, direct
//!
//! Pool contents and anonymity availability are settled once at
//! construction and stay read-only for the source's lifetime.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use thunder_core::{EgressRoute, RouteKind};

use crate::{
    probe_control, probe_port, random_user_agent, request_new_identity, HttpRequest, NetConfig,
    ProxyPool, Transport,
};

/// Apparent external IP, for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalIp {
    Known(String),
    Unknown,
}

impl fmt::Display for ExternalIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalIp::Known(ip) => f.write_str(ip),
            ExternalIp::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Supplies routes and rotates identity; never fails outward
#[async_trait]
pub trait EgressSource: Send + Sync {
    fn available_proxy_count(&self) -> usize;

    fn anonymity_available(&self) -> bool;

    /// Kind of route `next_route` hands out
    fn active_kind(&self) -> RouteKind;

    fn next_route(&self) -> EgressRoute;

    /// Refresh the anonymity circuit; `false` when not applicable or failed
    async fn renew_identity(&self) -> bool;

    async fn external_ip(&self, route: &EgressRoute) -> ExternalIp;
}

/// Probe the local anonymity daemon: SOCKS port reachable and control
/// handshake accepted. Failures are swallowed.
pub async fn detect_anonymity(config: &NetConfig) -> bool {
    if !probe_port(config.socks_host_port(), config.probe_timeout).await {
        debug!("SOCKS gateway {} not reachable", config.socks_addr);
        return false;
    }

    match probe_control(
        &config.control_addr,
        config.control_password.as_deref(),
        config.probe_timeout,
    )
    .await
    {
        Ok(()) => true,
        Err(e) => {
            debug!("Control port {} unusable: {}", config.control_addr, e);
            false
        }
    }
}

/// Concrete egress source backed by a proxy pool and the local daemon
pub struct IdentitySource {
    config: NetConfig,
    pool: ProxyPool,
    anonymity: bool,
    transport: Arc<dyn Transport>,
}

impl IdentitySource {
    pub fn new(
        config: NetConfig,
        pool: ProxyPool,
        anonymity: bool,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            pool,
            anonymity,
            transport,
        }
    }

    /// Load the pool and probe capabilities once
    pub async fn detect(config: NetConfig, transport: Arc<dyn Transport>) -> Self {
        let pool = match (&config.manual_proxy, &config.proxy_file) {
            (Some(proxy), _) => {
                info!("Using manual proxy: {}", proxy);
                ProxyPool::single(proxy.clone())
            }
            (None, Some(path)) => ProxyPool::load(path),
            (None, None) => ProxyPool::empty(),
        };

        let anonymity = if config.use_anonymity {
            detect_anonymity(&config).await
        } else {
            false
        };

        let source = Self::new(config, pool, anonymity, transport);
        match source.active_kind() {
            RouteKind::Proxy => info!("{} proxies in rotation", source.available_proxy_count()),
            RouteKind::AnonymityCircuit => info!("Tor detected at {}", source.config.socks_addr),
            RouteKind::Direct => info!("No proxy or Tor available - using direct connection"),
        }
        source
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}

#[async_trait]
impl EgressSource for IdentitySource {
    fn available_proxy_count(&self) -> usize {
        self.pool.len()
    }

    fn anonymity_available(&self) -> bool {
        self.anonymity
    }

    fn active_kind(&self) -> RouteKind {
        if !self.pool.is_empty() {
            RouteKind::Proxy
        } else if self.anonymity {
            RouteKind::AnonymityCircuit
        } else {
            RouteKind::Direct
        }
    }

    fn next_route(&self) -> EgressRoute {
        if let Some(endpoint) = self.pool.next() {
            return EgressRoute::Proxy {
                endpoint: endpoint.to_string(),
            };
        }

        if self.anonymity {
            EgressRoute::AnonymityCircuit {
                gateway: self.config.socks_addr.clone(),
            }
        } else {
            EgressRoute::Direct
        }
    }

    async fn renew_identity(&self) -> bool {
        if self.active_kind() != RouteKind::AnonymityCircuit {
            return false;
        }

        match request_new_identity(
            &self.config.control_addr,
            self.config.control_password.as_deref(),
            self.config.probe_timeout,
        )
        .await
        {
            Ok(()) => {
                tokio::time::sleep(self.config.renew_settle).await;
                info!("Tor circuit renewed");
                true
            }
            Err(e) => {
                warn!("Failed to renew Tor circuit: {}", e);
                false
            }
        }
    }

    async fn external_ip(&self, route: &EgressRoute) -> ExternalIp {
        for endpoint in &self.config.ip_endpoints {
            let request = HttpRequest::get(endpoint.as_str()).header("User-Agent", random_user_agent());

            match self
                .transport
                .send(&request, route, self.config.ip_timeout)
                .await
            {
                Ok(response) if response.status == 200 => {
                    if let Some(ip) = parse_ip_body(&response.body) {
                        return ExternalIp::Known(ip);
                    }
                    debug!("IP endpoint {} returned an empty body", endpoint);
                }
                Ok(response) => debug!("IP endpoint {} returned {}", endpoint, response.status),
                Err(e) => debug!("IP endpoint {} failed: {}", endpoint, e),
            }
        }

        ExternalIp::Unknown
    }
}

/// Plain-text bodies are trimmed; JSON bodies yield their `ip` field
fn parse_ip_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return map
            .get("ip")
            .and_then(Value::as_str)
            .map(|ip| ip.trim().to_string());
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::tests::{fake_control_port, FakeAuth};
    use crate::{HttpResponse, ScriptedTransport, TransportError};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn closed_config() -> NetConfig {
        NetConfig {
            socks_addr: "socks5h://127.0.0.1:1".to_string(),
            control_addr: "127.0.0.1:1".to_string(),
            probe_timeout: Duration::from_millis(300),
            proxy_file: None,
            ip_endpoints: vec![
                "https://ip-one.test".to_string(),
                "https://ip-two.test".to_string(),
            ],
            ..Default::default()
        }
    }

    fn source_with(pool: ProxyPool, anonymity: bool, transport: Arc<dyn Transport>) -> IdentitySource {
        IdentitySource::new(closed_config(), pool, anonymity, transport)
    }

    #[tokio::test]
    async fn test_no_pool_no_tor_is_direct() {
        let dir = tempfile::tempdir().unwrap();
        let config = NetConfig {
            proxy_file: Some(dir.path().join("proxies.txt")),
            ..closed_config()
        };

        let source = IdentitySource::detect(config, Arc::new(ScriptedTransport::new())).await;
        assert_eq!(source.available_proxy_count(), 0);
        assert!(!source.anonymity_available());
        for _ in 0..5 {
            assert_eq!(source.next_route(), EgressRoute::Direct);
        }
        assert!(!source.renew_identity().await);
    }

    #[tokio::test]
    async fn test_external_ip_json_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("https://ip-one.test", Ok(HttpResponse::new(200, "{\"ip\":\"1.2.3.4\"}\n")));

        let source = source_with(ProxyPool::empty(), false, transport);
        let ip = source.external_ip(&EgressRoute::Direct).await;
        assert_eq!(ip, ExternalIp::Known("1.2.3.4".to_string()));
    }

    #[tokio::test]
    async fn test_external_ip_falls_through_endpoints() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("https://ip-one.test", Err(TransportError::Timeout(Duration::from_secs(5))));
        transport.push("https://ip-two.test", Ok(HttpResponse::new(200, "  5.6.7.8\n")));

        let source = source_with(ProxyPool::empty(), false, transport.clone());
        let ip = source.external_ip(&EgressRoute::Direct).await;
        assert_eq!(ip.to_string(), "5.6.7.8");
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_external_ip_unknown() {
        let transport = Arc::new(
            ScriptedTransport::new().with_fallback(Ok(HttpResponse::new(502, "bad gateway"))),
        );
        let source = source_with(ProxyPool::empty(), false, transport);
        let ip = source.external_ip(&EgressRoute::Direct).await;
        assert_eq!(ip, ExternalIp::Unknown);
        assert_eq!(ip.to_string(), "Unknown");
    }

    #[tokio::test]
    async fn test_pool_takes_precedence_over_circuit() {
        let pool = ProxyPool::from_entries(vec![
            "http://10.0.0.1:8080".to_string(),
            "http://10.0.0.2:8080".to_string(),
        ]);
        let source = source_with(pool, true, Arc::new(ScriptedTransport::new()));

        assert_eq!(source.active_kind(), RouteKind::Proxy);
        assert_eq!(
            source.next_route(),
            EgressRoute::Proxy { endpoint: "http://10.0.0.1:8080".to_string() }
        );
        assert_eq!(
            source.next_route(),
            EgressRoute::Proxy { endpoint: "http://10.0.0.2:8080".to_string() }
        );
        // Proxy rotation never talks to the control port
        assert!(!source.renew_identity().await);
    }

    #[tokio::test]
    async fn test_renew_circuit() {
        let (addr, log) = fake_control_port(FakeAuth::Open).await;
        let config = NetConfig {
            control_addr: addr,
            renew_settle: Duration::ZERO,
            ..closed_config()
        };
        let source = IdentitySource::new(config, ProxyPool::empty(), true, Arc::new(ScriptedTransport::new()));

        assert_eq!(source.active_kind(), RouteKind::AnonymityCircuit);
        assert!(matches!(source.next_route(), EgressRoute::AnonymityCircuit { .. }));
        assert!(source.renew_identity().await);
        assert!(log.lock().iter().any(|line| line == "SIGNAL NEWNYM"));
    }

    #[tokio::test]
    async fn test_renew_refused_is_false() {
        let (addr, _) = fake_control_port(FakeAuth::Refuse).await;
        let config = NetConfig {
            control_addr: addr,
            renew_settle: Duration::ZERO,
            ..closed_config()
        };
        let source = IdentitySource::new(config, ProxyPool::empty(), true, Arc::new(ScriptedTransport::new()));
        assert!(!source.renew_identity().await);
    }

    /// Config pointing at a live SOCKS listener and the given control port
    async fn daemon_config(control_addr: String) -> (NetConfig, TcpListener) {
        let socks = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = NetConfig {
            socks_addr: format!("socks5h://{}", socks.local_addr().unwrap()),
            control_addr,
            control_password: Some("secret".to_string()),
            probe_timeout: Duration::from_secs(2),
            ..closed_config()
        };
        (config, socks)
    }

    #[tokio::test]
    async fn test_anonymity_detected_when_socks_and_control_work() {
        let (control, _) = fake_control_port(FakeAuth::Open).await;
        let (config, _socks) = daemon_config(control).await;

        assert!(detect_anonymity(&config).await);

        let source = IdentitySource::detect(config, Arc::new(ScriptedTransport::new())).await;
        assert_eq!(source.active_kind(), RouteKind::AnonymityCircuit);
        assert_eq!(
            source.next_route(),
            EgressRoute::AnonymityCircuit { gateway: source.config().socks_addr.clone() }
        );
    }

    #[tokio::test]
    async fn test_anonymity_requires_control_handshake() {
        let (control, _) = fake_control_port(FakeAuth::Refuse).await;
        let (config, _socks) = daemon_config(control).await;

        assert!(!detect_anonymity(&config).await);
    }

    #[tokio::test]
    async fn test_anonymity_requires_socks_port() {
        let (control, log) = fake_control_port(FakeAuth::Open).await;
        let config = NetConfig {
            control_addr: control,
            ..closed_config()
        };

        assert!(!detect_anonymity(&config).await);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_anonymity_with_cookie_auth() {
        let dir = tempfile::tempdir().unwrap();
        let cookie = dir.path().join("control_auth_cookie");
        std::fs::write(&cookie, [3u8; 32]).unwrap();

        let (control, _) = fake_control_port(FakeAuth::Cookie(cookie.display().to_string())).await;
        let (config, _socks) = daemon_config(control).await;
        let config = NetConfig {
            control_password: None,
            ..config
        };

        assert!(detect_anonymity(&config).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_routes_split_evenly() {
        let pool = ProxyPool::from_entries(vec![
            "http://10.0.0.1:8080".to_string(),
            "http://10.0.0.2:8080".to_string(),
        ]);
        let source = Arc::new(source_with(pool, false, Arc::new(ScriptedTransport::new())));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    (0..50).map(|_| source.next_route()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut first = 0;
        let mut second = 0;
        for task in tasks {
            for route in task.await.unwrap() {
                match route.proxy_url() {
                    Some("http://10.0.0.1:8080") => first += 1,
                    Some("http://10.0.0.2:8080") => second += 1,
                    other => panic!("unexpected route {:?}", other),
                }
            }
        }
        assert_eq!((first, second), (50, 50));
    }

    #[test]
    fn test_parse_ip_body() {
        assert_eq!(parse_ip_body("1.2.3.4\n"), Some("1.2.3.4".to_string()));
        assert_eq!(parse_ip_body("{\"ip\": \"9.9.9.9\"}"), Some("9.9.9.9".to_string()));
        assert_eq!(parse_ip_body("   "), None);
    }
}
