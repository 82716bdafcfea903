//! Egress routes
//!
//! A route is the network path chosen for one outbound request attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of egress currently in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Direct,
    Proxy,
    AnonymityCircuit,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Direct => write!(f, "direct"),
            RouteKind::Proxy => write!(f, "proxy"),
            RouteKind::AnonymityCircuit => write!(f, "anonymity circuit"),
        }
    }
}

/// A resolved route for a single request attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EgressRoute {
    /// No proxy, connect straight to the target
    Direct,
    /// A proxy endpoint from the configured pool (`scheme://host:port`)
    Proxy { endpoint: String },
    /// The local anonymity gateway (SOCKS URL of the Tor daemon)
    AnonymityCircuit { gateway: String },
}

impl EgressRoute {
    pub fn kind(&self) -> RouteKind {
        match self {
            EgressRoute::Direct => RouteKind::Direct,
            EgressRoute::Proxy { .. } => RouteKind::Proxy,
            EgressRoute::AnonymityCircuit { .. } => RouteKind::AnonymityCircuit,
        }
    }

    /// Proxy URL to hand to an HTTP client or external tool, if any
    pub fn proxy_url(&self) -> Option<&str> {
        match self {
            EgressRoute::Direct => None,
            EgressRoute::Proxy { endpoint } => Some(endpoint),
            EgressRoute::AnonymityCircuit { gateway } => Some(gateway),
        }
    }
}

impl fmt::Display for EgressRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EgressRoute::Direct => write!(f, "direct"),
            EgressRoute::Proxy { endpoint } => write!(f, "proxy {}", endpoint),
            EgressRoute::AnonymityCircuit { gateway } => write!(f, "circuit via {}", gateway),
        }
    }
}
