//! Sherlock Thunder Core - Domain types for resilient username enumeration
//!
//! This crate provides the primitives shared by every layer:
//! - Egress routes (direct, proxy, anonymity circuit)
//! - Ban verdicts produced by response classification
//! - Similarity and account-age scoring used by identity analysis

pub mod route;
pub mod verdict;
pub mod similarity;
pub mod age;

pub use route::*;
pub use verdict::*;
pub use similarity::*;
pub use age::*;

/// Default SOCKS gateway exposed by a local Tor daemon
pub const DEFAULT_SOCKS_ADDR: &str = "socks5h://127.0.0.1:9050";

/// Default Tor control port address
pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:9051";

/// Default proxy list location
pub const DEFAULT_PROXY_FILE: &str = "config/proxies.txt";

/// Maximum identity confidence score
pub const MAX_SCORE: u32 = 100;
