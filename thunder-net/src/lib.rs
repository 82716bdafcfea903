//! Sherlock Thunder Network Layer
//!
//! Resilient outbound HTTP used by every downstream lookup:
//! - Proxy pool with round-robin rotation
//! - Tor control channel for circuit renewal
//! - Egress identity source (proxy, circuit or direct)
//! - Ban/block detection
//! - Per-request header fingerprints
//! - Retrying executor with jittered backoff

pub mod config;
pub mod pool;
pub mod control;
pub mod egress;
pub mod detector;
pub mod fingerprint;
pub mod transport;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod executor;

pub use config::*;
pub use pool::*;
pub use control::*;
pub use egress::*;
pub use detector::*;
pub use fingerprint::*;
pub use transport::*;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::*;
pub use executor::*;
