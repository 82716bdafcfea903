//! Common traits for probes and lookups

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single probe run
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} is not installed")]
    ToolMissing(String),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("No output produced at {0}")]
    NoOutput(PathBuf),

    #[error("Unreadable tool output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An independent source of handles associated with a target identifier
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe name for logs
    fn name(&self) -> &str;

    /// Discovered handles, possibly empty
    async fn probe(&self, target: &str) -> Result<BTreeSet<String>, ProbeError>;
}

/// Looks up when an account was created
#[async_trait]
pub trait AccountAgeLookup: Send + Sync {
    /// ISO-8601 creation timestamp, `None` when unknown
    async fn created_at(&self, handle: &str) -> Option<String>;
}
