//! Proxy pool
//!
//! Loaded once at startup from a plain-text list, one `scheme://host:port`
//! per line. The entries never change afterwards; only the rotation cursor
//! moves, and it is shared by every concurrent caller.

use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static PROXY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i)(?:https?|socks4a?|socks5h?)://(?:[^\s/@]+@)?(?:\[[0-9a-f:.]+\]|[^\s/:@\[\]]+):(?P<port>\d+)/?$",
    )
    .expect("proxy line pattern is valid")
});

/// Scheme, optional credentials, host or bracketed IPv6, and a port in 1..=65535
fn is_valid_entry(line: &str) -> bool {
    PROXY_LINE
        .captures(line)
        .and_then(|caps| caps.name("port")?.as_str().parse::<u16>().ok())
        .is_some_and(|port| port != 0)
}

/// Ordered, immutable proxy list with an atomic round-robin cursor
#[derive(Debug, Default)]
pub struct ProxyPool {
    entries: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    /// An empty pool ("no pool configured")
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pool holding exactly one manually supplied proxy
    pub fn single(endpoint: impl Into<String>) -> Self {
        Self::from_entries(vec![endpoint.into()])
    }

    pub fn from_entries(entries: Vec<String>) -> Self {
        Self {
            entries,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load a pool from a proxy list file; a missing or unreadable file
    /// yields an empty pool
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let pool = Self::parse(&content);
                info!("Loaded {} proxies from {}", pool.len(), path.display());
                pool
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No proxy file at {} - no pool configured", path.display());
                Self::empty()
            }
            Err(e) => {
                warn!("Failed to read proxy file {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Parse proxy list content; blank lines and `#` comments are skipped
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| {
                let valid = is_valid_entry(line);
                if !valid {
                    warn!("Skipping malformed proxy entry: {}", line);
                }
                valid
            })
            .map(str::to_string)
            .collect();

        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Next proxy in rotation along with its index
    pub fn next_indexed(&self) -> Option<(usize, &str)> {
        if self.entries.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.entries.len();
        debug!("Proxy rotation selected index {}", index);
        Some((index, &self.entries[index]))
    }

    /// Next proxy in rotation
    pub fn next(&self) -> Option<&str> {
        self.next_indexed().map(|(_, endpoint)| endpoint)
    }
}
