//! Client identity headers
//!
//! A fresh header set is generated for every attempt so a retry carries a
//! different fingerprint alongside its new egress route.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Header name -> value
pub type Headers = HashMap<String, String>;

/// Fallback desktop user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.4 Safari/605.1.15",
];

/// Get a random user agent from the fallback list
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// A dynamic source of user agents
pub trait UserAgentSource: Send + Sync {
    /// A user agent, or `None` when the source has nothing to offer
    fn user_agent(&self) -> Option<String>;
}

/// User agents read once from a file, one per line
#[derive(Debug, Clone)]
pub struct FileUserAgents {
    agents: Vec<String>,
}

impl FileUserAgents {
    /// Load the file; returns `None` when it is missing or empty
    pub fn detect(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                info!("User agent file {} unavailable ({}), using built-in list", path.display(), e);
                return None;
            }
        };

        let agents: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        if agents.is_empty() {
            warn!("User agent file {} is empty, using built-in list", path.display());
            return None;
        }

        info!("Loaded {} user agents from {}", agents.len(), path.display());
        Some(Self { agents })
    }
}

impl UserAgentSource for FileUserAgents {
    fn user_agent(&self) -> Option<String> {
        self.agents.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Generates per-request identity headers
#[derive(Clone, Default)]
pub struct HeaderGenerator {
    source: Option<Arc<dyn UserAgentSource>>,
}

impl HeaderGenerator {
    /// Generator using only the built-in user agents
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Arc<dyn UserAgentSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Generator backed by a user agent file when one is usable
    pub fn detect(path: Option<&Path>) -> Self {
        match path.and_then(FileUserAgents::detect) {
            Some(agents) => Self::with_source(Arc::new(agents)),
            None => Self::new(),
        }
    }

    pub fn has_dynamic_source(&self) -> bool {
        self.source.is_some()
    }

    fn user_agent(&self) -> String {
        self.source
            .as_ref()
            .and_then(|source| source.user_agent())
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| {
                if self.source.is_some() {
                    debug!("User agent source returned nothing, falling back");
                }
                random_user_agent().to_string()
            })
    }

    /// A fresh header set
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("User-Agent".to_string(), self.user_agent());
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.5".to_string());
        headers.insert("Connection".to_string(), "keep-alive".to_string());
        headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());
        headers
    }
}

/// Overlay caller headers on generated ones; names compare case-insensitively
pub fn merge_headers(mut base: Headers, overrides: &Headers) -> Headers {
    for (name, value) in overrides {
        base.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        base.insert(name.clone(), value.clone());
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct BrokenSource;

    impl UserAgentSource for BrokenSource {
        fn user_agent(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_fallback_list_is_distinct() {
        let mut agents = USER_AGENTS.to_vec();
        agents.sort();
        agents.dedup();
        assert!(agents.len() >= 5);
        assert!(agents.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
    }

    #[test]
    fn test_required_headers() {
        let headers = HeaderGenerator::new().headers();
        for name in ["User-Agent", "Accept", "Accept-Language", "Connection"] {
            assert!(headers.contains_key(name), "missing {}", name);
        }
        assert!(USER_AGENTS.contains(&headers["User-Agent"].as_str()));
    }

    #[test]
    fn test_broken_source_falls_back() {
        let generator = HeaderGenerator::with_source(Arc::new(BrokenSource));
        let headers = generator.headers();
        assert!(USER_AGENTS.contains(&headers["User-Agent"].as_str()));
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# custom").unwrap();
        writeln!(file, "CustomAgent/1.0").unwrap();

        let generator = HeaderGenerator::detect(Some(file.path()));
        assert!(generator.has_dynamic_source());
        assert_eq!(generator.headers()["User-Agent"], "CustomAgent/1.0");
    }

    #[test]
    fn test_empty_file_is_not_a_source() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(!HeaderGenerator::detect(Some(file.path())).has_dynamic_source());
    }

    #[test]
    fn test_merge_overrides_case_insensitive() {
        let base = HeaderGenerator::new().headers();
        let mut overrides = Headers::new();
        overrides.insert("user-agent".to_string(), "thunder/0.1".to_string());
        overrides.insert("Authorization".to_string(), "token abc".to_string());

        let merged = merge_headers(base, &overrides);
        assert_eq!(merged["user-agent"], "thunder/0.1");
        assert!(!merged.contains_key("User-Agent"));
        assert_eq!(merged["Authorization"], "token abc");
        assert!(merged.contains_key("Accept"));
    }
}
