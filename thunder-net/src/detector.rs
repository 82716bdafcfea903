//! Ban/block detection
//!
//! Classifies a response as a deliberate refusal or throttle by the remote
//! side, based on status code first and body keywords second.

use thunder_core::{BanReason, BanVerdict};

use crate::HttpResponse;

/// Status codes that signal a ban or rate limit
pub const BAN_STATUS_CODES: &[u16] = &[403, 429, 503];

/// Lowercase body keywords that signal a ban page
pub const BAN_KEYWORDS: &[&str] = &[
    "too many requests",
    "captcha",
    "blocked",
    "access denied",
    "forbidden",
];

/// Response classifier
#[derive(Debug, Clone)]
pub struct BanDetector {
    status_codes: Vec<u16>,
    keywords: Vec<String>,
}

impl Default for BanDetector {
    fn default() -> Self {
        Self {
            status_codes: BAN_STATUS_CODES.to_vec(),
            keywords: BAN_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl BanDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extra body keyword (matched case-insensitively)
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keywords.push(keyword.to_lowercase());
        self
    }

    pub fn classify(&self, response: &HttpResponse) -> BanVerdict {
        self.classify_parts(response.status, &response.body)
    }

    /// Classify from a raw status and body
    pub fn classify_parts(&self, status: u16, body: &str) -> BanVerdict {
        if self.status_codes.contains(&status) {
            return BanVerdict::blocked(BanReason::Status(status));
        }

        let body = body.to_lowercase();
        match self.keywords.iter().find(|k| body.contains(k.as_str())) {
            Some(keyword) => BanVerdict::blocked(BanReason::Keyword(keyword.clone())),
            None => BanVerdict::clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ban_status_regardless_of_body() {
        let detector = BanDetector::new();
        for status in [403, 429, 503] {
            for body in ["", "hello", "{\"ok\":true}"] {
                let verdict = detector.classify_parts(status, body);
                assert!(verdict.blocked);
                assert_eq!(verdict.reason, Some(BanReason::Status(status)));
            }
        }
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let detector = BanDetector::new();
        let verdict = detector.classify_parts(200, "<h1>Please solve this CAPTCHA</h1>");
        assert!(verdict.blocked);
        assert_eq!(verdict.reason, Some(BanReason::Keyword("captcha".to_string())));

        let verdict = detector.classify_parts(200, "ACCESS DENIED for your region");
        assert!(verdict.blocked);
    }

    #[test]
    fn test_legitimate_response() {
        let detector = BanDetector::new();
        let verdict = detector.classify_parts(200, "{\"login\":\"alice\"}");
        assert!(!verdict.blocked);
        assert!(verdict.reason.is_none());

        assert!(!detector.classify_parts(404, "not here").blocked);
    }

    #[test]
    fn test_empty_body() {
        let detector = BanDetector::new();
        assert!(!detector.classify_parts(200, "").blocked);
    }

    #[test]
    fn test_custom_keyword() {
        let detector = BanDetector::new().with_keyword("Cloudflare Ray ID");
        assert!(detector.classify_parts(200, "cloudflare ray id: 1234").blocked);
    }
}
