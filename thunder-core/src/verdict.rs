//! Ban verdicts
//!
//! Derived per response by the ban detector, never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a response was classified as blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanReason {
    /// Status code in the ban set
    Status(u16),
    /// Body contained a ban keyword
    Keyword(String),
}

/// Result of classifying one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanVerdict {
    pub blocked: bool,
    pub reason: Option<BanReason>,
}

impl BanVerdict {
    pub fn clear() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }

    pub fn blocked(reason: BanReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }
}

impl fmt::Display for BanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            None => write!(f, "not blocked"),
            Some(BanReason::Status(code)) => write!(f, "blocked (status {})", code),
            Some(BanReason::Keyword(word)) => write!(f, "blocked (keyword \"{}\")", word),
        }
    }
}
