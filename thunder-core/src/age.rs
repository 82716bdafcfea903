//! Account age classification
//!
//! Very young accounts are a common marker of throwaway or fake profiles,
//! so they carry a penalty against the confidence score.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Age band of an account relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountAge {
    VeryRecent,
    Recent,
    Moderate,
    Established,
    Unknown,
}

impl AccountAge {
    /// Classify an ISO-8601 creation timestamp (`2015-03-02T10:11:12Z`)
    pub fn from_created_at(created_at: &str) -> Self {
        Self::from_created_at_on(created_at, Utc::now().date_naive())
    }

    /// Classify relative to an explicit reference date
    pub fn from_created_at_on(created_at: &str, today: NaiveDate) -> Self {
        let date_part = created_at.split('T').next().unwrap_or_default();
        let created = match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => return AccountAge::Unknown,
        };

        let days = (today - created).num_days();
        if days < 30 {
            AccountAge::VeryRecent
        } else if days < 180 {
            AccountAge::Recent
        } else if days < 365 {
            AccountAge::Moderate
        } else {
            AccountAge::Established
        }
    }

    /// Points subtracted from the confidence score
    pub fn penalty(&self) -> u32 {
        match self {
            AccountAge::VeryRecent => 30,
            AccountAge::Recent => 15,
            AccountAge::Moderate => 5,
            AccountAge::Established | AccountAge::Unknown => 0,
        }
    }
}

impl fmt::Display for AccountAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountAge::VeryRecent => "VERY RECENT (suspicious)",
            AccountAge::Recent => "RECENT",
            AccountAge::Moderate => "MODERATE",
            AccountAge::Established => "ESTABLISHED (trusted)",
            AccountAge::Unknown => "N/A",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(
            AccountAge::from_created_at_on("2024-05-20T08:00:00Z", today()),
            AccountAge::VeryRecent
        );
        assert_eq!(
            AccountAge::from_created_at_on("2024-02-01T08:00:00Z", today()),
            AccountAge::Recent
        );
        assert_eq!(
            AccountAge::from_created_at_on("2023-09-01T08:00:00Z", today()),
            AccountAge::Moderate
        );
        assert_eq!(
            AccountAge::from_created_at_on("2011-01-25T18:44:36Z", today()),
            AccountAge::Established
        );
    }

    #[test]
    fn test_garbage_is_unknown() {
        let age = AccountAge::from_created_at_on("yesterday", today());
        assert_eq!(age, AccountAge::Unknown);
        assert_eq!(age.penalty(), 0);
    }

    #[test]
    fn test_penalties() {
        assert_eq!(AccountAge::VeryRecent.penalty(), 30);
        assert_eq!(AccountAge::Recent.penalty(), 15);
        assert_eq!(AccountAge::Moderate.penalty(), 5);
        assert_eq!(AccountAge::Established.penalty(), 0);
    }
}
