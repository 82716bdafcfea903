//! Handle similarity scoring
//!
//! Ratio is the normalized indel similarity: `2 * lcs / (len_a + len_b)`,
//! which equals `(len_sum - indel_distance) / len_sum` with substitutions
//! costing two edits. Comparison is case-insensitive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Similarity band of a discovered handle relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityLevel {
    Exact,
    High,
    Medium,
    Low,
}

impl SimilarityLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.95 {
            SimilarityLevel::Exact
        } else if ratio >= 0.85 {
            SimilarityLevel::High
        } else if ratio >= 0.70 {
            SimilarityLevel::Medium
        } else {
            SimilarityLevel::Low
        }
    }

    /// Points contributed to the confidence score
    pub fn points(&self) -> u32 {
        match self {
            SimilarityLevel::Exact => 35,
            SimilarityLevel::High => 25,
            SimilarityLevel::Medium => 15,
            SimilarityLevel::Low => 0,
        }
    }
}

impl fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SimilarityLevel::Exact => "EXACT/NEAR EXACT",
            SimilarityLevel::High => "HIGH",
            SimilarityLevel::Medium => "MEDIUM",
            SimilarityLevel::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// Similarity ratio in `[0.0, 1.0]`; empty input scores zero
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();

    2.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_one() {
        assert_eq!(similarity("alice", "alice"), 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(similarity("Alice", "aLICE"), 1.0);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(similarity("", "alice"), 0.0);
        assert_eq!(similarity("alice", ""), 0.0);
    }

    #[test]
    fn test_substitution_costs_two() {
        // lcs("abcd", "abce") = 3 -> 6/8
        assert!((similarity("abcd", "abce") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_levels() {
        assert_eq!(SimilarityLevel::from_ratio(1.0), SimilarityLevel::Exact);
        assert_eq!(SimilarityLevel::from_ratio(0.9), SimilarityLevel::High);
        assert_eq!(SimilarityLevel::from_ratio(0.7), SimilarityLevel::Medium);
        assert_eq!(SimilarityLevel::from_ratio(0.2), SimilarityLevel::Low);
        assert_eq!(SimilarityLevel::Exact.points(), 35);
        assert_eq!(SimilarityLevel::Low.points(), 0);
    }
}
