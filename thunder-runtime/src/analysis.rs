//! Identity analysis
//!
//! Scores how consistent the discovered handles are with the target:
//! close handles add points, very young accounts subtract them.

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use tracing::debug;

use thunder_core::{similarity, AccountAge, SimilarityLevel, MAX_SCORE};
use thunder_probes::AccountAgeLookup;

/// Concurrent account-age lookups
const AGE_LOOKUP_CONCURRENCY: usize = 4;

/// Assessment of one discovered handle
#[derive(Debug, Clone, PartialEq)]
pub struct HandleAssessment {
    pub handle: String,
    /// Similarity ratio to the target in `[0.0, 1.0]`
    pub similarity: f64,
    pub level: SimilarityLevel,
    pub age: AccountAge,
}

impl HandleAssessment {
    pub fn similarity_percent(&self) -> u32 {
        (self.similarity * 100.0).round() as u32
    }
}

/// Scored analysis of a lookup
#[derive(Debug, Clone)]
pub struct IdentityAnalysis {
    pub target: String,
    /// Confidence score in `[0, 100]`
    pub score: u32,
    pub handles: Vec<HandleAssessment>,
}

/// Score discovered handles; `ages` is skipped when `None`
pub async fn analyze(
    target: &str,
    discovered: &BTreeSet<String>,
    ages: Option<&dyn AccountAgeLookup>,
) -> IdentityAnalysis {
    let handles: Vec<HandleAssessment> = stream::iter(discovered.iter())
        .map(|handle| async move {
            let ratio = similarity(target, handle);
            let age = match ages {
                Some(lookup) => match lookup.created_at(handle).await {
                    Some(created) => AccountAge::from_created_at(&created),
                    None => AccountAge::Unknown,
                },
                None => AccountAge::Unknown,
            };
            debug!("{}: similarity {:.2}, age {}", handle, ratio, age);

            HandleAssessment {
                handle: handle.clone(),
                similarity: ratio,
                level: SimilarityLevel::from_ratio(ratio),
                age,
            }
        })
        .buffered(AGE_LOOKUP_CONCURRENCY)
        .collect()
        .await;

    IdentityAnalysis {
        target: target.to_string(),
        score: score(&handles),
        handles,
    }
}

/// Sum of similarity points minus age penalties, clamped to `[0, 100]`
pub fn score(handles: &[HandleAssessment]) -> u32 {
    let gained: i64 = handles.iter().map(|h| h.level.points() as i64).sum();
    let penalty: i64 = handles.iter().map(|h| h.age.penalty() as i64).sum();
    (gained - penalty).clamp(0, MAX_SCORE as i64) as u32
}
