//! Cache entries and their payload

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::embedding::Embedding;
use crate::domain::retrieval::{Evidence, SearchStrategy};

/// The answer computed for a question, as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub question: String,
    pub answer: String,
    pub evidence: Vec<Evidence>,
    pub strategy: SearchStrategy,
}

impl CachedAnswer {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        evidence: Vec<Evidence>,
        strategy: SearchStrategy,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            evidence,
            strategy,
        }
    }
}

/// A cached entry in the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub embedding: Embedding,
    pub payload: CachedAnswer,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub hit_count: u64,
}

impl CacheEntry {
    /// Create a fresh entry with a random id
    pub fn new(embedding: Embedding, payload: CachedAnswer, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            embedding,
            payload,
            created_at: now,
            last_accessed: now,
            hit_count: 0,
        }
    }

    /// An entry is live while it was created strictly after the cutoff
    pub fn is_live(&self, cutoff: DateTime<Utc>) -> bool {
        self.created_at > cutoff
    }

    /// Record a hit
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_accessed = at;
        self.hit_count += 1;
    }
}

/// The creation time at or before which entries are expired
///
/// An entry stored at `T` is live before `T + ttl` and expired from then on.
pub fn expiry_cutoff(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = i64::try_from(ttl.as_secs())
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);

    now.checked_sub_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(now: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(
            Embedding::new(vec![1.0, 0.0]).unwrap(),
            CachedAnswer::new("q", "a", vec![], SearchStrategy::Hybrid),
            now,
        )
    }

    #[test]
    fn test_live_until_ttl_elapses() {
        let stored = Utc::now();
        let entry = entry_at(stored);
        let ttl = Duration::from_secs(60);

        let just_before = stored + TimeDelta::seconds(59);
        let exactly = stored + TimeDelta::seconds(60);

        assert!(entry.is_live(expiry_cutoff(just_before, ttl)));
        assert!(!entry.is_live(expiry_cutoff(exactly, ttl)));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let entry = entry_at(Utc::now());
        assert!(entry.is_live(expiry_cutoff(Utc::now(), Duration::from_secs(u64::MAX))));
    }

    #[test]
    fn test_touch() {
        let stored = Utc::now();
        let mut entry = entry_at(stored);

        let later = stored + TimeDelta::seconds(5);
        entry.touch(later);

        assert_eq!(entry.hit_count, 1);
        assert_eq!(entry.last_accessed, later);
        assert_eq!(entry.created_at, stored);
    }
}
