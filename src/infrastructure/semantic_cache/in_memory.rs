//! In-memory similarity index

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::DomainError;
use crate::domain::embedding::Embedding;
use crate::domain::semantic_cache::{CacheEntry, IndexMatch, SimilarityIndex};

#[derive(Debug)]
struct StoredEntry {
    entry: CacheEntry,
    /// Insertion order, breaks ties between equal creation times
    seq: u64,
    /// Last access order, drives LRU eviction
    tick: u64,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<String, StoredEntry>,
    dimensions: Option<usize>,
    next_seq: u64,
    next_tick: u64,
}

impl IndexState {
    fn check_dimensions(&self, embedding: &Embedding) -> Result<(), DomainError> {
        match self.dimensions {
            Some(expected) if expected != embedding.dimensions() => {
                Err(DomainError::invalid_embedding(format!(
                    "expected {} dimensions, got {}",
                    expected,
                    embedding.dimensions()
                )))
            }
            _ => Ok(()),
        }
    }

    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }
}

/// In-memory similarity index using linear search
///
/// Suitable for single-instance deployments. Use the Redis index when the
/// cache must be shared between processes.
#[derive(Debug)]
pub struct InMemorySimilarityIndex {
    state: RwLock<IndexState>,
    max_entries: usize,
    fixed_dimensions: Option<usize>,
}

impl InMemorySimilarityIndex {
    /// Create a new in-memory index holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            max_entries: max_entries.max(1),
            fixed_dimensions: None,
        }
    }

    /// Require every embedding to have `dimensions` values
    pub fn with_dimensions(mut self, dimensions: Option<usize>) -> Self {
        self.fixed_dimensions = dimensions;
        if let Ok(state) = self.state.get_mut() {
            state.dimensions = dimensions;
        }
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, IndexState>, DomainError> {
        self.state
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, IndexState>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl SimilarityIndex for InMemorySimilarityIndex {
    async fn nearest(
        &self,
        embedding: &Embedding,
        min_similarity: f32,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<IndexMatch>, DomainError> {
        let state = self.read()?;
        state.check_dimensions(embedding)?;

        let mut best: Option<(&StoredEntry, f32)> = None;

        for stored in state.entries.values() {
            if !stored.entry.is_live(cutoff) {
                continue;
            }

            let similarity = embedding.cosine_similarity(&stored.entry.embedding)?;
            if similarity < min_similarity {
                continue;
            }

            let better = match best {
                None => true,
                Some((current, current_similarity)) => {
                    similarity > current_similarity
                        || (similarity == current_similarity
                            && (stored.entry.created_at, stored.seq)
                                > (current.entry.created_at, current.seq))
                }
            };

            if better {
                best = Some((stored, similarity));
            }
        }

        Ok(best.map(|(stored, similarity)| IndexMatch {
            entry: stored.entry.clone(),
            similarity,
        }))
    }

    async fn insert(&self, entry: CacheEntry) -> Result<Option<CacheEntry>, DomainError> {
        let mut state = self.write()?;
        state.check_dimensions(&entry.embedding)?;

        if state.dimensions.is_none() {
            state.dimensions = Some(entry.embedding.dimensions());
        }

        let mut evicted = None;
        if !state.entries.contains_key(&entry.id) && state.entries.len() >= self.max_entries {
            let lru_id = state
                .entries
                .iter()
                .min_by_key(|(_, stored)| stored.tick)
                .map(|(id, _)| id.clone());

            if let Some(id) = lru_id {
                evicted = state.entries.remove(&id).map(|stored| stored.entry);
            }
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        let tick = state.tick();
        state
            .entries
            .insert(entry.id.clone(), StoredEntry { entry, seq, tick });

        Ok(evicted)
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        let mut state = self.write()?;
        Ok(state.entries.remove(id).is_some())
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<Option<CacheEntry>, DomainError> {
        let mut state = self.write()?;
        let tick = state.tick();

        Ok(state.entries.get_mut(id).map(|stored| {
            stored.entry.touch(at);
            stored.tick = tick;
            stored.entry.clone()
        }))
    }

    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut state = self.write()?;
        let before = state.entries.len();
        state.entries.retain(|_, stored| stored.entry.is_live(cutoff));
        Ok(before - state.entries.len())
    }

    async fn live_count(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let state = self.read()?;
        Ok(state
            .entries
            .values()
            .filter(|stored| stored.entry.is_live(cutoff))
            .count())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut state = self.write()?;
        state.entries.clear();
        state.dimensions = self.fixed_dimensions;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
