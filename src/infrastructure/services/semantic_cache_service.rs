//! Semantic answer caching service
//!
//! Wraps a [`SimilarityIndex`] with TTL expiry, hit/miss accounting and
//! single-flight coordination of concurrent fills.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::DomainError;
use crate::domain::embedding::Embedding;
use crate::domain::semantic_cache::{
    CacheEntry, CacheStats, CachedAnswer, Clock, SemanticCacheConfig, SimilarityIndex,
    SystemClock, expiry_cutoff, hit_rate,
};
use crate::infrastructure::semantic_cache::{FillClaim, FillPermit, FillRegistry, FillWaiter};

/// A reusable answer found for a query
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub answer: Arc<CachedAnswer>,
    pub similarity: f32,
    /// Answer came from a concurrent fill rather than a stored entry
    pub shared: bool,
}

/// Outcome of [`SemanticCacheService::lookup_or_claim`]
#[derive(Debug)]
pub enum CacheLookup {
    Hit(CacheHit),
    /// Nothing usable; the holder of the permit must compute and store the answer
    Miss(FillPermit),
    /// An equivalent query is being answered right now
    Wait(FillWaiter),
}

/// Health of the cache backend
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    stored: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

impl CacheCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stored,
            &self.evictions,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Semantic cache service
pub struct SemanticCacheService {
    index: Arc<dyn SimilarityIndex>,
    config: SemanticCacheConfig,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
    in_flight: Arc<FillRegistry>,
}

impl fmt::Debug for SemanticCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticCacheService")
            .field("index", &"<SimilarityIndex>")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl SemanticCacheService {
    /// Create a new semantic cache service
    pub fn new(index: Arc<dyn SimilarityIndex>, config: SemanticCacheConfig) -> Self {
        Self::with_clock(index, config, Arc::new(SystemClock))
    }

    /// Create a service with a custom time source
    pub fn with_clock(
        index: Arc<dyn SimilarityIndex>,
        config: SemanticCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            config: config.normalized(),
            clock,
            counters: CacheCounters::default(),
            in_flight: Arc::new(FillRegistry::new()),
        }
    }

    /// Check if semantic caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the configuration
    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        expiry_cutoff(now, self.config.ttl())
    }

    fn record_error(&self, error: &DomainError) {
        CacheCounters::bump(&self.counters.errors);
        metrics::counter!("semantic_cache_errors_total").increment(1);
        warn!(error = %error, "Semantic cache operation failed");
    }

    fn record_hit(&self, similarity: f32, shared: bool) {
        CacheCounters::bump(&self.counters.hits);
        metrics::counter!("semantic_cache_hits_total", "shared" => shared.to_string())
            .increment(1);
        debug!(similarity, shared, "Semantic cache hit");
    }

    fn record_miss(&self) {
        CacheCounters::bump(&self.counters.misses);
        metrics::counter!("semantic_cache_misses_total").increment(1);
        debug!("Semantic cache miss");
    }

    /// Find the best live entry and mark it accessed, without accounting
    async fn find(&self, embedding: &Embedding) -> Result<Option<CacheHit>, DomainError> {
        let now = self.clock.now();
        let found = self
            .index
            .nearest(embedding, self.config.similarity_threshold, self.cutoff(now))
            .await?;

        let Some(found) = found else {
            return Ok(None);
        };

        // The entry may have been evicted since the scan; the snapshot is still valid
        let entry = self
            .index
            .touch(&found.entry.id, now)
            .await?
            .unwrap_or(found.entry);

        Ok(Some(CacheHit {
            answer: Arc::new(entry.payload),
            similarity: found.similarity,
            shared: false,
        }))
    }

    /// Look up a cached answer for an embedding
    pub async fn lookup(&self, embedding: &Embedding) -> Result<Option<CacheHit>, DomainError> {
        match self.find(embedding).await {
            Ok(Some(hit)) => {
                self.record_hit(hit.similarity, false);
                Ok(Some(hit))
            }
            Ok(None) => {
                self.record_miss();
                Ok(None)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Look up a cached answer, or take part in filling it
    ///
    /// Of several concurrent callers with equivalent embeddings that all
    /// miss, exactly one gets [`CacheLookup::Miss`]; the others get
    /// [`CacheLookup::Wait`].
    pub async fn lookup_or_claim(&self, embedding: &Embedding) -> Result<CacheLookup, DomainError> {
        match self.find(embedding).await {
            Ok(Some(hit)) => {
                self.record_hit(hit.similarity, false);
                return Ok(CacheLookup::Hit(hit));
            }
            Ok(None) => {}
            Err(e) => {
                self.record_error(&e);
                return Err(e);
            }
        }

        let permit = match self
            .in_flight
            .claim(embedding, self.config.similarity_threshold)
        {
            FillClaim::Follower(waiter) => return Ok(CacheLookup::Wait(waiter)),
            FillClaim::Leader(permit) => permit,
        };

        // A fill may have completed between the first scan and the claim
        match self.find(embedding).await {
            Ok(Some(hit)) => {
                drop(permit);
                self.record_hit(hit.similarity, false);
                Ok(CacheLookup::Hit(hit))
            }
            Ok(None) => {
                self.record_miss();
                Ok(CacheLookup::Miss(permit))
            }
            Err(e) => {
                self.record_error(&e);
                self.record_miss();
                Ok(CacheLookup::Miss(permit))
            }
        }
    }

    /// Wait for a concurrent fill; `None` means it was abandoned and the
    /// caller should look up again
    pub async fn await_fill(&self, waiter: FillWaiter) -> Option<CacheHit> {
        let similarity = waiter.similarity();
        let answer = waiter.wait().await?;

        self.record_hit(similarity, true);
        Some(CacheHit {
            answer,
            similarity,
            shared: true,
        })
    }

    /// Store an answer under an embedding
    pub async fn store(
        &self,
        embedding: &Embedding,
        answer: CachedAnswer,
    ) -> Result<CacheEntry, DomainError> {
        let result = self.insert(embedding, answer).await;
        if let Err(ref e) = result {
            self.record_error(e);
        }
        result
    }

    async fn insert(
        &self,
        embedding: &Embedding,
        answer: CachedAnswer,
    ) -> Result<CacheEntry, DomainError> {
        let now = self.clock.now();

        if self.config.suppress_near_duplicates {
            let existing = self
                .index
                .nearest(embedding, self.config.similarity_threshold, self.cutoff(now))
                .await?;

            if let Some(existing) = existing {
                debug!(
                    entry_id = %existing.entry.id,
                    similarity = existing.similarity,
                    "Replacing near-duplicate cache entry"
                );
                self.index.remove(&existing.entry.id).await?;
            }
        }

        let entry = CacheEntry::new(embedding.clone(), answer, now);
        let evicted = self.index.insert(entry.clone()).await?;

        CacheCounters::bump(&self.counters.stored);
        if let Some(evicted) = evicted {
            CacheCounters::bump(&self.counters.evictions);
            metrics::counter!("semantic_cache_evictions_total").increment(1);
            debug!(entry_id = %evicted.id, "Evicted least recently used cache entry");
        }

        Ok(entry)
    }

    /// Store with a deadline on the index write
    pub async fn store_within(
        &self,
        embedding: &Embedding,
        answer: CachedAnswer,
        timeout: Duration,
    ) -> Result<CacheEntry, DomainError> {
        match tokio::time::timeout(timeout, self.insert(embedding, answer)).await {
            Ok(Ok(entry)) => Ok(entry),
            Ok(Err(e)) => {
                self.record_error(&e);
                Err(e)
            }
            Err(_) => {
                let e = DomainError::cache(format!(
                    "store timed out after {}ms",
                    timeout.as_millis()
                ));
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Release the answer of a fill to its waiters, then store it
    ///
    /// Waiters are answered before the index write starts, so a failed or
    /// timed out store never makes them fill again. The fill is unregistered
    /// once the store has finished or given up.
    pub async fn complete_fill(
        &self,
        permit: FillPermit,
        embedding: &Embedding,
        answer: CachedAnswer,
        timeout: Duration,
    ) -> Result<CacheEntry, DomainError> {
        let shared = Arc::new(answer);
        permit.publish(shared.clone());

        let result = self
            .store_within(embedding, Arc::unwrap_or_clone(shared), timeout)
            .await;
        drop(permit);
        result
    }

    /// Remove expired entries
    pub async fn expire(&self) -> Result<usize, DomainError> {
        let cutoff = self.cutoff(self.clock.now());
        match self.index.remove_expired(cutoff).await {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, "Removed expired cache entries");
                }
                Ok(removed)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Get cache statistics
    ///
    /// Counters are read without locking. `cache_size` falls back to 0 when
    /// the backend cannot be reached.
    pub async fn stats(&self) -> CacheStats {
        let cache_size = match self.index.live_count(self.cutoff(self.clock.now())).await {
            Ok(size) => size,
            Err(e) => {
                self.record_error(&e);
                0
            }
        };

        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);

        CacheStats {
            cache_size,
            max_cache_size: self.config.max_entries,
            total_hits: hits,
            total_misses: misses,
            total_requests: hits + misses,
            hit_rate: hit_rate(hits, misses),
            total_cached: self.counters.stored.load(Ordering::Relaxed),
            total_evictions: self.counters.evictions.load(Ordering::Relaxed),
            total_errors: self.counters.errors.load(Ordering::Relaxed),
            similarity_threshold: self.config.similarity_threshold,
            ttl_seconds: self.config.ttl_secs,
        }
    }

    /// Empty the cache, optionally resetting the counters
    pub async fn clear(&self, reset_stats: bool) -> Result<(), DomainError> {
        if let Err(e) = self.index.clear().await {
            self.record_error(&e);
            return Err(e);
        }

        if reset_stats {
            self.counters.reset();
        }

        info!(reset_stats, "Semantic cache cleared");
        Ok(())
    }

    /// Probe the backend
    pub async fn health(&self) -> CacheHealth {
        let backend = self.index.backend_name();
        match self.index.live_count(self.cutoff(self.clock.now())).await {
            Ok(entries) => CacheHealth {
                backend,
                healthy: true,
                entries: Some(entries),
                message: None,
            },
            Err(e) => CacheHealth {
                backend,
                healthy: false,
                entries: None,
                message: Some(e.to_string()),
            },
        }
    }

    /// Run [`expire`](Self::expire) every `interval` until the task is aborted
    ///
    /// Failures are logged and retried on the next tick.
    pub fn spawn_expiry_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.expire().await {
                    warn!(error = %e, "Cache expiry sweep failed, retrying next tick");
                }
            }
        })
    }
}
