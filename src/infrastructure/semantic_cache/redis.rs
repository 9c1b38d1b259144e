//! Redis-backed similarity index
//!
//! Entries live as JSON records in one hash per namespace, so every
//! gateway instance pointed at the same namespace shares the cache.
//! Nearest-neighbour search is a linear scan over the hash.
//!
//! Keys per namespace: `entries` (id -> record), `lru` (id scored by last
//! access tick), `hits` and `accessed` (hit state), `tick` and `seq` counters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::DomainError;
use crate::domain::embedding::Embedding;
use crate::domain::semantic_cache::{CacheEntry, IndexMatch, SimilarityIndex};

/// Configuration for the Redis index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisIndexConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    #[serde(default = "default_url")]
    pub url: String,
    /// Key prefix for namespacing
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    "semantic_cache".to_string()
}

impl Default for RedisIndexConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            namespace: default_namespace(),
        }
    }
}

impl RedisIndexConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn entries_key(&self) -> String {
        format!("{}:entries", self.namespace)
    }

    fn lru_key(&self) -> String {
        format!("{}:lru", self.namespace)
    }

    fn hits_key(&self) -> String {
        format!("{}:hits", self.namespace)
    }

    fn accessed_key(&self) -> String {
        format!("{}:accessed", self.namespace)
    }

    fn tick_key(&self) -> String {
        format!("{}:tick", self.namespace)
    }

    fn seq_key(&self) -> String {
        format!("{}:seq", self.namespace)
    }
}

/// What is stored per hash field; never rewritten after insert
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    entry: CacheEntry,
    seq: u64,
}

/// Evicts the least recently accessed entry when full, then inserts.
///
/// KEYS: entries, lru, hits, accessed, tick. ARGV: id, record, max_entries.
/// Returns the evicted record or nil.
const INSERT_SCRIPT: &str = r#"
local evicted = false
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 0
    and redis.call('HLEN', KEYS[1]) >= tonumber(ARGV[3]) then
    local oldest = redis.call('ZRANGE', KEYS[2], 0, 0)[1]
    if oldest then
        evicted = redis.call('HGET', KEYS[1], oldest)
        redis.call('HDEL', KEYS[1], oldest)
        redis.call('ZREM', KEYS[2], oldest)
        redis.call('HDEL', KEYS[3], oldest)
        redis.call('HDEL', KEYS[4], oldest)
    end
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
redis.call('ZADD', KEYS[2], redis.call('INCR', KEYS[5]), ARGV[1])
return evicted
"#;

/// Records a hit only if the entry still exists.
///
/// KEYS: entries, lru, hits, accessed, tick. ARGV: id, accessed_at.
/// Returns {record, hit_count} or nil.
const TOUCH_SCRIPT: &str = r#"
local record = redis.call('HGET', KEYS[1], ARGV[1])
if not record then
    return false
end
local hits = redis.call('HINCRBY', KEYS[3], ARGV[1], 1)
redis.call('HSET', KEYS[4], ARGV[1], ARGV[2])
redis.call('ZADD', KEYS[2], redis.call('INCR', KEYS[5]), ARGV[1])
return {record, hits}
"#;

/// Redis similarity index
///
/// Entry records are immutable; hit counts, access times and recency live in
/// side structures so hits never rewrite a record. Insert-with-eviction and
/// touch run as Lua scripts, so a touch cannot resurrect an entry that was
/// evicted or cleared, and concurrent inserts cannot exceed `max_entries`.
#[derive(Clone)]
pub struct RedisSimilarityIndex {
    connection: ConnectionManager,
    config: RedisIndexConfig,
    max_entries: usize,
    fixed_dimensions: Option<usize>,
    insert_script: Arc<Script>,
    touch_script: Arc<Script>,
}

impl fmt::Debug for RedisSimilarityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSimilarityIndex")
            .field("config", &self.config)
            .field("max_entries", &self.max_entries)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisSimilarityIndex {
    /// Connect to Redis
    pub async fn new(
        config: RedisIndexConfig,
        max_entries: usize,
        fixed_dimensions: Option<usize>,
    ) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            max_entries: max_entries.max(1),
            fixed_dimensions,
            insert_script: Arc::new(Script::new(INSERT_SCRIPT)),
            touch_script: Arc::new(Script::new(TOUCH_SCRIPT)),
        })
    }

    fn script_keys(&self) -> [String; 5] {
        [
            self.config.entries_key(),
            self.config.lru_key(),
            self.config.hits_key(),
            self.config.accessed_key(),
            self.config.tick_key(),
        ]
    }

    /// Read records plus their hit state in one transaction
    async fn load_all(&self) -> Result<Vec<StoredRecord>, DomainError> {
        let mut conn = self.connection.clone();
        let (raw, hits, accessed): (
            HashMap<String, String>,
            HashMap<String, u64>,
            HashMap<String, String>,
        ) = redis::pipe()
            .atomic()
            .hgetall(self.config.entries_key())
            .hgetall(self.config.hits_key())
            .hgetall(self.config.accessed_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to read cache entries: {}", e)))?;

        Ok(raw
            .into_iter()
            .filter_map(|(id, json)| match decode_record(&json) {
                Ok(mut record) => {
                    apply_hits(
                        &mut record.entry,
                        hits.get(&id).copied(),
                        accessed.get(&id).map(String::as_str),
                    );
                    Some(record)
                }
                Err(e) => {
                    warn!(entry_id = %id, error = %e, "Skipping unreadable cache entry");
                    None
                }
            })
            .collect())
    }

    async fn next_seq(&self) -> Result<u64, DomainError> {
        let mut conn = self.connection.clone();
        conn.incr(self.config.seq_key(), 1u64)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to advance insert counter: {}", e)))
    }

    /// Delete entries together with their hit state
    async fn delete_ids(&self, ids: &[String]) -> Result<usize, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let (removed,): (usize,) = redis::pipe()
            .atomic()
            .hdel(self.config.entries_key(), ids)
            .zrem(self.config.lru_key(), ids)
            .ignore()
            .hdel(self.config.hits_key(), ids)
            .ignore()
            .hdel(self.config.accessed_key(), ids)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete entries: {}", e)))?;

        Ok(removed)
    }

    fn expected_dimensions(&self, records: &[StoredRecord]) -> Option<usize> {
        self.fixed_dimensions
            .or_else(|| records.first().map(|r| r.entry.embedding.dimensions()))
    }
}

fn decode_record(json: &str) -> Result<StoredRecord, DomainError> {
    serde_json::from_str(json)
        .map_err(|e| DomainError::cache(format!("Corrupt cache entry: {}", e)))
}

/// Overlay the hit count and last access kept outside the record
fn apply_hits(entry: &mut CacheEntry, hits: Option<u64>, accessed: Option<&str>) {
    if let Some(hits) = hits {
        entry.hit_count = hits;
    }

    if let Some(at) = accessed.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) {
        entry.last_accessed = at.with_timezone(&Utc);
    }
}

fn check_dimensions(expected: Option<usize>, embedding: &Embedding) -> Result<(), DomainError> {
    match expected {
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

#[async_trait]
impl SimilarityIndex for RedisSimilarityIndex {
    async fn nearest(
        &self,
        embedding: &Embedding,
        min_similarity: f32,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<IndexMatch>, DomainError> {
        let records = self.load_all().await?;
        check_dimensions(self.expected_dimensions(&records), embedding)?;

        let mut best: Option<(StoredRecord, f32)> = None;

        for record in records {
            if !record.entry.is_live(cutoff) {
                continue;
            }

            let similarity = embedding.cosine_similarity(&record.entry.embedding)?;
            if similarity < min_similarity {
                continue;
            }

            let better = match &best {
                None => true,
                Some((current, current_similarity)) => {
                    similarity > *current_similarity
                        || (similarity == *current_similarity
                            && (record.entry.created_at, record.seq)
                                > (current.entry.created_at, current.seq))
                }
            };

            if better {
                best = Some((record, similarity));
            }
        }

        Ok(best.map(|(record, similarity)| IndexMatch {
            entry: record.entry,
            similarity,
        }))
    }

    async fn insert(&self, entry: CacheEntry) -> Result<Option<CacheEntry>, DomainError> {
        let records = self.load_all().await?;
        check_dimensions(self.expected_dimensions(&records), &entry.embedding)?;

        let id = entry.id.clone();
        let record = StoredRecord {
            entry,
            seq: self.next_seq().await?,
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| DomainError::internal(format!("Failed to serialize entry: {}", e)))?;

        let mut conn = self.connection.clone();
        let evicted: Option<String> = self
            .insert_script
            .key(&self.script_keys()[..])
            .arg(&id)
            .arg(json)
            .arg(self.max_entries)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to write entry '{}': {}", id, e)))?;

        evicted
            .map(|json| decode_record(&json).map(|record| record.entry))
            .transpose()
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.delete_ids(&[id.to_string()]).await? > 0)
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<Option<CacheEntry>, DomainError> {
        let mut conn = self.connection.clone();
        let touched: Option<(String, u64)> = self
            .touch_script
            .key(&self.script_keys()[..])
            .arg(id)
            .arg(at.to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to touch entry '{}': {}", id, e)))?;

        let Some((json, hits)) = touched else {
            return Ok(None);
        };

        let mut entry = decode_record(&json)?.entry;
        entry.hit_count = hits;
        entry.last_accessed = at;
        Ok(Some(entry))
    }

    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let expired: Vec<String> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| !r.entry.is_live(cutoff))
            .map(|r| r.entry.id)
            .collect();

        self.delete_ids(&expired).await
    }

    async fn live_count(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .filter(|r| r.entry.is_live(cutoff))
            .count())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut keys = self.script_keys().to_vec();
        keys.push(self.config.seq_key());

        let mut conn = self.connection.clone();
        let _: () = conn
            .del(keys)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to clear cache: {}", e)))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
