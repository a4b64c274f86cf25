//! Per-chunk address bloom filters used to skip ranges that could not
//! possibly contain a given contract during a deep refresh (spec.md §4.3).
//!
//! Filters are small (`m = 100_000` bits) but a full deep refresh walks
//! thousands of chunks, so a capacity-bounded LRU sits in front of
//! `PersistencePort`. The teacher uses `lru_time_cache` for its subgraph
//! instance cache, but that crate evicts on TTL, not capacity, and gives no
//! hook to run on eviction; `lru::LruCache::put` returns the evicted entry
//! directly, which is what lets an evicted filter be spilled to a scratch
//! file instead of silently dropped (see DESIGN.md).

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use slog::{debug, Logger};
use tempfile::TempDir;

use indexer_types::bloom::BloomFilter;
use indexer_types::errors::FilterManagerError;
use indexer_types::ports::PersistencePort;

const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Aligns block ranges to fixed-size chunks and serves bloom filters for
/// them, backed by an in-memory LRU with a disk-backed overflow.
pub struct BlockFilterManager {
    persistence: Arc<dyn PersistencePort>,
    chunk_size: u64,
    cache: Mutex<LruCache<(u64, u64), BloomFilter>>,
    spill_dir: TempDir,
    logger: Logger,
}

impl BlockFilterManager {
    pub fn new(persistence: Arc<dyn PersistencePort>, chunk_size: u64, logger: Logger) -> Result<Self, FilterManagerError> {
        let spill_dir = tempfile::Builder::new()
            .prefix("indexer-filter-chunks-")
            .tempdir()
            .map_err(FilterManagerError::Io)?;
        Ok(Self {
            persistence,
            chunk_size: chunk_size.max(1),
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap())),
            spill_dir,
            logger,
        })
    }

    /// The `[from, to]` chunk boundary a block number falls into.
    pub fn chunk_for_block(&self, block_number: u64) -> (u64, u64) {
        let start = (block_number / self.chunk_size) * self.chunk_size;
        (start, start + self.chunk_size - 1)
    }

    /// Returns whether `address` could plausibly appear in `chunk`'s range,
    /// fetching and caching the chunk's filter if it is not already hot.
    pub async fn may_contain(&self, chunk: (u64, u64), address: &str) -> Result<bool, FilterManagerError> {
        let filter = self.get_or_fetch(chunk).await?;
        Ok(filter.contains(&address.to_lowercase()))
    }

    async fn get_or_fetch(&self, chunk: (u64, u64)) -> Result<BloomFilter, FilterManagerError> {
        if let Some(filter) = self.cache_get(chunk) {
            return Ok(filter);
        }
        if let Some(filter) = self.spill_read(chunk) {
            self.cache_put(chunk, filter.clone());
            return Ok(filter);
        }

        let mut results = self
            .persistence
            .get_address_filter_batch(&[chunk])
            .await
            .map_err(|e| FilterManagerError::Repository(e.to_string()))?;
        let filter = results
            .pop()
            .ok_or(FilterManagerError::NoFilter(chunk.0, chunk.1))?
            .map_err(|_| FilterManagerError::NoFilter(chunk.0, chunk.1))?;

        self.cache_put(chunk, filter.clone());
        Ok(filter)
    }

    /// Persists freshly built filters for a batch of chunks, priming both the
    /// backing store and the local cache (spec.md §4.3's "deep refresh warms
    /// the filters it will need next").
    pub async fn prime(&self, filters: HashMap<(u64, u64), BloomFilter>) -> Result<(), FilterManagerError> {
        for (chunk, filter) in &filters {
            self.cache_put(*chunk, filter.clone());
        }
        self.persistence
            .bulk_upsert_address_filters(filters)
            .await
            .map_err(|e| FilterManagerError::Priming(e.to_string()))
    }

    fn cache_get(&self, chunk: (u64, u64)) -> Option<BloomFilter> {
        self.cache.lock().expect("filter cache mutex poisoned").get(&chunk).cloned()
    }

    fn cache_put(&self, chunk: (u64, u64), filter: BloomFilter) {
        let evicted = self.cache.lock().expect("filter cache mutex poisoned").push(chunk, filter);
        if let Some((ev_chunk, ev_filter)) = evicted {
            self.spill_write(ev_chunk, &ev_filter);
        }
    }

    fn spill_path(&self, chunk: (u64, u64)) -> PathBuf {
        self.spill_dir.path().join(format!("{}-{}.bloom", chunk.0, chunk.1))
    }

    fn spill_write(&self, chunk: (u64, u64), filter: &BloomFilter) {
        let path = self.spill_path(chunk);
        match serde_json::to_vec(filter) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&path, bytes) {
                    debug!(self.logger, "failed to spill evicted filter chunk to disk";
                        "chunk_from" => chunk.0, "chunk_to" => chunk.1, "error" => err.to_string());
                }
            }
            Err(err) => {
                debug!(self.logger, "failed to serialize evicted filter chunk"; "error" => err.to_string());
            }
        }
    }

    fn spill_read(&self, chunk: (u64, u64)) -> Option<BloomFilter> {
        let path = self.spill_path(chunk);
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_boundaries_align_to_chunk_size() {
        let persistence = Arc::new(StubPersistence::default()) as Arc<dyn PersistencePort>;
        let manager = BlockFilterManager::new(persistence, 10_000, test_logger()).unwrap();
        assert_eq!(manager.chunk_for_block(0), (0, 9_999));
        assert_eq!(manager.chunk_for_block(9_999), (0, 9_999));
        assert_eq!(manager.chunk_for_block(10_000), (10_000, 19_999));
        assert_eq!(manager.chunk_for_block(25_003), (20_000, 29_999));
    }

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[derive(Default)]
    struct StubPersistence;

    #[async_trait::async_trait]
    impl PersistencePort for StubPersistence {
        async fn bulk_upsert_tokens(&self, _tokens: Vec<indexer_types::domain::Token>) -> Result<(), indexer_types::errors::PersistenceError> {
            Ok(())
        }
        async fn bulk_upsert_contracts(&self, _contracts: Vec<indexer_types::domain::Contract>) -> Result<(), indexer_types::errors::PersistenceError> {
            Ok(())
        }
        async fn get_token_uri(&self, _c: &str, _t: &str) -> Result<Option<String>, indexer_types::errors::PersistenceError> {
            Ok(None)
        }
        async fn get_token_balance(&self, _c: &str, _t: &str, _h: &str) -> Result<Option<u64>, indexer_types::errors::PersistenceError> {
            Ok(None)
        }
        async fn get_address_filter_batch(&self, ranges: &[(u64, u64)]) -> Result<Vec<Result<BloomFilter, indexer_types::errors::PersistenceError>>, indexer_types::errors::PersistenceError> {
            Ok(ranges.iter().map(|_| Ok(BloomFilter::for_address_window())).collect())
        }
        async fn bulk_upsert_address_filters(&self, _filters: HashMap<(u64, u64), BloomFilter>) -> Result<(), indexer_types::errors::PersistenceError> {
            Ok(())
        }
        async fn get_log_cache(&self, _from: u64, _to: u64) -> Result<Option<Vec<u8>>, indexer_types::errors::PersistenceError> {
            Ok(None)
        }
        async fn put_log_cache(&self, _from: u64, _to: u64, _payload: &[u8]) -> Result<(), indexer_types::errors::PersistenceError> {
            Ok(())
        }
        async fn put_log_cache_error(&self, _from: u64, _to: u64, _payload: &[u8]) -> Result<(), indexer_types::errors::PersistenceError> {
            Ok(())
        }
    }
}
