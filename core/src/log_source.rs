//! Windowed `eth_getLogs` polling with an on-disk log cache and a live-tail
//! handoff to `eth_subscribe` (spec.md §4.1).

use std::sync::Arc;
use std::time::Duration;

use slog::{debug, info, warn, Logger};

use indexer_types::constants::DEFAULT_MAX_RATE_LIMIT_RETRIES;
use indexer_types::errors::LogSourceError;
use indexer_types::ports::{log_cache_error_key, log_cache_key, EthGetLogsFilter, EthereumAdapter, Log, PersistencePort};

/// Exponential backoff schedule applied after a rate-limited `eth_getLogs`
/// call, capped at `MAX_BACKOFF`.
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_RATE_LIMIT_ATTEMPTS: u32 = DEFAULT_MAX_RATE_LIMIT_RETRIES;

pub struct LogSource {
    adapter: Arc<dyn EthereumAdapter>,
    persistence: Arc<dyn PersistencePort>,
    window_size: u64,
    logger: Logger,
}

impl LogSource {
    pub fn new(adapter: Arc<dyn EthereumAdapter>, persistence: Arc<dyn PersistencePort>, window_size: u64, logger: Logger) -> Self {
        Self { adapter, persistence, window_size: window_size.max(1), logger }
    }

    /// Walks `[from, to]` in `window_size`-block windows, consulting the log
    /// cache before each `eth_getLogs` call and writing the window's result
    /// (or error) back to it. A window that keeps rate-limiting past
    /// `MAX_RATE_LIMIT_ATTEMPTS` surfaces `LogSourceError::RateLimited`
    /// and aborts the whole walk rather than silently skip blocks.
    pub async fn backfill(&self, from: u64, to: u64, filter: &EthGetLogsFilter) -> Result<Vec<Log>, LogSourceError> {
        let mut logs = Vec::new();
        let mut window_start = from;
        while window_start <= to {
            let window_end = (window_start + self.window_size - 1).min(to);
            let mut window_logs = self.fetch_window(window_start, window_end, filter).await?;
            logs.append(&mut window_logs);
            window_start = window_end + 1;
        }
        Ok(logs)
    }

    async fn fetch_window(&self, from: u64, to: u64, filter: &EthGetLogsFilter) -> Result<Vec<Log>, LogSourceError> {
        if let Some(cached) = self.read_cache(from, to).await {
            debug!(self.logger, "log window served from cache"; "from" => from, "to" => to);
            return Ok(cached);
        }

        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_RATE_LIMIT_ATTEMPTS {
            match self.adapter.get_logs(from, to, filter).await {
                Ok(logs) => {
                    self.write_cache(from, to, &logs).await;
                    return Ok(logs);
                }
                Err(LogSourceError::RateLimited { .. }) => {
                    warn!(self.logger, "rate limited fetching log window, backing off";
                        "from" => from, "to" => to, "attempt" => attempt, "backoff_ms" => backoff.as_millis() as u64);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(other) => {
                    self.write_cache_error(from, to, &other).await;
                    return Err(other);
                }
            }
        }
        Err(LogSourceError::RateLimited { attempts: MAX_RATE_LIMIT_ATTEMPTS })
    }

    async fn read_cache(&self, from: u64, to: u64) -> Option<Vec<Log>> {
        let payload = self.persistence.get_log_cache(from, to).await.ok().flatten()?;
        serde_json::from_slice::<Vec<CachedLog>>(&payload).ok().map(|cached| cached.into_iter().map(Into::into).collect())
    }

    async fn write_cache(&self, from: u64, to: u64, logs: &[Log]) {
        let cached: Vec<CachedLog> = logs.iter().cloned().map(Into::into).collect();
        if let Ok(payload) = serde_json::to_vec(&cached) {
            let _ = self.persistence.put_log_cache(from, to, &payload).await;
        }
    }

    async fn write_cache_error(&self, from: u64, to: u64, error: &LogSourceError) {
        let payload = error.to_string().into_bytes();
        let _ = self.persistence.put_log_cache_error(from, to, &payload).await;
    }

    /// Opens the live tail. Intended to be spawned once the backfill catches
    /// up to the chain head (spec.md §4.1/§5: pipeline hands off from
    /// polling to subscription mode once `most_recent_synced_block` reaches
    /// `most_recent_chain_block`).
    pub async fn subscribe(&self, filter: EthGetLogsFilter) -> Result<std::pin::Pin<Box<dyn futures::Stream<Item = Result<Log, LogSourceError>> + Send>>, LogSourceError> {
        info!(self.logger, "opening live log subscription");
        self.adapter.subscribe_logs(filter).await
    }

    pub fn cache_keys(from: u64, to: u64) -> (String, String) {
        (log_cache_key(from, to), log_cache_error_key(from, to))
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct CachedLog {
    block_number: u64,
    tx_index: u32,
    address: String,
    topics: Vec<String>,
    data: Vec<u8>,
}

impl From<Log> for CachedLog {
    fn from(log: Log) -> Self {
        Self { block_number: log.block_number, tx_index: log.tx_index, address: log.address, topics: log.topics, data: log.data }
    }
}

impl From<CachedLog> for Log {
    fn from(cached: CachedLog) -> Self {
        Self { block_number: cached.block_number, tx_index: cached.tx_index, address: cached.address, topics: cached.topics, data: cached.data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::errors::PersistenceError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn sample_log(block_number: u64) -> Log {
        Log { block_number, tx_index: 0, address: "0xabc".into(), topics: vec!["0x01".into()], data: vec![] }
    }

    struct StubAdapter {
        logs_by_window: Mutex<HashMap<(u64, u64), Vec<Log>>>,
        calls: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl EthereumAdapter for StubAdapter {
        async fn latest_block(&self) -> Result<u64, LogSourceError> {
            Ok(0)
        }
        async fn get_logs(&self, from: u64, to: u64, _filter: &EthGetLogsFilter) -> Result<Vec<Log>, LogSourceError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.logs_by_window.lock().unwrap().get(&(from, to)).cloned().unwrap_or_default())
        }
        async fn subscribe_logs(&self, _filter: EthGetLogsFilter) -> Result<std::pin::Pin<Box<dyn futures::Stream<Item = Result<Log, LogSourceError>> + Send>>, LogSourceError> {
            Err(LogSourceError::SubscriptionFailed("not implemented in stub".into()))
        }
        async fn call(&self, _call: indexer_types::ports::ContractCall) -> Result<Vec<ethabi::Token>, indexer_types::errors::PluginError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct StubPersistence {
        cache: Mutex<HashMap<(u64, u64), Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl PersistencePort for StubPersistence {
        async fn bulk_upsert_tokens(&self, _tokens: Vec<indexer_types::domain::Token>) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn bulk_upsert_contracts(&self, _contracts: Vec<indexer_types::domain::Contract>) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn get_token_uri(&self, _c: &str, _t: &str) -> Result<Option<String>, PersistenceError> {
            Ok(None)
        }
        async fn get_token_balance(&self, _c: &str, _t: &str, _h: &str) -> Result<Option<u64>, PersistenceError> {
            Ok(None)
        }
        async fn get_address_filter_batch(&self, ranges: &[(u64, u64)]) -> Result<Vec<Result<indexer_types::bloom::BloomFilter, PersistenceError>>, PersistenceError> {
            Ok(ranges.iter().map(|_| Ok(indexer_types::bloom::BloomFilter::for_address_window())).collect())
        }
        async fn bulk_upsert_address_filters(&self, _filters: HashMap<(u64, u64), indexer_types::bloom::BloomFilter>) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn get_log_cache(&self, from_block: u64, to_block: u64) -> Result<Option<Vec<u8>>, PersistenceError> {
            Ok(self.cache.lock().unwrap().get(&(from_block, to_block)).cloned())
        }
        async fn put_log_cache(&self, from_block: u64, to_block: u64, payload: &[u8]) -> Result<(), PersistenceError> {
            self.cache.lock().unwrap().insert((from_block, to_block), payload.to_vec());
            Ok(())
        }
        async fn put_log_cache_error(&self, _from_block: u64, _to_block: u64, _payload: &[u8]) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn backfill_splits_into_windows_and_concatenates_results() {
        let mut logs_by_window = HashMap::new();
        logs_by_window.insert((0, 1), vec![sample_log(0), sample_log(1)]);
        logs_by_window.insert((2, 3), vec![sample_log(2)]);
        let adapter = Arc::new(StubAdapter { logs_by_window: Mutex::new(logs_by_window), calls: Mutex::new(0) });
        let persistence = Arc::new(StubPersistence::default());
        let source = LogSource::new(adapter, persistence, 2, test_logger());

        let logs = source.backfill(0, 3, &EthGetLogsFilter::default()).await.unwrap();
        assert_eq!(logs.len(), 3);
    }

    #[tokio::test]
    async fn second_backfill_of_same_range_is_served_from_cache() {
        let mut logs_by_window = HashMap::new();
        logs_by_window.insert((0, 9), vec![sample_log(0)]);
        let adapter = Arc::new(StubAdapter { logs_by_window: Mutex::new(logs_by_window), calls: Mutex::new(0) });
        let persistence = Arc::new(StubPersistence::default());
        let source = LogSource::new(adapter.clone(), persistence, 10, test_logger());

        source.backfill(0, 9, &EthGetLogsFilter::default()).await.unwrap();
        source.backfill(0, 9, &EthGetLogsFilter::default()).await.unwrap();

        assert_eq!(*adapter.calls.lock().unwrap(), 1);
    }
}
