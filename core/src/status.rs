//! A point-in-time snapshot of how far ingestion has progressed, polled by
//! whatever the node binary exposes to operators (spec.md §4.9).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexer_types::domain::OwnerMethod;
use indexer_types::ports::EthereumAdapter;

/// Counts of how a contract's `ownerAddress` ended up resolved, broken down
/// by `OwnerMethod` (spec.md §4.9's `contract_owner_stats`).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ContractOwnerStats {
    pub owner_call: u64,
    pub creator_fallback: u64,
    pub unknown: u64,
}

impl ContractOwnerStats {
    pub fn record(&mut self, method: OwnerMethod) {
        match method {
            OwnerMethod::OwnerCall => self.owner_call += 1,
            OwnerMethod::CreatorFallback => self.creator_fallback += 1,
            OwnerMethod::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct StatusSnapshot {
    pub most_recent_chain_block: u64,
    pub most_recent_synced_block: u64,
    pub last_synced_chunk: (u64, u64),
    pub is_listening: bool,
    pub contract_owner_stats: ContractOwnerStats,
}

/// Shared mutable state the pipeline updates as it runs; `snapshot()` reads
/// it without blocking the ingestion loop.
pub struct StatusReporter {
    adapter: Arc<dyn EthereumAdapter>,
    most_recent_synced_block: AtomicU64,
    last_chunk_from: AtomicU64,
    last_chunk_to: AtomicU64,
    is_listening: AtomicBool,
    owner_stats: std::sync::Mutex<ContractOwnerStats>,
}

impl StatusReporter {
    pub fn new(adapter: Arc<dyn EthereumAdapter>) -> Self {
        Self {
            adapter,
            most_recent_synced_block: AtomicU64::new(0),
            last_chunk_from: AtomicU64::new(0),
            last_chunk_to: AtomicU64::new(0),
            is_listening: AtomicBool::new(false),
            owner_stats: std::sync::Mutex::new(ContractOwnerStats::default()),
        }
    }

    pub fn record_chunk_synced(&self, from: u64, to: u64) {
        self.last_chunk_from.store(from, Ordering::SeqCst);
        self.last_chunk_to.store(to, Ordering::SeqCst);
        self.most_recent_synced_block.store(to, Ordering::SeqCst);
    }

    pub fn set_listening(&self, listening: bool) {
        self.is_listening.store(listening, Ordering::SeqCst);
    }

    pub fn record_owner_resolution(&self, method: OwnerMethod) {
        self.owner_stats.lock().expect("owner stats mutex poisoned").record(method);
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let most_recent_chain_block = self.adapter.latest_block().await.unwrap_or(0);
        StatusSnapshot {
            most_recent_chain_block,
            most_recent_synced_block: self.most_recent_synced_block.load(Ordering::SeqCst),
            last_synced_chunk: (self.last_chunk_from.load(Ordering::SeqCst), self.last_chunk_to.load(Ordering::SeqCst)),
            is_listening: self.is_listening.load(Ordering::SeqCst),
            contract_owner_stats: self.owner_stats.lock().expect("owner stats mutex poisoned").clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::errors::{LogSourceError, PluginError};
    use indexer_types::ports::{ContractCall, EthGetLogsFilter, Log};

    struct StubAdapter(u64);

    #[async_trait::async_trait]
    impl EthereumAdapter for StubAdapter {
        async fn latest_block(&self) -> Result<u64, LogSourceError> {
            Ok(self.0)
        }
        async fn get_logs(&self, _from: u64, _to: u64, _filter: &EthGetLogsFilter) -> Result<Vec<Log>, LogSourceError> {
            Ok(vec![])
        }
        async fn subscribe_logs(&self, _filter: EthGetLogsFilter) -> Result<std::pin::Pin<Box<dyn futures::Stream<Item = Result<Log, LogSourceError>> + Send>>, LogSourceError> {
            Err(LogSourceError::SubscriptionFailed("stub".into()))
        }
        async fn call(&self, _call: ContractCall) -> Result<Vec<ethabi::Token>, PluginError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn snapshot_reflects_recorded_progress() {
        let reporter = StatusReporter::new(Arc::new(StubAdapter(100)));
        reporter.record_chunk_synced(0, 49);
        reporter.set_listening(true);
        reporter.record_owner_resolution(OwnerMethod::OwnerCall);
        reporter.record_owner_resolution(OwnerMethod::Unknown);

        let snapshot = reporter.snapshot().await;
        assert_eq!(snapshot.most_recent_chain_block, 100);
        assert_eq!(snapshot.most_recent_synced_block, 49);
        assert_eq!(snapshot.last_synced_chunk, (0, 49));
        assert!(snapshot.is_listening);
        assert_eq!(snapshot.contract_owner_stats.owner_call, 1);
        assert_eq!(snapshot.contract_owner_stats.unknown, 1);
    }
}
