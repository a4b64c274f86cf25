//! The seams: traits implemented by `indexer-chain-ethereum` and
//! `indexer-store-postgres`, consumed by `indexer-core`. Keeping them here —
//! rather than in the crates that implement them — is the same split
//! `graph-node` uses between its `graph` crate (traits) and
//! `graph-chain-ethereum`/`graph-store-postgres` (implementations).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::bloom::BloomFilter;
use crate::domain::{Contract, Token};
use crate::errors::{LogSourceError, PersistenceError, PluginError};

/// A single decoded-but-not-yet-normalized Ethereum log entry (spec.md §4.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub block_number: u64,
    pub tx_index: u32,
    pub address: String,
    /// Up to 4 topics; `topics[0]` is the event signature hash.
    pub topics: Vec<String>,
    pub data: Vec<u8>,
}

/// Corresponds to an `eth_getLogs` call: addresses and/or topic0 filters.
#[derive(Clone, Debug, Default)]
pub struct EthGetLogsFilter {
    pub contracts: Vec<String>,
    pub topics: Vec<String>,
}

/// A contract view call: `tokenURI`, `uri`, `balanceOf`, `ownerOf`, `name`,
/// `symbol`, `owner` (spec.md §6).
#[derive(Clone, Debug)]
pub struct ContractCall {
    pub address: String,
    pub function: ethabi::Function,
    pub args: Vec<ethabi::Token>,
    /// `None` means "at the current chain head".
    pub at_block: Option<u64>,
}

/// Everything the core ingestion pipeline needs from a live or RPC-backed
/// Ethereum connection. Implemented by `indexer-chain-ethereum` against the
/// `web3` crate.
#[async_trait]
pub trait EthereumAdapter: Send + Sync {
    /// Find the most recent block number known to the node.
    async fn latest_block(&self) -> Result<u64, LogSourceError>;

    /// `eth_getLogs` over `[from, to]`, matching `filter`.
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &EthGetLogsFilter,
    ) -> Result<Vec<Log>, LogSourceError>;

    /// Open an `eth_subscribe("logs")` stream matching `filter`, starting
    /// after the chain's current state (i.e. "from now on").
    async fn subscribe_logs(
        &self,
        filter: EthGetLogsFilter,
    ) -> Result<std::pin::Pin<Box<dyn futures::Stream<Item = Result<Log, LogSourceError>> + Send>>, LogSourceError>;

    /// Perform an `eth_call`. Returns the ABI-decoded return values.
    async fn call(&self, call: ContractCall) -> Result<Vec<ethabi::Token>, PluginError>;
}

/// Abstract contract for the token/contract/filter repositories (spec.md §4.0,
/// shape specified in full in SPEC_FULL.md §10). Implemented by
/// `indexer-store-postgres`.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn bulk_upsert_tokens(&self, tokens: Vec<Token>) -> Result<(), PersistenceError>;

    async fn bulk_upsert_contracts(&self, contracts: Vec<Contract>) -> Result<(), PersistenceError>;

    async fn get_token_uri(
        &self,
        contract_address: &str,
        token_id: &str,
    ) -> Result<Option<String>, PersistenceError>;

    async fn get_token_balance(
        &self,
        contract_address: &str,
        token_id: &str,
        holder: &str,
    ) -> Result<Option<u64>, PersistenceError>;

    /// `GetAddressFilterBatch` (spec.md §4.3). Each element of the result
    /// corresponds by index to the matching `(from, to)` request; a missing
    /// row is surfaced as `Err(PersistenceError::NotFound)`, which callers
    /// map to the domain-level `FilterManagerError::NoFilter`.
    async fn get_address_filter_batch(
        &self,
        ranges: &[(u64, u64)],
    ) -> Result<Vec<Result<BloomFilter, PersistenceError>>, PersistenceError>;

    async fn bulk_upsert_address_filters(
        &self,
        filters: HashMap<(u64, u64), BloomFilter>,
    ) -> Result<(), PersistenceError>;

    async fn get_log_cache(&self, from_block: u64, to_block: u64) -> Result<Option<Vec<u8>>, PersistenceError>;

    async fn put_log_cache(&self, from_block: u64, to_block: u64, payload: &[u8]) -> Result<(), PersistenceError>;

    async fn put_log_cache_error(&self, from_block: u64, to_block: u64, payload: &[u8]) -> Result<(), PersistenceError>;
}

/// The literal object-store keys spec.md §6 specifies for the log cache.
pub fn log_cache_key(from_block: u64, to_block: u64) -> String {
    format!("{from_block}-{to_block}")
}

pub fn log_cache_error_key(from_block: u64, to_block: u64) -> String {
    format!("ERR-{from_block}-{to_block}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_match_the_spec_format() {
        assert_eq!(log_cache_key(100, 150), "100-150");
        assert_eq!(log_cache_error_key(100, 150), "ERR-100-150");
    }
}
