//! Structured error types, one enum per component (spec.md §7), composed into
//! `IndexerError` at the pipeline boundary.
//!
//! This replaces the teacher's `failure` crate with `thiserror`: `failure`
//! has been unmaintained since `std::error::Error` grew `source()`, and the
//! rest of the modern ecosystem (including `graph-node`'s own later history)
//! moved to `thiserror`/`anyhow`. See DESIGN.md.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("rate limited by RPC endpoint after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("rpc call failed: {0}")]
    Rpc(String),
    #[error("live subscription failed: {0}")]
    SubscriptionFailed(String),
    #[error("log cache backend error: {0}")]
    Cache(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log had {found} topics, expected at least {expected} for {event}")]
    TooFewTopics { event: &'static str, expected: usize, found: usize },
    #[error("ABI decode failure for {event}: {source}")]
    AbiDecode { event: &'static str, source: ethabi::Error },
}

#[derive(Debug, Error)]
pub enum FilterManagerError {
    #[error("no filter present for range ({0}, {1})")]
    NoFilter(u64, u64),
    #[error("repository batch load failed: {0}")]
    Repository(String),
    #[error("filter chunk IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("filter chunk priming failed: {0}")]
    Priming(String),
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin worker timed out")]
    Timeout,
    #[error("RPC call failed: {0}")]
    Rpc(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("dns resolution error: {0}")]
    Dns(String),
    #[error("malformed URL: {0}")]
    Url(String),
    #[error("http status {status} fetching {url}")]
    HttpStatus { status: u16, url: String },
    #[error("resource not found at {0}")]
    NotFound(String),
    #[error("contract reverted on tokenURI/uri")]
    TokenUriNotFound,
    #[error("base64 decode failed for all known alphabets")]
    Base64Decode,
    #[error("arweave manifest decode failed: {0}")]
    ArweaveManifest(String),
    #[error("custom handler error: {0}")]
    CustomHandler(String),
    #[error("unknown/unparseable URI: {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("row not found")]
    NotFound,
    #[error("bulk upsert of {count} rows failed: {source}")]
    BulkUpsert { count: usize, source: Box<PersistenceError> },
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("invalid refresh range: from ({from}) > to ({to})")]
    InvalidRange { from: u64, to: u64 },
    #[error("refresh request must specify at least one of owner, contract, token")]
    EmptyCriteria,
    #[error(transparent)]
    LogSource(#[from] LogSourceError),
    #[error(transparent)]
    FilterManager(#[from] FilterManagerError),
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    LogSource(#[from] LogSourceError),
    #[error(transparent)]
    FilterManager(#[from] FilterManagerError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error("pipeline cancelled")]
    Cancelled,
}
