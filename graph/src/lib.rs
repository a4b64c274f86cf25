//! Domain model and port traits for the NFT ingestion core.
//!
//! This crate has no I/O of its own — it is the vocabulary that
//! `indexer-core`, `indexer-chain-ethereum`, and `indexer-store-postgres`
//! all share, the same role `graph` plays relative to `graph-core` and
//! `graph-chain-ethereum` upstream.

pub mod bloom;
pub mod constants;
pub mod domain;
pub mod errors;
pub mod metrics;
pub mod ports;
pub mod value;

pub use constants::{TOPIC_TRANSFER, TOPIC_TRANSFER_BATCH, TOPIC_TRANSFER_SINGLE, TOPIC_URI};

pub mod prelude {
    pub use crate::bloom::BloomFilter;
    pub use crate::constants::*;
    pub use crate::domain::*;
    pub use crate::errors::*;
    pub use crate::ports::*;
    pub use crate::value::{find_first_string, Value};
}
