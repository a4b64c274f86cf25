//! Core data model shared by every stage of the ingestion pipeline.
//!
//! These types are intentionally chain-agnostic at the Rust-type level (addresses
//! and token ids are stored as canonical lowercase hex strings, not `web3::types::Address`)
//! so that `indexer-core` does not need to depend on `indexer-chain-ethereum`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// ERC-721 vs ERC-1155. Every `Transfer` and `Token` carries one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    Erc721,
    Erc1155,
}

/// Lexicographic `(blockNumber, txIndex)` — the total order over on-chain events.
///
/// Invariant: a stored fact for a token is never overwritten by one with a
/// strictly smaller `OrderKey` (spec.md §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub block_number: u64,
    pub tx_index: u32,
}

impl OrderKey {
    pub const fn new(block_number: u64, tx_index: u32) -> Self {
        Self { block_number, tx_index }
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.block_number, self.tx_index).cmp(&(other.block_number, other.tx_index))
    }
}

/// `(contractAddress, tokenId)` — the reduction key used inside the pipeline.
///
/// Distinct from the public identifier, which also carries `chain` (see `Token`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIdentifier {
    pub contract_address: String,
    pub token_id: String,
}

impl TokenIdentifier {
    pub fn new(contract_address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self { contract_address: contract_address.into(), token_id: token_id.into() }
    }
}

/// The pipeline's atomic input. Immutable after decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub chain: String,
    pub contract_address: String,
    pub from: String,
    pub to: String,
    pub token_id: String,
    pub token_type: TokenType,
    /// Always 1 for ERC-721.
    pub amount: u64,
    pub block_number: u64,
    pub tx_index: u32,
}

impl Transfer {
    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(self.block_number, self.tx_index)
    }

    pub fn token_identifier(&self) -> TokenIdentifier {
        TokenIdentifier::new(self.contract_address.clone(), self.token_id.clone())
    }
}

/// Anything keyed by an `OrderKey` that the `Reducer` can compare for "latest wins".
pub trait HasOrderKey {
    fn order_key(&self) -> OrderKey;
}

/// "At OrderKey, the owner of this ERC-721 token was `address`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAtBlock {
    pub token: TokenIdentifier,
    pub address: String,
    pub order_key: OrderKey,
}

impl HasOrderKey for OwnerAtBlock {
    fn order_key(&self) -> OrderKey {
        self.order_key
    }
}

/// ERC-1155 only: post-transfer holdings of both parties as of `order_key`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalances {
    pub token: TokenIdentifier,
    pub from: String,
    pub to: String,
    pub from_amount: u64,
    pub to_amount: u64,
    pub order_key: OrderKey,
}

impl HasOrderKey for TokenBalances {
    fn order_key(&self) -> OrderKey {
        self.order_key
    }
}

/// The URI as resolved at `order_key`. `{id}` substrings have already been
/// substituted with the hex-padded token id before this is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUri {
    pub token: TokenIdentifier,
    pub uri: String,
    pub order_key: OrderKey,
}

impl HasOrderKey for TokenUri {
    fn order_key(&self) -> OrderKey {
        self.order_key
    }
}

/// Free-form metadata retrieved via the `MetadataResolver`, keyed by string.
pub type TokenMetadata = BTreeMap<String, Value>;

/// The materialized row persisted by `BulkUpsert`.
///
/// Mutated only by bulk upsert keyed on `(contract, tokenId, owner)`; never
/// deleted by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub chain: String,
    pub contract_address: String,
    pub token_id: String,
    pub owner_address: String,
    /// Hex string; `"1"` for ERC-721.
    pub quantity: String,
    pub token_type: TokenType,
    pub token_uri: Option<String>,
    pub token_metadata: Option<TokenMetadata>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Ascending by `OrderKey`.
    pub ownership_history: Vec<OwnerAtBlock>,
    pub block_number: u64,
}

/// Derived opportunistically from transfers; upserted in the same transaction
/// as the tokens that reference it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contract {
    pub address: String,
    pub chain: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub owner_address: Option<String>,
    pub creator_address: Option<String>,
    pub owner_method: Option<OwnerMethod>,
    pub latest_block: u64,
}

/// How a contract's `ownerAddress` was resolved; tracked for the
/// `contract_owner_stats` snapshot exposed by `StatusReporter`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerMethod {
    /// `owner()` view call succeeded.
    OwnerCall,
    /// `owner()` reverted or is absent; fell back to the creator of the
    /// earliest-observed transfer.
    CreatorFallback,
    /// Neither resolved.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_key_orders_by_block_then_tx_index() {
        let a = OrderKey::new(10, 5);
        let b = OrderKey::new(10, 6);
        let c = OrderKey::new(11, 0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, OrderKey::new(10, 5));
    }

    #[test]
    fn transfer_derives_its_order_key_and_identifier() {
        let t = Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: "0x0".into(),
            to: "0xa".into(),
            token_id: "d9".into(),
            token_type: TokenType::Erc721,
            amount: 1,
            block_number: 1,
            tx_index: 0,
        };
        assert_eq!(t.order_key(), OrderKey::new(1, 0));
        assert_eq!(t.token_identifier(), TokenIdentifier::new("0x0c2e", "d9"));
    }
}
