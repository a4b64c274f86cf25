//! Derives the on-chain URI for every token touched this window (spec.md
//! §4.4d, §4.7 step 1, §6).
//!
//! `Plugin::on_transfer` is synchronous, but resolving a URI needs a
//! repository read and, on a miss, an `eth_call` — so the bus-facing half
//! only records which `(contract, tokenId)` pairs saw activity; `resolve_uri`
//! below is the async half the pipeline drives once the bus has finished,
//! the same two-phase shape the metadata resolution step already uses.

use std::collections::HashSet;
use std::sync::Mutex;

use ethabi::Token as AbiToken;

use indexer_types::domain::{TokenIdentifier, TokenType, Transfer};
use indexer_types::ports::{ContractCall, EthereumAdapter, PersistencePort};

use crate::abi_functions::{token_uri_function, uri_function};
use crate::plugin_bus::Plugin;

#[derive(Default)]
pub struct UrisPlugin {
    touched: Mutex<HashSet<TokenIdentifier>>,
}

impl UrisPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_touched(self) -> HashSet<TokenIdentifier> {
        self.touched.into_inner().expect("uris touched-set mutex poisoned")
    }
}

impl Plugin for UrisPlugin {
    fn name(&self) -> &'static str {
        "uris"
    }

    fn on_transfer(&self, transfer: &Transfer) {
        self.touched.lock().expect("uris touched-set mutex poisoned").insert(transfer.token_identifier());
    }
}

/// Zero-pads a token id to the 64-hex-digit width `{id}` substitution
/// requires (ERC-1155 metadata spec), regardless of which code path
/// originally produced the id string.
pub fn pad_token_id_for_uri(token_id: &str) -> String {
    format!("{:0>64}", token_id)
}

/// Resolves `token`'s URI: a repository hit always wins; on a miss, falls
/// back to an `eth_call` (`tokenURI` for ERC-721, `uri` for ERC-1155) with
/// `{id}` substituted into the result, when `adapter` is `Some` (spec.md
/// §4.4d).
pub async fn resolve_uri(
    persistence: &dyn PersistencePort,
    adapter: Option<&dyn EthereumAdapter>,
    token: &TokenIdentifier,
    token_type: TokenType,
) -> Option<String> {
    if let Ok(Some(uri)) = persistence.get_token_uri(&token.contract_address, &token.token_id).await {
        return Some(uri);
    }

    let adapter = adapter?;
    let function = match token_type {
        TokenType::Erc721 => token_uri_function(),
        TokenType::Erc1155 => uri_function(),
    };
    let token_id_u256 = ethabi::Uint::from_str_radix(&token.token_id, 16).ok()?;
    let call = ContractCall {
        address: token.contract_address.clone(),
        function,
        args: vec![AbiToken::Uint(token_id_u256)],
        at_block: None,
    };
    let result = adapter.call(call).await.ok()?;
    match result.into_iter().next() {
        Some(AbiToken::String(raw)) => Some(substitute_id(&raw, &token.token_id)),
        _ => None,
    }
}

fn substitute_id(uri: &str, token_id: &str) -> String {
    uri.replace("{id}", &pad_token_id_for_uri(token_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::errors::PersistenceError;
    use std::collections::HashMap;

    #[test]
    fn pads_short_ids_to_64_hex_digits() {
        let padded = pad_token_id_for_uri("8c1");
        assert_eq!(padded.len(), 64);
        assert!(padded.ends_with("8c1"));
    }

    #[test]
    fn leaves_already_wide_ids_untouched_in_length() {
        let wide = "0".repeat(64);
        assert_eq!(pad_token_id_for_uri(&wide).len(), 64);
    }

    #[test]
    fn records_latest_touched_token() {
        let plugin = UrisPlugin::new();
        let t = Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: "0x0".into(),
            to: "0xa".into(),
            token_id: "1".into(),
            token_type: TokenType::Erc1155,
            amount: 1,
            block_number: 1,
            tx_index: 0,
        };
        plugin.on_transfer(&t);
        assert_eq!(plugin.into_touched().len(), 1);
    }

    #[test]
    fn substitutes_padded_id_into_template() {
        assert_eq!(
            substitute_id("ipfs://base/{id}.json", "8c1"),
            format!("ipfs://base/{}.json", pad_token_id_for_uri("8c1"))
        );
    }

    #[derive(Default)]
    struct StubPersistence {
        uri: Option<String>,
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
            Ok(self.uri.clone())
        }
        async fn get_token_balance(&self, _c: &str, _t: &str, _h: &str) -> Result<Option<u64>, PersistenceError> {
            Ok(None)
        }
        async fn get_address_filter_batch(
            &self,
            ranges: &[(u64, u64)],
        ) -> Result<Vec<Result<indexer_types::bloom::BloomFilter, PersistenceError>>, PersistenceError> {
            Ok(ranges.iter().map(|_| Ok(indexer_types::bloom::BloomFilter::for_address_window())).collect())
        }
        async fn bulk_upsert_address_filters(
            &self,
            _filters: HashMap<(u64, u64), indexer_types::bloom::BloomFilter>,
        ) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn get_log_cache(&self, _from: u64, _to: u64) -> Result<Option<Vec<u8>>, PersistenceError> {
            Ok(None)
        }
        async fn put_log_cache(&self, _from: u64, _to: u64, _payload: &[u8]) -> Result<(), PersistenceError> {
            Ok(())
        }
        async fn put_log_cache_error(&self, _from: u64, _to: u64, _payload: &[u8]) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn repository_hit_wins_over_rpc() {
        let persistence = StubPersistence { uri: Some("ipfs://cached".to_string()) };
        let token = TokenIdentifier::new("0x0c2e", "1");
        let resolved = resolve_uri(&persistence, None, &token, TokenType::Erc721).await;
        assert_eq!(resolved, Some("ipfs://cached".to_string()));
    }

    #[tokio::test]
    async fn repository_miss_without_adapter_resolves_to_none() {
        let persistence = StubPersistence::default();
        let token = TokenIdentifier::new("0x0c2e", "1");
        let resolved = resolve_uri(&persistence, None, &token, TokenType::Erc721).await;
        assert_eq!(resolved, None);
    }
}
