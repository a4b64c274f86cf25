//! Builds the ascending `ownership_history` attached to each ERC-721
//! `Token` (spec.md §4.4b).
//!
//! Unlike the other three plugins this does not reduce to a single
//! latest-wins fact: every owner change is retained, sorted by `OrderKey`.
//! It therefore keeps its own mutex rather than reusing `Reducer`.

use std::collections::HashMap;
use std::sync::Mutex;

use indexer_types::domain::{OwnerAtBlock, TokenIdentifier, TokenType, Transfer};

use crate::plugin_bus::Plugin;

#[derive(Default)]
pub struct PreviousOwnersPlugin {
    history: Mutex<HashMap<TokenIdentifier, Vec<OwnerAtBlock>>>,
}

impl PreviousOwnersPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_history(self) -> HashMap<TokenIdentifier, Vec<OwnerAtBlock>> {
        self.history.into_inner().expect("previous owners mutex poisoned")
    }
}

impl Plugin for PreviousOwnersPlugin {
    fn name(&self) -> &'static str {
        "previous_owners"
    }

    fn on_transfer(&self, transfer: &Transfer) {
        if transfer.token_type != TokenType::Erc721 {
            return;
        }
        let key = transfer.token_identifier();
        let fact = OwnerAtBlock {
            token: key.clone(),
            address: transfer.from.clone(),
            order_key: transfer.order_key(),
        };
        let mut history = self.history.lock().expect("previous owners mutex poisoned");
        let entries = history.entry(key).or_default();
        match entries.binary_search_by_key(&fact.order_key, |e| e.order_key) {
            Ok(idx) => entries[idx] = fact,
            Err(idx) => entries.insert(idx, fact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(block: u64, from: &str, to: &str) -> Transfer {
        Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: from.into(),
            to: to.into(),
            token_id: "1".into(),
            token_type: TokenType::Erc721,
            amount: 1,
            block_number: block,
            tx_index: 0,
        }
    }

    #[test]
    fn keeps_every_owner_change_sorted_ascending() {
        let plugin = PreviousOwnersPlugin::new();
        plugin.on_transfer(&transfer(5, "0xb", "0xc"));
        plugin.on_transfer(&transfer(1, "0xa", "0xb"));
        plugin.on_transfer(&transfer(9, "0xc", "0xd"));

        let history = plugin.into_history();
        let key = TokenIdentifier::new("0x0c2e", "1");
        let owners: Vec<&str> = history[&key].iter().map(|o| o.address.as_str()).collect();
        assert_eq!(owners, vec!["0xa", "0xb", "0xc"]);
    }
}
