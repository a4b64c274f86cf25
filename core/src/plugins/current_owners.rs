//! Tracks the single current owner of each ERC-721 token (spec.md §4.4a).
//!
//! ERC-1155 transfers also flow through here so that `to`/`from` balances
//! stay in the address-filter window, but ownership for ERC-1155 is defined
//! by `BalancesPlugin`, not this one — only `TokenType::Erc721` transfers are
//! offered to the reducer.

use indexer_types::domain::{OwnerAtBlock, TokenType, Transfer};

use crate::plugin_bus::Plugin;
use crate::reducer::Reducer;
use indexer_types::domain::TokenIdentifier;

#[derive(Default)]
pub struct CurrentOwnersPlugin {
    reducer: Reducer<TokenIdentifier, OwnerAtBlock>,
}

impl CurrentOwnersPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_owners(self) -> std::collections::HashMap<TokenIdentifier, OwnerAtBlock> {
        self.reducer.into_map()
    }
}

impl Plugin for CurrentOwnersPlugin {
    fn name(&self) -> &'static str {
        "current_owners"
    }

    fn on_transfer(&self, transfer: &Transfer) {
        if transfer.token_type != TokenType::Erc721 {
            return;
        }
        let key = transfer.token_identifier();
        let fact = OwnerAtBlock {
            token: key.clone(),
            address: transfer.to.clone(),
            order_key: transfer.order_key(),
        };
        self.reducer.offer(key, fact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(token_type: TokenType, block: u64, to: &str) -> Transfer {
        Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: "0x0".into(),
            to: to.into(),
            token_id: "1".into(),
            token_type,
            amount: 1,
            block_number: block,
            tx_index: 0,
        }
    }

    #[test]
    fn keeps_the_latest_owner_only() {
        let plugin = CurrentOwnersPlugin::new();
        plugin.on_transfer(&transfer(TokenType::Erc721, 1, "0xa"));
        plugin.on_transfer(&transfer(TokenType::Erc721, 5, "0xb"));
        let owners = plugin.into_owners();
        let key = TokenIdentifier::new("0x0c2e", "1");
        assert_eq!(owners[&key].address, "0xb");
    }

    #[test]
    fn ignores_erc1155_transfers() {
        let plugin = CurrentOwnersPlugin::new();
        plugin.on_transfer(&transfer(TokenType::Erc1155, 1, "0xa"));
        assert!(plugin.into_owners().is_empty());
    }
}
