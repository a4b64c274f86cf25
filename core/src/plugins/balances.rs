//! Tracks post-transfer ERC-1155 holdings of both parties (spec.md §4.4c).
//!
//! Balances are cumulative, so this plugin keeps a running per-`(token,
//! owner)` ledger under its own mutex and publishes, after each transfer, the
//! pair's new totals as a `TokenBalances` fact offered into a `Reducer` keyed
//! by token — the reducer's "latest `OrderKey` wins" guard still protects
//! against applying an out-of-order transfer twice.

use std::collections::HashMap;
use std::sync::Mutex;

use indexer_types::domain::{TokenBalances, TokenIdentifier, TokenType, Transfer};

use crate::reducer::Reducer;
use crate::plugin_bus::Plugin;

pub struct BalancesPlugin {
    ledger: Mutex<HashMap<(TokenIdentifier, String), u64>>,
    reducer: Reducer<TokenIdentifier, TokenBalances>,
}

impl Default for BalancesPlugin {
    fn default() -> Self {
        Self { ledger: Mutex::new(HashMap::new()), reducer: Reducer::new() }
    }
}

impl BalancesPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_balances(self) -> HashMap<TokenIdentifier, TokenBalances> {
        self.reducer.into_map()
    }

    /// The full per-`(token, holder)` ledger, not just the latest `from`/`to`
    /// fact — materialization needs this to emit one `Token` row per distinct
    /// holder for ERC-1155 (spec.md §4.7 step 2).
    pub fn into_ledger(self) -> HashMap<(TokenIdentifier, String), u64> {
        self.ledger.into_inner().expect("balances ledger mutex poisoned")
    }
}

impl Plugin for BalancesPlugin {
    fn name(&self) -> &'static str {
        "balances"
    }

    fn on_transfer(&self, transfer: &Transfer) {
        if transfer.token_type != TokenType::Erc1155 {
            return;
        }
        let key = transfer.token_identifier();

        let (from_amount, to_amount) = {
            let mut ledger = self.ledger.lock().expect("balances ledger mutex poisoned");
            let from_balance = ledger.entry((key.clone(), transfer.from.clone())).or_insert(0);
            *from_balance = from_balance.saturating_sub(transfer.amount);
            let from_amount = *from_balance;

            let to_balance = ledger.entry((key.clone(), transfer.to.clone())).or_insert(0);
            *to_balance += transfer.amount;
            let to_amount = *to_balance;

            (from_amount, to_amount)
        };

        let fact = TokenBalances {
            token: key.clone(),
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            from_amount,
            to_amount,
            order_key: transfer.order_key(),
        };
        self.reducer.offer(key, fact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(block: u64, from: &str, to: &str, amount: u64) -> Transfer {
        Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: from.into(),
            to: to.into(),
            token_id: "1".into(),
            token_type: TokenType::Erc1155,
            amount,
            block_number: block,
            tx_index: 0,
        }
    }

    #[test]
    fn accumulates_balances_across_transfers() {
        let plugin = BalancesPlugin::new();
        plugin.on_transfer(&transfer(1, "0x0", "0xa", 10));
        plugin.on_transfer(&transfer(2, "0xa", "0xb", 4));

        let balances = plugin.into_balances();
        let key = TokenIdentifier::new("0x0c2e", "1");
        assert_eq!(balances[&key].from, "0xa");
        assert_eq!(balances[&key].from_amount, 6);
        assert_eq!(balances[&key].to, "0xb");
        assert_eq!(balances[&key].to_amount, 4);
    }

    #[test]
    fn ledger_exposes_every_distinct_holder() {
        let plugin = BalancesPlugin::new();
        plugin.on_transfer(&transfer(1, "0x0", "0xa", 10));
        plugin.on_transfer(&transfer(2, "0xa", "0xb", 4));

        let ledger = plugin.into_ledger();
        let key = TokenIdentifier::new("0x0c2e", "1");
        assert_eq!(ledger[&(key.clone(), "0xa".to_string())], 6);
        assert_eq!(ledger[&(key.clone(), "0xb".to_string())], 4);
        assert_eq!(ledger[&(key, "0x0".to_string())], 0);
    }

    #[test]
    fn ignores_erc721_transfers() {
        let plugin = BalancesPlugin::new();
        let mut t = transfer(1, "0x0", "0xa", 1);
        t.token_type = TokenType::Erc721;
        plugin.on_transfer(&t);
        assert!(plugin.into_balances().is_empty());
    }
}
