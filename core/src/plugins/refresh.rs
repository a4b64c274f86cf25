//! Accumulates the bloom filters `BlockFilterManager` later serves to a deep
//! refresh (spec.md §3, §4.8).
//!
//! Buckets every transfer's `from`/`to`/`contractAddress` into the
//! `blocksPerLogsCall`-aligned window it falls in; `drain` hands the caller
//! one filter per touched window, ready for `bulk_upsert_address_filters`.

use std::collections::HashMap;
use std::sync::Mutex;

use indexer_types::bloom::BloomFilter;
use indexer_types::domain::Transfer;

use crate::plugin_bus::Plugin;

pub struct RefreshPlugin {
    blocks_per_logs_call: u64,
    filters: Mutex<HashMap<(u64, u64), BloomFilter>>,
}

impl RefreshPlugin {
    pub fn new(blocks_per_logs_call: u64) -> Self {
        Self { blocks_per_logs_call: blocks_per_logs_call.max(1), filters: Mutex::new(HashMap::new()) }
    }

    fn window_for(&self, block_number: u64) -> (u64, u64) {
        let start = block_number - (block_number % self.blocks_per_logs_call);
        (start, start + self.blocks_per_logs_call - 1)
    }

    pub fn drain(self) -> HashMap<(u64, u64), BloomFilter> {
        self.filters.into_inner().expect("refresh filters mutex poisoned")
    }
}

impl Plugin for RefreshPlugin {
    fn name(&self) -> &'static str {
        "refresh"
    }

    fn on_transfer(&self, transfer: &Transfer) {
        let window = self.window_for(transfer.block_number);
        let mut filters = self.filters.lock().expect("refresh filters mutex poisoned");
        let filter = filters.entry(window).or_insert_with(BloomFilter::for_address_window);
        filter.add(&transfer.from);
        filter.add(&transfer.to);
        filter.add(&transfer.contract_address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::domain::TokenType;

    fn transfer(block: u64, from: &str, to: &str, contract: &str) -> Transfer {
        Transfer {
            chain: "ethereum".into(),
            contract_address: contract.into(),
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
    fn buckets_transfers_into_aligned_windows() {
        let plugin = RefreshPlugin::new(50);
        plugin.on_transfer(&transfer(10, "0xa", "0xb", "0xc"));
        plugin.on_transfer(&transfer(49, "0xd", "0xe", "0xf"));
        plugin.on_transfer(&transfer(50, "0x1", "0x2", "0x3"));

        let filters = plugin.drain();
        assert_eq!(filters.len(), 2);
        assert!(filters.contains_key(&(0, 49)));
        assert!(filters.contains_key(&(50, 99)));
    }

    #[test]
    fn window_filter_contains_every_participant_address() {
        let plugin = RefreshPlugin::new(50);
        plugin.on_transfer(&transfer(10, "0xa", "0xb", "0xc"));

        let filters = plugin.drain();
        let filter = &filters[&(0, 49)];
        assert!(filter.contains("0xa"));
        assert!(filter.contains("0xb"));
        assert!(filter.contains("0xc"));
        assert!(!filter.contains("0xz"));
    }
}
