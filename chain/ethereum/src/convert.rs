//! Converts between `web3`'s wire types and the chain-agnostic `Log`/
//! `EthGetLogsFilter` shapes `indexer-types` defines.

use indexer_types::ports::{EthGetLogsFilter, Log};
use web3::types::{FilterBuilder, Log as Web3Log, H160};

pub fn to_web3_filter(from: u64, to: u64, filter: &EthGetLogsFilter) -> web3::types::Filter {
    apply_address_and_topics(FilterBuilder::default().from_block(from.into()).to_block(to.into()), filter).build()
}

/// A filter with no block-range bounds, for `eth_subscribe("logs")`, which
/// always starts from the chain's current state regardless of `fromBlock`.
pub fn to_web3_subscription_filter(filter: &EthGetLogsFilter) -> web3::types::Filter {
    apply_address_and_topics(FilterBuilder::default(), filter).build()
}

fn apply_address_and_topics(mut builder: FilterBuilder, filter: &EthGetLogsFilter) -> FilterBuilder {
    if !filter.contracts.is_empty() {
        let addresses: Vec<H160> = filter
            .contracts
            .iter()
            .filter_map(|address| parse_address(address))
            .collect();
        builder = builder.address(addresses);
    }

    if !filter.topics.is_empty() {
        let topics: Vec<web3::types::H256> = filter.topics.iter().filter_map(|topic| parse_topic(topic)).collect();
        builder = builder.topics(Some(topics), None, None, None);
    }

    builder
}

pub fn from_web3_log(log: Web3Log) -> Option<Log> {
    let block_number = log.block_number?.as_u64();
    let tx_index = log.transaction_index?.as_u32();
    Some(Log {
        block_number,
        tx_index,
        address: format!("0x{:x}", log.address),
        topics: log.topics.iter().map(|t| format!("0x{:x}", t)).collect(),
        data: log.data.0,
    })
}

fn parse_address(address: &str) -> Option<H160> {
    let trimmed = address.trim_start_matches("0x");
    let bytes = hex::decode(trimmed).ok()?;
    if bytes.len() != 20 {
        return None;
    }
    Some(H160::from_slice(&bytes))
}

fn parse_topic(topic: &str) -> Option<web3::types::H256> {
    let trimmed = topic.trim_start_matches("0x");
    let bytes = hex::decode(trimmed).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    Some(web3::types::H256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_must_be_exactly_20_bytes() {
        assert!(parse_address("0x00").is_none());
        assert!(parse_address(&"0".repeat(40)).is_some());
    }

    #[test]
    fn topic_must_be_exactly_32_bytes() {
        assert!(parse_topic("0x00").is_none());
        assert!(parse_topic(&"0".repeat(64)).is_some());
    }
}
