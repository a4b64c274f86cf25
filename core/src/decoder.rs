//! Stateless `decode(Log) -> Vec<Transfer>` (spec.md §4.2).

use ethabi::{ParamType, Token as AbiToken};
use indexer_types::domain::{Transfer, TokenType};
use indexer_types::ports::Log;
use indexer_types::{TOPIC_TRANSFER, TOPIC_TRANSFER_BATCH, TOPIC_TRANSFER_SINGLE};
use slog::{warn, Logger};

/// Converts a raw log into zero or more normalized `Transfer` records.
///
/// Unknown event signatures and logs with too few topics are logged and
/// dropped, never panic (spec.md §8 boundary behaviors).
pub fn decode(logger: &Logger, chain: &str, log: &Log) -> Vec<Transfer> {
    let Some(topic0) = log.topics.first() else {
        return Vec::new();
    };

    match normalize_topic(topic0).as_str() {
        t if t == TOPIC_TRANSFER => decode_erc721(logger, chain, log).into_iter().collect(),
        t if t == TOPIC_TRANSFER_SINGLE => decode_transfer_single(logger, chain, log).into_iter().collect(),
        t if t == TOPIC_TRANSFER_BATCH => decode_transfer_batch(logger, chain, log),
        _ => {
            warn!(logger, "unknown event topic, dropping log"; "topic0" => topic0.clone());
            Vec::new()
        }
    }
}

fn normalize_topic(topic: &str) -> String {
    topic.to_lowercase()
}

fn decode_erc721(logger: &Logger, chain: &str, log: &Log) -> Option<Transfer> {
    if log.topics.len() < 4 {
        warn!(logger, "Transfer log has fewer than 4 topics, skipping";
            "address" => &log.address, "topics" => log.topics.len());
        return None;
    }
    Some(Transfer {
        chain: chain.to_string(),
        contract_address: lowercase_address(&log.address),
        from: address_from_topic(&log.topics[1]),
        to: address_from_topic(&log.topics[2]),
        token_id: canonical_topic_token_id(&log.topics[3]),
        token_type: TokenType::Erc721,
        amount: 1,
        block_number: log.block_number,
        tx_index: log.tx_index,
    })
}

fn decode_transfer_single(logger: &Logger, chain: &str, log: &Log) -> Option<Transfer> {
    if log.topics.len() < 4 {
        warn!(logger, "TransferSingle log has fewer than 4 topics, skipping";
            "address" => &log.address, "topics" => log.topics.len());
        return None;
    }
    let decoded = match ethabi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], &log.data) {
        Ok(tokens) => tokens,
        Err(source) => {
            warn!(logger, "ABI decode failed for TransferSingle, skipping log"; "error" => source.to_string());
            return None;
        }
    };
    let (id, value) = match (decoded.first(), decoded.get(1)) {
        (Some(AbiToken::Uint(id)), Some(AbiToken::Uint(value))) => (*id, *value),
        _ => {
            warn!(logger, "TransferSingle data did not decode to (uint256, uint256)");
            return None;
        }
    };

    Some(Transfer {
        chain: chain.to_string(),
        contract_address: lowercase_address(&log.address),
        from: address_from_topic(&log.topics[2]),
        to: address_from_topic(&log.topics[3]),
        token_id: minimal_hex(id),
        token_type: TokenType::Erc1155,
        amount: value.low_u64(),
        block_number: log.block_number,
        tx_index: log.tx_index,
    })
}

fn decode_transfer_batch(logger: &Logger, chain: &str, log: &Log) -> Vec<Transfer> {
    if log.topics.len() < 4 {
        warn!(logger, "TransferBatch log has fewer than 4 topics, skipping";
            "address" => &log.address, "topics" => log.topics.len());
        return Vec::new();
    }
    let param_types = vec![
        ParamType::Array(Box::new(ParamType::Uint(256))),
        ParamType::Array(Box::new(ParamType::Uint(256))),
    ];
    let decoded = match ethabi::decode(&param_types, &log.data) {
        Ok(tokens) => tokens,
        Err(source) => {
            warn!(logger, "ABI decode failed for TransferBatch, skipping log"; "error" => source.to_string());
            return Vec::new();
        }
    };

    let (ids, values) = match (decoded.first(), decoded.get(1)) {
        (Some(AbiToken::Array(ids)), Some(AbiToken::Array(values))) => (ids, values),
        _ => {
            warn!(logger, "TransferBatch data did not decode to (uint256[], uint256[])");
            return Vec::new();
        }
    };

    if ids.len() != values.len() {
        warn!(logger, "TransferBatch ids/values length mismatch, skipping log";
            "ids" => ids.len(), "values" => values.len());
        return Vec::new();
    }

    let from = address_from_topic(&log.topics[2]);
    let to = address_from_topic(&log.topics[3]);
    let contract_address = lowercase_address(&log.address);

    ids.iter()
        .zip(values.iter())
        .filter_map(|(id_tok, value_tok)| {
            let (AbiToken::Uint(id), AbiToken::Uint(value)) = (id_tok, value_tok) else {
                return None;
            };
            Some(Transfer {
                chain: chain.to_string(),
                contract_address: contract_address.clone(),
                from: from.clone(),
                to: to.clone(),
                token_id: minimal_hex(*id),
                token_type: TokenType::Erc1155,
                amount: value.low_u64(),
                block_number: log.block_number,
                tx_index: log.tx_index,
            })
        })
        .collect()
}

fn lowercase_address(address: &str) -> String {
    let trimmed = address.trim_start_matches("0x");
    format!("0x{}", trimmed.to_lowercase())
}

/// Addresses are the last 20 bytes of a 32-byte topic word.
fn address_from_topic(topic: &str) -> String {
    let hex = topic.trim_start_matches("0x").to_lowercase();
    let last_40 = if hex.len() >= 40 { &hex[hex.len() - 40..] } else { hex.as_str() };
    format!("0x{last_40}")
}

/// Preserves the full 32-byte canonical width of the topic, verbatim, minus
/// the `0x` prefix (spec.md §3, §4.2: leading zeros are significant here
/// because they are part of the on-chain canonical encoding).
fn canonical_topic_token_id(topic: &str) -> String {
    topic.trim_start_matches("0x").to_lowercase()
}

/// ABI-decoded `uint256` values are formatted without zero-padding (spec.md
/// §4.2 / §8: distinct from the topic-derived id above — the two code paths
/// intentionally produce different string shapes for the same numeric value,
/// and `TokenIdentifier` equality is on the literal string).
fn minimal_hex(value: ethabi::Uint) -> String {
    format!("{value:x}")
}
