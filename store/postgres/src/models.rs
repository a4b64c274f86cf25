//! Row structs mapping the `schema` tables to/from `indexer-types` domain
//! types. Kept separate from the domain model itself so the domain crate
//! never has to depend on Diesel.

use diesel::prelude::*;
use serde_json::Value as Json;

use indexer_types::domain::{Contract, OwnerMethod, Token, TokenType};

use crate::schema::{address_filters, contracts, log_cache, tokens};

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = tokens)]
pub struct TokenRow {
    pub chain: String,
    pub contract_address: String,
    pub token_id: String,
    pub owner_address: String,
    pub quantity: String,
    pub token_type: String,
    pub token_uri: Option<String>,
    pub token_metadata: Option<Json>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub ownership_history: Json,
    pub block_number: i64,
}

impl From<Token> for TokenRow {
    fn from(token: Token) -> Self {
        let ownership_history = serde_json::to_value(
            token
                .ownership_history
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "address": o.address,
                        "block_number": o.order_key.block_number,
                        "tx_index": o.order_key.tx_index,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or(Json::Array(vec![]));

        Self {
            chain: token.chain,
            contract_address: token.contract_address,
            token_id: token.token_id,
            owner_address: token.owner_address,
            quantity: token.quantity,
            token_type: token_type_to_str(token.token_type).to_string(),
            token_uri: token.token_uri,
            token_metadata: token.token_metadata.map(|m| value_map_to_json(&m)),
            name: token.name,
            description: token.description,
            ownership_history,
            block_number: token.block_number as i64,
        }
    }
}

fn value_map_to_json(map: &indexer_types::domain::TokenMetadata) -> Json {
    let object: serde_json::Map<String, Json> = map.iter().map(|(k, v)| (k.clone(), indexer_value_to_json(v))).collect();
    Json::Object(object)
}

fn indexer_value_to_json(value: &indexer_types::value::Value) -> Json {
    use indexer_types::value::Value;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Num(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(indexer_value_to_json).collect()),
        Value::Object(map) => {
            Json::Object(map.iter().map(|(k, v)| (k.clone(), indexer_value_to_json(v))).collect())
        }
    }
}

fn token_type_to_str(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Erc721 => "erc721",
        TokenType::Erc1155 => "erc1155",
    }
}

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = contracts)]
pub struct ContractRow {
    pub chain: String,
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub owner_address: Option<String>,
    pub creator_address: Option<String>,
    pub owner_method: Option<String>,
    pub latest_block: i64,
}

impl From<Contract> for ContractRow {
    fn from(contract: Contract) -> Self {
        Self {
            chain: contract.chain,
            address: contract.address,
            name: contract.name,
            symbol: contract.symbol,
            owner_address: contract.owner_address,
            creator_address: contract.creator_address,
            owner_method: contract.owner_method.map(owner_method_to_str).map(str::to_string),
            latest_block: contract.latest_block as i64,
        }
    }
}

fn owner_method_to_str(method: OwnerMethod) -> &'static str {
    match method {
        OwnerMethod::OwnerCall => "owner_call",
        OwnerMethod::CreatorFallback => "creator_fallback",
        OwnerMethod::Unknown => "unknown",
    }
}

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = address_filters)]
pub struct AddressFilterRow {
    pub chunk_from: i64,
    pub chunk_to: i64,
    pub filter: Json,
}

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = log_cache)]
pub struct LogCacheRow {
    pub cache_key: String,
    pub payload: Vec<u8>,
    pub is_error: bool,
}
