//! Diesel + r2d2-backed `PersistencePort` (spec.md §4.0).
//!
//! Diesel's query builder is synchronous, so every method here hands its
//! work to `tokio::task::spawn_blocking` rather than block the async
//! runtime — the same pattern the teacher's store crate uses for its own
//! connection-pool-backed repositories.

mod migrations;
mod models;
mod schema;

pub use migrations::run_pending;

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use slog::{debug, Logger};

use indexer_types::bloom::BloomFilter;
use indexer_types::domain::{Contract, Token};
use indexer_types::errors::PersistenceError;
use indexer_types::ports::PersistencePort;

use models::{AddressFilterRow, ContractRow, LogCacheRow, TokenRow};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub struct PostgresStore {
    pool: PgPool,
    logger: Logger,
}

impl PostgresStore {
    pub fn new(database_url: &str, max_pool_size: u32, logger: Logger) -> Result<Self, PersistenceError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(max_pool_size).build(manager).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(Self { pool, logger })
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))
    }
}

#[async_trait]
impl PersistencePort for PostgresStore {
    async fn bulk_upsert_tokens(&self, tokens: Vec<Token>) -> Result<(), PersistenceError> {
        let pool = self.pool.clone();
        let count = tokens.len();
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            use schema::tokens::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            let rows: Vec<TokenRow> = tokens.into_iter().map(TokenRow::from).collect();

            diesel::insert_into(dsl::tokens)
                .values(&rows)
                .on_conflict((dsl::chain, dsl::contract_address, dsl::token_id, dsl::owner_address))
                .do_update()
                .set((
                    dsl::quantity.eq(diesel::dsl::sql::<diesel::sql_types::Text>("excluded.quantity")),
                    dsl::token_uri.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.token_uri")),
                    dsl::token_metadata.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Jsonb>>("excluded.token_metadata")),
                    dsl::name.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.name")),
                    dsl::description.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.description")),
                    dsl::ownership_history.eq(diesel::dsl::sql::<diesel::sql_types::Jsonb>("excluded.ownership_history")),
                    dsl::block_number.eq(diesel::dsl::sql::<diesel::sql_types::BigInt>("excluded.block_number")),
                ))
                .execute(&mut conn)
                .map_err(|e| PersistenceError::BulkUpsert { count, source: Box::new(PersistenceError::Backend(e.to_string())) })?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))??;
        debug!(self.logger, "upserted tokens"; "count" => count);
        Ok(())
    }

    async fn bulk_upsert_contracts(&self, contracts: Vec<Contract>) -> Result<(), PersistenceError> {
        let pool = self.pool.clone();
        let count = contracts.len();
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            use schema::contracts::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            let rows: Vec<ContractRow> = contracts.into_iter().map(ContractRow::from).collect();

            diesel::insert_into(dsl::contracts)
                .values(&rows)
                .on_conflict((dsl::chain, dsl::address))
                .do_update()
                .set((
                    dsl::name.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.name")),
                    dsl::symbol.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.symbol")),
                    dsl::owner_address.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.owner_address")),
                    dsl::creator_address.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.creator_address")),
                    dsl::owner_method.eq(diesel::dsl::sql::<diesel::sql_types::Nullable<diesel::sql_types::Text>>("excluded.owner_method")),
                    dsl::latest_block.eq(diesel::dsl::sql::<diesel::sql_types::BigInt>("excluded.latest_block")),
                ))
                .execute(&mut conn)
                .map_err(|e| PersistenceError::BulkUpsert { count, source: Box::new(PersistenceError::Backend(e.to_string())) })?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn get_token_uri(&self, contract_address: &str, token_id: &str) -> Result<Option<String>, PersistenceError> {
        let pool = self.pool.clone();
        let contract_address = contract_address.to_string();
        let token_id = token_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<String>, PersistenceError> {
            use schema::tokens::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            dsl::tokens
                .filter(dsl::contract_address.eq(contract_address))
                .filter(dsl::token_id.eq(token_id))
                .select(dsl::token_uri)
                .first::<Option<String>>(&mut conn)
                .optional()
                .map_err(|e| PersistenceError::Backend(e.to_string()))
                .map(Option::flatten)
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn get_token_balance(&self, contract_address: &str, token_id: &str, holder: &str) -> Result<Option<u64>, PersistenceError> {
        let pool = self.pool.clone();
        let contract_address = contract_address.to_string();
        let token_id = token_id.to_string();
        let holder = holder.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<u64>, PersistenceError> {
            use schema::tokens::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            let quantity: Option<String> = dsl::tokens
                .filter(dsl::contract_address.eq(contract_address))
                .filter(dsl::token_id.eq(token_id))
                .filter(dsl::owner_address.eq(holder))
                .select(dsl::quantity)
                .first(&mut conn)
                .optional()
                .map_err(|e| PersistenceError::Backend(e.to_string()))?;
            Ok(quantity.and_then(|q| q.parse().ok()))
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn get_address_filter_batch(&self, ranges: &[(u64, u64)]) -> Result<Vec<Result<BloomFilter, PersistenceError>>, PersistenceError> {
        let pool = self.pool.clone();
        let ranges = ranges.to_vec();
        tokio::task::spawn_blocking(move || -> Result<Vec<Result<BloomFilter, PersistenceError>>, PersistenceError> {
            use schema::address_filters::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            Ok(ranges
                .into_iter()
                .map(|(from, to)| {
                    let row: Option<serde_json::Value> = dsl::address_filters
                        .filter(dsl::chunk_from.eq(from as i64))
                        .filter(dsl::chunk_to.eq(to as i64))
                        .select(dsl::filter)
                        .first(&mut conn)
                        .optional()
                        .map_err(|e| PersistenceError::Backend(e.to_string()))?;
                    match row {
                        Some(json) => serde_json::from_value(json).map_err(|e| PersistenceError::Backend(e.to_string())),
                        None => Err(PersistenceError::NotFound),
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn bulk_upsert_address_filters(&self, filters: HashMap<(u64, u64), BloomFilter>) -> Result<(), PersistenceError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            use schema::address_filters::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            let rows: Vec<AddressFilterRow> = filters
                .into_iter()
                .map(|((from, to), filter)| AddressFilterRow {
                    chunk_from: from as i64,
                    chunk_to: to as i64,
                    filter: serde_json::to_value(&filter).unwrap_or(serde_json::Value::Null),
                })
                .collect();

            diesel::insert_into(dsl::address_filters)
                .values(&rows)
                .on_conflict((dsl::chunk_from, dsl::chunk_to))
                .do_update()
                .set(dsl::filter.eq(diesel::dsl::sql::<diesel::sql_types::Jsonb>("excluded.filter")))
                .execute(&mut conn)
                .map_err(|e| PersistenceError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn get_log_cache(&self, from_block: u64, to_block: u64) -> Result<Option<Vec<u8>>, PersistenceError> {
        let key = indexer_types::ports::log_cache_key(from_block, to_block);
        self.read_log_cache(key).await
    }

    async fn put_log_cache(&self, from_block: u64, to_block: u64, payload: &[u8]) -> Result<(), PersistenceError> {
        let key = indexer_types::ports::log_cache_key(from_block, to_block);
        self.write_log_cache(key, payload.to_vec(), false).await
    }

    async fn put_log_cache_error(&self, from_block: u64, to_block: u64, payload: &[u8]) -> Result<(), PersistenceError> {
        let key = indexer_types::ports::log_cache_error_key(from_block, to_block);
        self.write_log_cache(key, payload.to_vec(), true).await
    }
}

impl PostgresStore {
    async fn read_log_cache(&self, key: String) -> Result<Option<Vec<u8>>, PersistenceError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, PersistenceError> {
            use schema::log_cache::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            dsl::log_cache
                .filter(dsl::cache_key.eq(key))
                .select(dsl::payload)
                .first(&mut conn)
                .optional()
                .map_err(|e| PersistenceError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn write_log_cache(&self, key: String, payload: Vec<u8>, is_error: bool) -> Result<(), PersistenceError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            use schema::log_cache::dsl;
            let mut conn = pool.get().map_err(|e| PersistenceError::Backend(e.to_string()))?;
            let row = LogCacheRow { cache_key: key, payload, is_error };
            diesel::insert_into(dsl::log_cache)
                .values(&row)
                .on_conflict(dsl::cache_key)
                .do_update()
                .set((
                    dsl::payload.eq(diesel::dsl::sql::<diesel::sql_types::Binary>("excluded.payload")),
                    dsl::is_error.eq(diesel::dsl::sql::<diesel::sql_types::Bool>("excluded.is_error")),
                ))
                .execute(&mut conn)
                .map_err(|e| PersistenceError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }
}

