//! Command-line and environment configuration for the node binary
//! (spec.md §6's "everything is driven by flags/env vars, no config file").

use clap::Parser;

use indexer_types::constants::{
    DEFAULT_BLOCKS_PER_LOGS_CALL, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_RUNS,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "indexer-node", about = "NFT transfer indexer")]
pub struct Config {
    /// HTTP JSON-RPC endpoint for `eth_getLogs`/`eth_call`.
    #[arg(long, env = "ETH_RPC_URL")]
    pub eth_rpc_url: String,

    /// Websocket endpoint for `eth_subscribe`. Live tailing is disabled if unset.
    #[arg(long, env = "ETH_WS_URL")]
    pub eth_ws_url: Option<String>,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Chain label stamped onto every `Transfer`/`Token` row.
    #[arg(long, env = "CHAIN_NAME", default_value = "ethereum")]
    pub chain_name: String,

    /// Blocks per `eth_getLogs` call.
    #[arg(long, env = "BLOCKS_PER_LOGS_CALL", default_value_t = DEFAULT_BLOCKS_PER_LOGS_CALL)]
    pub blocks_per_logs_call: u64,

    /// Blocks per address-filter chunk.
    #[arg(long, env = "FILTER_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub filter_chunk_size: u64,

    /// Concurrent chunk-processing tasks the pipeline runs at once.
    #[arg(long, env = "MAX_CONCURRENT_RUNS", default_value_t = DEFAULT_MAX_CONCURRENT_RUNS)]
    pub max_concurrent_runs: usize,

    /// Maximum size of the Postgres connection pool.
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 10)]
    pub db_pool_size: u32,

    /// Starting block for backfill when no prior progress is recorded.
    #[arg(long, env = "START_BLOCK", default_value_t = 0)]
    pub start_block: u64,

    /// Run pending Diesel migrations on startup.
    #[arg(long, env = "RUN_MIGRATIONS", default_value_t = true)]
    pub run_migrations: bool,

    /// Whether the uris plugin may fall back to an on-chain `tokenURI`/`uri`
    /// call when the repository has no cached URI for a token.
    #[arg(long, env = "ENABLE_RPC_URI_RESOLUTION", default_value_t = true)]
    pub enable_rpc_uri_resolution: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config::parse()
    }
}
