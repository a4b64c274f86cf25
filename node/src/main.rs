mod config;
mod logger;

use std::sync::Arc;

use anyhow::{Context, Result};
use diesel::prelude::*;
use slog::{info, o};

use config::Config;
use indexer_chain_ethereum::Web3EthereumAdapter;
use indexer_core::pipeline::Pipeline;
use indexer_core::status::StatusReporter;
use indexer_store_postgres::PostgresStore;
use indexer_types::ports::{EthGetLogsFilter, EthereumAdapter, PersistencePort};

#[tokio::main]
async fn main() -> Result<()> {
    let logger = logger::build_logger();
    let config = Config::from_env();

    info!(logger, "starting indexer-node"; "chain" => &config.chain_name, "rpc" => &config.eth_rpc_url);

    if config.run_migrations {
        let mut conn = PgConnection::establish(&config.database_url).context("connecting to postgres to run migrations")?;
        indexer_store_postgres::run_pending(&mut conn).context("running pending migrations")?;
        info!(logger, "migrations applied");
    }

    let adapter: Arc<dyn EthereumAdapter> =
        Arc::new(Web3EthereumAdapter::new(&config.eth_rpc_url, config.eth_ws_url.clone(), logger.new(o!("component" => "eth_adapter")))?);

    let persistence: Arc<dyn PersistencePort> =
        Arc::new(PostgresStore::new(&config.database_url, config.db_pool_size, logger.new(o!("component" => "store")))?);

    let pipeline = Arc::new(Pipeline::new(
        adapter.clone(),
        persistence.clone(),
        config.blocks_per_logs_call,
        config.chain_name.clone(),
        config.enable_rpc_uri_resolution,
        logger.new(o!("component" => "pipeline")),
    ));

    // `BlockFilterManager` and `RefreshOrchestrator` back an operator-facing
    // refresh surface (CLI subcommand or RPC handler) that is out of scope
    // here; the ingestion loop below only needs the adapter, store and
    // pipeline. Both remain public `indexer-core` APIs for that future entry
    // point to construct, the same way `StatusReporter::snapshot()` is meant
    // for a future HTTP handler rather than this loop.
    let status = StatusReporter::new(adapter.clone());

    run_ingestion_loop(&logger, &config, pipeline, &status).await
}

/// Walks from `config.start_block` to the current chain head in
/// `blocks_per_logs_call`-sized windows, then hands off to the live
/// subscription (spec.md §4.1/§5).
async fn run_ingestion_loop(
    logger: &slog::Logger,
    config: &Config,
    pipeline: Arc<Pipeline>,
    status: &StatusReporter,
) -> Result<()> {
    let filter = EthGetLogsFilter::default();
    let mut next_block = config.start_block;

    loop {
        let snapshot = status.snapshot().await;
        let chain_head = snapshot.most_recent_chain_block;

        if next_block > chain_head {
            status.set_listening(true);
            info!(logger, "caught up to chain head, idling before next poll"; "chain_head" => chain_head);
            tokio::time::sleep(std::time::Duration::from_secs(12)).await;
            continue;
        }

        let window_end = (next_block + config.blocks_per_logs_call - 1).min(chain_head);
        match pipeline.process_window(next_block, window_end, &filter).await {
            Ok(transfer_count) => {
                status.record_chunk_synced(next_block, window_end);
                info!(logger, "synced window"; "from" => next_block, "to" => window_end, "transfers" => transfer_count);
            }
            Err(err) => {
                slog::error!(logger, "window processing failed, retrying after backoff"; "from" => next_block, "to" => window_end, "error" => err.to_string());
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        }

        next_block = window_end + 1;
    }
}
