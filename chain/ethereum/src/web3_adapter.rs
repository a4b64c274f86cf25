use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use slog::{debug, Logger};
use web3::transports::{Http, WebSocket};
use web3::types::BlockNumber;
use web3::Web3;

use indexer_types::constants::RATE_LIMIT_MARKER;
use indexer_types::errors::{LogSourceError, PluginError};
use indexer_types::ports::{ContractCall, EthGetLogsFilter, EthereumAdapter, Log};

use crate::convert::{from_web3_log, to_web3_filter, to_web3_subscription_filter};

/// Talks to an Ethereum JSON-RPC endpoint over HTTP for request/response
/// calls, and (optionally) a separate websocket endpoint for `eth_subscribe`
/// live tailing — the same split the teacher's provider configuration uses
/// for "rpc" vs. "ws" URLs per network.
pub struct Web3EthereumAdapter {
    http: Web3<Http>,
    ws_url: Option<String>,
    logger: Logger,
}

impl Web3EthereumAdapter {
    pub fn new(rpc_url: &str, ws_url: Option<String>, logger: Logger) -> Result<Self, LogSourceError> {
        let transport = Http::new(rpc_url).map_err(|e| LogSourceError::Rpc(e.to_string()))?;
        Ok(Self { http: Web3::new(transport), ws_url, logger })
    }
}

#[async_trait]
impl EthereumAdapter for Web3EthereumAdapter {
    async fn latest_block(&self) -> Result<u64, LogSourceError> {
        self.http.eth().block_number().await.map(|n| n.as_u64()).map_err(classify_error)
    }

    async fn get_logs(&self, from: u64, to: u64, filter: &EthGetLogsFilter) -> Result<Vec<Log>, LogSourceError> {
        let web3_filter = to_web3_filter(from, to, filter);
        let logs = self.http.eth().logs(web3_filter).await.map_err(classify_error)?;
        Ok(logs.into_iter().filter_map(from_web3_log).collect())
    }

    async fn subscribe_logs(
        &self,
        filter: EthGetLogsFilter,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Log, LogSourceError>> + Send>>, LogSourceError> {
        let ws_url = self
            .ws_url
            .clone()
            .ok_or_else(|| LogSourceError::SubscriptionFailed("no websocket endpoint configured".to_string()))?;

        debug!(self.logger, "opening eth_subscribe websocket"; "url" => &ws_url);
        let transport = WebSocket::new(&ws_url).await.map_err(|e| LogSourceError::SubscriptionFailed(e.to_string()))?;
        let web3_ws = Web3::new(transport);

        let web3_filter = to_web3_subscription_filter(&filter);
        let subscription = web3_ws
            .eth_subscribe()
            .subscribe_logs(web3_filter)
            .await
            .map_err(|e| LogSourceError::SubscriptionFailed(e.to_string()))?;

        let stream = subscription.map(|item| match item {
            Ok(log) => from_web3_log(log).ok_or_else(|| {
                LogSourceError::SubscriptionFailed("log missing block_number/transaction_index".to_string())
            }),
            Err(e) => Err(LogSourceError::SubscriptionFailed(e.to_string())),
        });

        Ok(Box::pin(stream))
    }

    async fn call(&self, call: ContractCall) -> Result<Vec<ethabi::Token>, PluginError> {
        let address = call.address.trim_start_matches("0x");
        let address_bytes = hex::decode(address).map_err(|e| PluginError::Rpc(format!("invalid address: {e}")))?;
        let address = web3::types::H160::from_slice(&address_bytes);

        let data = call.function.encode_input(&call.args).map_err(|e| PluginError::Rpc(e.to_string()))?;
        let request = web3::types::CallRequest {
            to: Some(address),
            data: Some(web3::types::Bytes(data)),
            ..Default::default()
        };
        let block_number = call.at_block.map(|b| BlockNumber::Number(b.into())).unwrap_or(BlockNumber::Latest);
        let block_id = web3::types::BlockId::Number(block_number);

        let result = self
            .http
            .eth()
            .call(request, Some(block_id))
            .await
            .map_err(|e| PluginError::Rpc(e.to_string()))?;

        call.function.decode_output(&result.0).map_err(|e| PluginError::Rpc(e.to_string()))
    }
}

fn classify_error(err: web3::Error) -> LogSourceError {
    let message = err.to_string();
    if message.contains(RATE_LIMIT_MARKER) {
        LogSourceError::RateLimited { attempts: 1 }
    } else {
        LogSourceError::Rpc(message)
    }
}
