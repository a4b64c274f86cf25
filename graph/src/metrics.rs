//! Ambient RPC metrics, carried over from the teacher's
//! `ProviderEthRpcMetrics`/`SubgraphEthRpcMetrics` pattern even though
//! spec.md scopes the scrape endpoint itself out (§1: "the HTTP handler
//! surface ... out of scope"). Observability primitives are ambient stack,
//! not a feature a Non-goal names.

use prometheus::{CounterVec, HistogramVec, Opts, Registry};

#[derive(Clone)]
pub struct EthRpcMetrics {
    request_duration: HistogramVec,
    errors: CounterVec,
}

impl EthRpcMetrics {
    pub fn new(registry: &Registry) -> Self {
        let request_duration = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "indexer_eth_rpc_request_duration_seconds",
                "Duration of eth RPC requests made by the ingestion pipeline",
            ),
            &["method"],
        )
        .expect("valid histogram metric");
        let errors = CounterVec::new(
            Opts::new("indexer_eth_rpc_errors_total", "Count of eth RPC request errors"),
            &["method"],
        )
        .expect("valid counter metric");

        registry
            .register(Box::new(request_duration.clone()))
            .expect("metric not already registered");
        registry.register(Box::new(errors.clone())).expect("metric not already registered");

        Self { request_duration, errors }
    }

    pub fn observe_request(&self, method: &str, seconds: f64) {
        self.request_duration.with_label_values(&[method]).observe(seconds);
    }

    pub fn record_error(&self, method: &str) {
        self.errors.with_label_values(&[method]).inc();
    }
}
