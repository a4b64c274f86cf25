//! The ingestion pipeline: decode, fan out to plugins, reduce, materialize,
//! resolve metadata, and persist — plus the deep-refresh and status-reporting
//! side channels that run independently of the live ingestion loop.

pub mod abi_functions;
pub mod decoder;
pub mod filter_manager;
pub mod log_source;
pub mod metadata;
pub mod pipeline;
pub mod plugin_bus;
pub mod plugins;
pub mod reducer;
pub mod refresh_orchestrator;
pub mod status;

pub use pipeline::Pipeline;
pub use refresh_orchestrator::{RefreshCriteria, RefreshOrchestrator};
pub use status::{StatusReporter, StatusSnapshot};
