//! Protocol-level constants shared by every stage: event topics (spec.md §6)
//! and the chunking/windowing defaults (spec.md §3-4).

/// `keccak256("Transfer(address,address,uint256)")`.
pub const TOPIC_TRANSFER: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// `keccak256("TransferSingle(address,address,address,uint256,uint256)")`.
pub const TOPIC_TRANSFER_SINGLE: &str =
    "0xc3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62";

/// `keccak256("TransferBatch(address,address,address,uint256[],uint256[])")`.
pub const TOPIC_TRANSFER_BATCH: &str =
    "0x4a39dc06d4c0dbc64b70af90fd698a233a518aa5d07e595d983b8c0526c8f7fb";

/// `keccak256("URI(string,uint256)")`.
pub const TOPIC_URI: &str = "0x6bb7ff708619ba0610cba295a58592e0451dee2622938c8755667688daf3529b";

/// Window size for a single `eth_getLogs` call / bloom filter (spec.md §4.1, §GLOSSARY).
pub const DEFAULT_BLOCKS_PER_LOGS_CALL: u64 = 50;

/// Number of filters loaded/evicted as a unit by `BlockFilterManager` (spec.md §3).
pub const DEFAULT_CHUNK_SIZE: u64 = 200;

/// Bounded worker pool size per plugin (spec.md §5).
pub const DEFAULT_PLUGIN_POOL_SIZE: usize = 32;

/// Per-worker-operation timeout (spec.md §4.4).
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 120;

/// `maxConcurrentRuns` — concurrent chunk tasks owned by the pipeline (spec.md §5).
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 24;

/// Capped exponential backoff attempts for rate-limited RPC responses (spec.md §7).
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Default deep-refresh lookback window and minimum starting block (spec.md §4.8).
pub const DEFAULT_REFRESH_LOOKBACK_BLOCKS: u64 = 5_000_000;
pub const DEFAULT_REFRESH_MIN_START_BLOCK: u64 = 5_000_000;

/// Default task size a deep refresh is partitioned into before windowing (spec.md §4.8).
pub const DEFAULT_REFRESH_TASK_SIZE: u64 = 240_000;

/// Marker substring identifying a rate-limit response (spec.md §4.1, §7).
pub const RATE_LIMIT_MARKER: &str = "429 Too Many Requests";
