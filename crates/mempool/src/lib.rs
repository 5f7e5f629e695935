//! Admission, scheduling, leasing and replication for the slotgate mempool
//! (spec.md §4.2–§4.6).

pub mod cache;
pub mod executor;
pub mod mempool;
pub mod metrics;
pub mod replicator;
pub mod resource;

pub use cache::{CacheEntry, MempoolTxCache};
pub use executor::{ExecutionReceipt, ExecutorBackend, ExecutorPool, ExecutorRequest, DEFAULT_EXECUTOR_COUNT};
pub use mempool::{ChainNonceSource, Mempool, TxValidator};
pub use metrics::MempoolMetrics;
pub use replicator::{Peer, Replicator};
pub use resource::{ResourceLease, ResourceManager, UsageOutcome};
