//! Ambient instrumentation for the mempool (SPEC_FULL §4.10).
//!
//! Mirrors how `fc-rpc` threads a `prometheus::Registry` in at construction
//! time rather than reaching for a global recorder.

use prometheus::{IntGauge, Registry};

pub struct MempoolMetrics {
	pub queued_tx_count: IntGauge,
	pub free_resource_count: IntGauge,
	pub live_executor_count: IntGauge,
}

impl MempoolMetrics {
	pub fn register(registry: &Registry) -> prometheus::Result<Self> {
		let queued_tx_count = IntGauge::new("slotgate_mempool_queued_tx", "Queued transactions across all senders")?;
		let free_resource_count =
			IntGauge::new("slotgate_mempool_free_resources", "Unleased operator resources")?;
		let live_executor_count =
			IntGauge::new("slotgate_mempool_live_executors", "Executor workers currently responsive")?;

		registry.register(Box::new(queued_tx_count.clone()))?;
		registry.register(Box::new(free_resource_count.clone()))?;
		registry.register(Box::new(live_executor_count.clone()))?;

		Ok(Self {
			queued_tx_count,
			free_resource_count,
			live_executor_count,
		})
	}
}
