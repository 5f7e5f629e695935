//! Per-sender nonce-ordered admission and scheduling (§4.5).
//!
//! Grounded on `MemPool`/`MPService` in
//! examples/original_source/proxy/mempool/mempool_service.py: a single
//! scheduler reacting to submit/resource-release/executor-completion/tick
//! events, re-architected per the REDESIGN FLAGS as explicit dependency
//! injection (`TxValidator`, `ChainNonceSource`) instead of a global
//! singleton, and a tagged `SubmitOutcome` instead of exception-driven
//! control flow.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use ethereum_types::{H160, H256, U256};
use parking_lot::Mutex;
use sg_primitives::{GasPriceSnapshot, GatewayError, MempoolTx, RejectReason, SubmitOutcome};
use tokio::sync::Notify;

use crate::cache::{CacheEntry, MempoolTxCache};
use crate::executor::{ExecutionReceipt, ExecutorBackend, ExecutorPool, ExecutorRequest};
use crate::replicator::Replicator;
use crate::resource::{ResourceManager, UsageOutcome};

/// Validates a submitted transaction's signature. The real implementation
/// recovers the signer from `tx.raw` (out of scope per §1: signing-key
/// handling is an external collaborator); tests plug in a stub.
pub trait TxValidator: Send + Sync {
	fn is_valid(&self, tx: &MempoolTx) -> bool;
}

/// Reads the sender's current on-chain nonce from the foreign ledger.
pub trait ChainNonceSource: Send + Sync {
	fn on_chain_nonce(&self, sender: H160) -> u64;
}

struct QueuedTx {
	tx: MempoolTx,
	submitted_at: Instant,
}

struct State {
	suspended: bool,
	queues: HashMap<H160, BTreeMap<u64, QueuedTx>>,
}

pub struct Mempool<B: ExecutorBackend + 'static> {
	state: Mutex<State>,
	cache: Mutex<MempoolTxCache>,
	gas_price: Mutex<GasPriceSnapshot>,
	min_gas_price: U256,
	resources: ResourceManager,
	executors: ExecutorPool<B>,
	validator: Arc<dyn TxValidator>,
	chain: Arc<dyn ChainNonceSource>,
	replicator: Arc<Replicator>,
	notify: Notify,
}

impl<B: ExecutorBackend + 'static> Mempool<B> {
	pub fn new(
		resource_count: u32,
		min_gas_price: U256,
		cache_ttl_secs: u64,
		backend: Arc<B>,
		validator: Arc<dyn TxValidator>,
		chain: Arc<dyn ChainNonceSource>,
		replicator: Arc<Replicator>,
	) -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				suspended: false,
				queues: HashMap::new(),
			}),
			cache: Mutex::new(MempoolTxCache::new(cache_ttl_secs)),
			gas_price: Mutex::new(GasPriceSnapshot {
				minimum: min_gas_price.low_u64(),
				suggested: min_gas_price.low_u64(),
				refreshed_at: Instant::now(),
			}),
			min_gas_price,
			resources: ResourceManager::new(resource_count),
			executors: ExecutorPool::new(backend),
			validator,
			chain,
			replicator,
			notify: Notify::new(),
		})
	}

	pub async fn async_init(&self, executor_count: u32) {
		self.executors.async_init(executor_count).await;
	}

	/// `submit(tx) -> submit_outcome` (§4.5). Admission checks run in the
	/// order the spec fixes: duplicate, underpriced, bad signature, nonce
	/// too low, replacement-rule collision, enqueue.
	pub fn submit(self: &Arc<Self>, tx: MempoolTx) -> SubmitOutcome {
		{
			let mut cache = self.cache.lock();
			cache.sweep();
			if cache.contains(&tx.signature) {
				return SubmitOutcome::DuplicateKnown;
			}
		}

		if tx.gas_price < self.min_gas_price {
			log::info!(target: "sg-mempool", "rejecting {:?}: underpriced", tx.signature);
			return SubmitOutcome::Rejected(RejectReason::Underpriced);
		}

		if !self.validator.is_valid(&tx) {
			log::info!(target: "sg-mempool", "rejecting {:?}: bad signature", tx.signature);
			return SubmitOutcome::Rejected(RejectReason::BadSignature);
		}

		let on_chain_nonce = self.chain.on_chain_nonce(tx.sender);
		if tx.nonce < on_chain_nonce {
			return SubmitOutcome::NonceTooLow { on_chain_nonce };
		}

		let mut state = self.state.lock();
		let queue = state.queues.entry(tx.sender).or_default();
		let mut outcome = SubmitOutcome::Accepted;
		if let Some(incumbent) = queue.get(&tx.nonce) {
			let required = incumbent.tx.min_replacement_gas_price();
			if tx.gas_price < required {
				return SubmitOutcome::UnderpricedReplacement { required };
			}
		} else {
			let mut pending_nonce = on_chain_nonce;
			while queue.contains_key(&pending_nonce) {
				pending_nonce += 1;
			}
			if tx.nonce > pending_nonce {
				outcome = SubmitOutcome::NonceGap { pending_nonce };
			}
		}
		queue.insert(
			tx.nonce,
			QueuedTx {
				tx: tx.clone(),
				submitted_at: Instant::now(),
			},
		);
		drop(state);

		self.dispatch_ready();
		outcome
	}

	/// `get_pending_nonce(sender) -> u64` (§4.5).
	pub fn get_pending_nonce(&self, sender: H160) -> u64 {
		let on_chain_nonce = self.chain.on_chain_nonce(sender);
		let state = self.state.lock();
		let mut cursor = on_chain_nonce;
		if let Some(queue) = state.queues.get(&sender) {
			while queue.contains_key(&cursor) {
				cursor += 1;
			}
		}
		cursor
	}

	/// `get_pending_tx_by_hash(h) -> tx?` (§4.5): consults the queue, then
	/// the cache.
	pub fn get_pending_tx_by_hash(&self, signature: H256) -> Option<MempoolTx> {
		{
			let state = self.state.lock();
			for queue in state.queues.values() {
				for queued in queue.values() {
					if queued.tx.signature == signature {
						return Some(queued.tx.clone());
					}
				}
			}
		}
		match self.cache.lock().get(&signature) {
			Some(CacheEntry::Tx(tx)) => Some(tx),
			_ => None,
		}
	}

	pub fn get_gas_price(&self) -> GasPriceSnapshot {
		*self.gas_price.lock()
	}

	/// Total transactions queued across all senders, for `MempoolMetrics`.
	pub fn queued_tx_count(&self) -> usize {
		self.state.lock().queues.values().map(BTreeMap::len).sum()
	}

	pub fn free_resource_count(&self) -> usize {
		self.resources.free_count()
	}

	pub fn live_executor_count(&self) -> usize {
		self.executors.worker_count()
	}

	pub fn set_gas_price(&self, suggested: u64) {
		let mut snapshot = self.gas_price.lock();
		snapshot.suggested = suggested;
		snapshot.refreshed_at = Instant::now();
	}

	/// `suspend()` (§4.5): the scheduler stops dispatching new work;
	/// in-flight executions complete normally.
	pub fn suspend(&self) {
		self.state.lock().suspended = true;
	}

	pub fn resume(self: &Arc<Self>) {
		self.state.lock().suspended = false;
		self.dispatch_ready();
	}

	/// `on_resource_released(resource_id)` (§4.5): re-runs the scheduler pass.
	pub fn on_resource_released(self: &Arc<Self>, resource_id: u32) {
		self.resources.release(resource_id);
		self.dispatch_ready();
	}

	fn dispatch_ready(self: &Arc<Self>) {
		self.notify.notify_one();
		let this = self.clone();
		tokio::spawn(async move { this.run_scheduler_pass().await });
	}

	/// The scheduler pass (§4.5): while not suspended and resources are
	/// free, pick the highest-gas-price ready head across senders
	/// (tie-break earliest submit time), lease a resource, and hand the tx
	/// to the executor pool.
	async fn run_scheduler_pass(self: Arc<Self>) {
		loop {
			let candidate = {
				let state = self.state.lock();
				if state.suspended {
					return;
				}
				self.pick_ready_head(&state.queues)
			};
			let Some((sender, nonce, tx)) = candidate else {
				return;
			};

			let Some(lease) = self.resources.try_acquire(tx.signature) else {
				return;
			};

			{
				let mut state = self.state.lock();
				if let Some(queue) = state.queues.get_mut(&sender) {
					queue.remove(&nonce);
				}
			}

			let this = self.clone();
			tokio::spawn(async move {
				let result = this
					.executors
					.submit(ExecutorRequest {
						signature: tx.signature,
						raw: tx.raw.clone(),
						deadline: tx.deadline,
					})
					.await;
				this.complete_dispatch(tx, lease.resource_id, result).await;
			});
		}
	}

	fn pick_ready_head(
		&self,
		queues: &HashMap<H160, BTreeMap<u64, QueuedTx>>,
	) -> Option<(H160, u64, MempoolTx)> {
		let mut best: Option<(H160, u64, &QueuedTx)> = None;
		for (sender, queue) in queues {
			let on_chain_nonce = self.chain.on_chain_nonce(*sender);
			let Some((nonce, queued)) = queue.iter().next() else {
				continue;
			};
			if *nonce != on_chain_nonce {
				continue;
			}
			let better = match &best {
				None => true,
				Some((_, _, incumbent)) => {
					queued.tx.gas_price > incumbent.tx.gas_price
						|| (queued.tx.gas_price == incumbent.tx.gas_price
							&& queued.submitted_at < incumbent.submitted_at)
				}
			};
			if better {
				best = Some((*sender, *nonce, queued));
			}
		}
		best.map(|(sender, nonce, queued)| (sender, nonce, queued.tx.clone()))
	}

	async fn complete_dispatch(
		self: Arc<Self>,
		tx: MempoolTx,
		resource_id: u32,
		result: Result<ExecutionReceipt, GatewayError>,
	) {
		self.resources.on_used(
			resource_id,
			if result.is_ok() {
				UsageOutcome::Completed
			} else {
				UsageOutcome::Failed
			},
		);
		self.resources.release(resource_id);

		let error = result.as_ref().err().cloned();
		self.cache.lock().add(tx.clone(), error);

		if result.is_ok() {
			self.replicator.broadcast(tx).await;
		}

		self.dispatch_ready();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::executor::{ExecutionReceipt, ExecutorRequest};
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU64, Ordering};

	struct AlwaysValid;
	impl TxValidator for AlwaysValid {
		fn is_valid(&self, _tx: &MempoolTx) -> bool {
			true
		}
	}

	struct FixedNonce(AtomicU64);
	impl ChainNonceSource for FixedNonce {
		fn on_chain_nonce(&self, _sender: H160) -> u64 {
			self.0.load(Ordering::SeqCst)
		}
	}

	struct EchoBackend;
	#[async_trait]
	impl ExecutorBackend for EchoBackend {
		async fn execute(&self, req: ExecutorRequest) -> Result<ExecutionReceipt, GatewayError> {
			Ok(ExecutionReceipt { signature: req.signature })
		}
	}

	fn tx(sender: H160, nonce: u64, gas_price: u64, sig: u8) -> MempoolTx {
		MempoolTx::new(H256::repeat_byte(sig), sender, nonce, U256::from(gas_price), vec![])
	}

	fn mempool() -> Arc<Mempool<EchoBackend>> {
		Mempool::new(
			4,
			U256::from(10),
			15,
			Arc::new(EchoBackend),
			Arc::new(AlwaysValid),
			Arc::new(FixedNonce(AtomicU64::new(0))),
			Arc::new(Replicator::new()),
		)
	}

	#[tokio::test]
	async fn underpriced_transactions_are_rejected() {
		let mp = mempool();
		let outcome = mp.submit(tx(H160::repeat_byte(1), 0, 1, 1));
		assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::Underpriced));
	}

	#[tokio::test]
	async fn nonce_below_on_chain_is_rejected() {
		let mp: Arc<Mempool<EchoBackend>> = Mempool::new(
			4,
			U256::from(10),
			15,
			Arc::new(EchoBackend),
			Arc::new(AlwaysValid),
			Arc::new(FixedNonce(AtomicU64::new(5))),
			Arc::new(Replicator::new()),
		);
		let outcome = mp.submit(tx(H160::repeat_byte(1), 2, 100, 1));
		assert_eq!(outcome, SubmitOutcome::NonceTooLow { on_chain_nonce: 5 });
	}

	#[tokio::test]
	async fn replacement_requires_a_ten_percent_bump() {
		let mp = mempool();
		let sender = H160::repeat_byte(2);
		assert_eq!(mp.submit(tx(sender, 0, 100, 1)), SubmitOutcome::Accepted);
		assert_eq!(
			mp.submit(tx(sender, 0, 109, 2)),
			SubmitOutcome::UnderpricedReplacement {
				required: U256::from(110)
			}
		);
		assert_eq!(mp.submit(tx(sender, 0, 110, 3)), SubmitOutcome::Accepted);
	}

	#[tokio::test]
	async fn a_tx_queued_behind_a_gap_reports_the_pending_nonce() {
		let mp = mempool();
		let sender = H160::repeat_byte(6);
		// on-chain nonce is 0; nonce 3 leaves a gap at 0-2.
		assert_eq!(
			mp.submit(tx(sender, 3, 100, 13)),
			SubmitOutcome::NonceGap { pending_nonce: 0 }
		);
	}

	#[tokio::test]
	async fn filling_the_gap_is_reported_as_a_plain_accept() {
		let mp = mempool();
		let sender = H160::repeat_byte(7);
		assert_eq!(
			mp.submit(tx(sender, 1, 100, 14)),
			SubmitOutcome::NonceGap { pending_nonce: 0 }
		);
		assert_eq!(mp.submit(tx(sender, 0, 100, 15)), SubmitOutcome::Accepted);
	}

	#[tokio::test]
	async fn duplicate_signature_after_dispatch_is_known() {
		let mp = mempool();
		let sender = H160::repeat_byte(3);
		let t = tx(sender, 0, 100, 9);
		assert_eq!(mp.submit(t.clone()), SubmitOutcome::Accepted);
		// Give the spawned scheduler/executor tasks a chance to run.
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		assert_eq!(mp.submit(t), SubmitOutcome::DuplicateKnown);
	}

	#[tokio::test]
	async fn pending_nonce_stops_at_the_first_gap() {
		let mp = mempool();
		let sender = H160::repeat_byte(4);
		// on-chain nonce is 0; queue nonces 1 and 2 (gap before dispatch since
		// only nonce 0 is a ready head) leaving a visible gap at 0.
		mp.submit(tx(sender, 1, 100, 10));
		mp.submit(tx(sender, 2, 100, 11));
		assert_eq!(mp.get_pending_nonce(sender), 0);
	}

	#[tokio::test]
	async fn suspend_prevents_dispatch_until_resumed() {
		let mp = mempool();
		mp.suspend();
		let sender = H160::repeat_byte(5);
		assert_eq!(mp.submit(tx(sender, 0, 100, 12)), SubmitOutcome::Accepted);
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		assert!(mp.get_pending_tx_by_hash(H256::repeat_byte(12)).is_some());
		mp.resume();
	}
}
