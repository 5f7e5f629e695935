//! Lease pool of operator resources (§4.3).
//!
//! Grounded on `OperatorResourceMng`'s role in `mempool_service.py`: a fixed
//! pool of signing identities, leased to exactly one in-flight execution at
//! a time.

use ethereum_types::H256;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLease {
	pub resource_id: u32,
	pub holder: H256,
}

/// What happened to the resource after an execution, for `on_used` bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
	Completed,
	Failed,
}

struct State {
	free: VecDeque<u32>,
	held_by: Vec<Option<H256>>,
}

/// Pool of `N` resource identities, round-robin first-available allocation
/// (§4.3). `|acquired| <= N` and no signature holds more than one lease
/// concurrently.
pub struct ResourceManager {
	state: Mutex<State>,
}

impl ResourceManager {
	pub fn new(count: u32) -> Self {
		Self {
			state: Mutex::new(State {
				free: (0..count).collect(),
				held_by: vec![None; count as usize],
			}),
		}
	}

	/// `try_acquire(signature) -> resource_id | none` (§4.3).
	pub fn try_acquire(&self, signature: H256) -> Option<ResourceLease> {
		let mut state = self.state.lock();
		if state.held_by.iter().flatten().any(|h| *h == signature) {
			return None;
		}
		let resource_id = state.free.pop_front()?;
		state.held_by[resource_id as usize] = Some(signature);
		Some(ResourceLease {
			resource_id,
			holder: signature,
		})
	}

	/// `release(resource_id)` (§4.3). Returns the resource to the free pool.
	pub fn release(&self, resource_id: u32) {
		let mut state = self.state.lock();
		if state.held_by[resource_id as usize].take().is_some() {
			state.free.push_back(resource_id);
			log::debug!(target: "sg-mempool", "released resource {resource_id}");
		}
	}

	/// `on_used(resource_id, outcome)` (§4.3). No pool-level bookkeeping is
	/// required beyond logging; the caller is responsible for releasing.
	pub fn on_used(&self, resource_id: u32, outcome: UsageOutcome) {
		match outcome {
			UsageOutcome::Completed => {
				log::debug!(target: "sg-mempool", "resource {resource_id} completed its lease")
			}
			UsageOutcome::Failed => {
				log::warn!(target: "sg-mempool", "resource {resource_id} failed its lease")
			}
		}
	}

	pub fn free_count(&self) -> usize {
		self.state.lock().free.len()
	}

	pub fn capacity(&self) -> usize {
		self.state.lock().held_by.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn at_most_one_lease_per_resource() {
		let mgr = ResourceManager::new(2);
		let a = mgr.try_acquire(H256::repeat_byte(1)).unwrap();
		let b = mgr.try_acquire(H256::repeat_byte(2)).unwrap();
		assert_ne!(a.resource_id, b.resource_id);
		assert!(mgr.try_acquire(H256::repeat_byte(3)).is_none());
	}

	#[test]
	fn a_signature_cannot_hold_two_leases_concurrently() {
		let mgr = ResourceManager::new(4);
		let sig = H256::repeat_byte(7);
		assert!(mgr.try_acquire(sig).is_some());
		assert!(mgr.try_acquire(sig).is_none());
	}

	#[test]
	fn release_returns_the_resource_to_the_free_pool() {
		let mgr = ResourceManager::new(1);
		let lease = mgr.try_acquire(H256::repeat_byte(1)).unwrap();
		assert_eq!(mgr.free_count(), 0);
		mgr.release(lease.resource_id);
		assert_eq!(mgr.free_count(), 1);
		assert!(mgr.try_acquire(H256::repeat_byte(2)).is_some());
	}
}
