//! Short-lived registry of recently accepted/rejected transactions (§4.2).
//!
//! Grounded on `MPTxDict`
//! (examples/original_source/proxy/mempool/mempool_neon_tx_dict.py): a deque
//! for O(1) front expiry paired with a map for O(1) lookup, both pointing at
//! the same item identity.

use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use ethereum_types::H256;
use sg_primitives::{GatewayError, MempoolTx};

const DEFAULT_TTL_SECS: u64 = 15;

#[derive(Debug, Clone)]
struct CacheItem {
	signature: H256,
	inserted_at: u64,
	tx: MempoolTx,
	error: Option<GatewayError>,
}

/// The result of a cache lookup (§4.2 `get`): the original tx, a recorded
/// error, or nothing known.
#[derive(Debug, Clone)]
pub enum CacheEntry {
	Tx(MempoolTx),
	Error(GatewayError),
}

fn whole_seconds_now() -> u64 {
	// `ceil` of a fractional unix timestamp, matching `math.ceil(time.time())`.
	let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
	if now.subsec_nanos() == 0 {
		now.as_secs()
	} else {
		now.as_secs() + 1
	}
}

pub struct MempoolTxCache {
	ttl_secs: u64,
	by_signature: HashMap<H256, CacheItem>,
	by_insertion: VecDeque<H256>,
}

impl MempoolTxCache {
	pub fn new(ttl_secs: u64) -> Self {
		Self {
			ttl_secs,
			by_signature: HashMap::new(),
			by_insertion: VecDeque::new(),
		}
	}

	/// `add(signature, tx, error?)` (§4.2). Timestamps with whole-second
	/// resolution.
	pub fn add(&mut self, tx: MempoolTx, error: Option<GatewayError>) {
		let signature = tx.signature;
		let item = CacheItem {
			signature,
			inserted_at: whole_seconds_now(),
			tx,
			error,
		};
		self.by_insertion.push_back(signature);
		self.by_signature.insert(signature, item);
	}

	pub fn contains(&self, signature: &H256) -> bool {
		self.by_signature.contains_key(signature)
	}

	pub fn get(&self, signature: &H256) -> Option<CacheEntry> {
		let item = self.by_signature.get(signature)?;
		Some(match &item.error {
			Some(err) => CacheEntry::Error(err.clone()),
			None => CacheEntry::Tx(item.tx.clone()),
		})
	}

	/// `sweep()` (§4.2): drains items inserted before `now - TTL`. Called
	/// opportunistically on submit and on a periodic tick.
	pub fn sweep(&mut self) {
		if self.by_insertion.is_empty() {
			return;
		}
		let horizon = whole_seconds_now().saturating_sub(self.ttl_secs);
		while let Some(signature) = self.by_insertion.front() {
			let expired = self
				.by_signature
				.get(signature)
				.map(|item| item.inserted_at < horizon)
				.unwrap_or(true);
			if !expired {
				break;
			}
			let signature = self.by_insertion.pop_front().unwrap();
			self.by_signature.remove(&signature);
		}
	}

	pub fn len(&self) -> usize {
		self.by_signature.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_signature.is_empty()
	}
}

impl Default for MempoolTxCache {
	fn default() -> Self {
		Self::new(DEFAULT_TTL_SECS)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ethereum_types::{H160, U256};

	fn tx(signature: H256) -> MempoolTx {
		MempoolTx::new(signature, H160::zero(), 0, U256::zero(), vec![])
	}

	#[test]
	fn round_trips_a_lookup() {
		let mut cache = MempoolTxCache::new(15);
		let sig = H256::repeat_byte(1);
		cache.add(tx(sig), None);
		assert!(matches!(cache.get(&sig), Some(CacheEntry::Tx(_))));
	}

	#[test]
	fn negative_entries_carry_the_error() {
		let mut cache = MempoolTxCache::new(15);
		let sig = H256::repeat_byte(2);
		cache.add(tx(sig), Some(GatewayError::underpriced()));
		assert!(matches!(cache.get(&sig), Some(CacheEntry::Error(_))));
	}

	#[test]
	fn sweep_only_removes_items_past_the_ttl_horizon() {
		let mut cache = MempoolTxCache::new(15);
		let sig = H256::repeat_byte(3);
		cache.by_insertion.push_back(sig);
		cache.by_signature.insert(
			sig,
			CacheItem {
				signature: sig,
				inserted_at: 0,
				tx: tx(sig),
				error: None,
			},
		);
		cache.sweep();
		assert!(cache.get(&sig).is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn map_and_sequence_stay_in_sync_after_a_sweep() {
		let mut cache = MempoolTxCache::new(15);
		let stale = H256::repeat_byte(4);
		let fresh = H256::repeat_byte(5);
		cache.by_insertion.push_back(stale);
		cache.by_signature.insert(
			stale,
			CacheItem {
				signature: stale,
				inserted_at: 0,
				tx: tx(stale),
				error: None,
			},
		);
		cache.add(tx(fresh), None);
		cache.sweep();
		assert_eq!(cache.len(), cache.by_insertion.len());
		assert!(cache.contains(&fresh));
		assert!(!cache.contains(&stale));
	}
}
