use ethereum_types::H256;
use serde::{Deserialize, Serialize};

/// A stored row in the slot-indexed block table.
///
/// Identity is `slot`. A row may be synthetic in the sense that `hash`/`time`
/// were never materialized by the indexer and are computed on demand by
/// [`crate::synthetic`] helpers at read time — this struct always carries
/// concrete values because it models what is actually persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub slot: u64,
	pub hash: H256,
	pub time: i64,
	pub parent_slot: u64,
	pub is_finalized: bool,
	pub is_active: bool,
}

/// The block shape returned to callers. `hash` and `parent_hash` are always
/// populated (synthesized if the slot has no materialized row); `time` is
/// `None` only for the above-tip stub case (§4.1 S1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockInfo {
	pub slot: u64,
	pub hash: Option<H256>,
	pub time: Option<i64>,
	pub parent_hash: Option<H256>,
	pub is_finalized: bool,
}

impl BlockInfo {
	/// A stub for a slot above the indexer's current tip (§4.1 S1).
	pub fn stub(slot: u64) -> Self {
		Self {
			slot,
			..Default::default()
		}
	}

	/// Overrides the returned hash, used when a synthetic-hash lookup is
	/// probing an uncle branch (§4.1, `get_by_hash`).
	pub fn set_hash(&mut self, hash: H256) {
		self.hash = Some(hash);
	}
}
