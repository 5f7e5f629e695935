//! JSON shape of a block returned from `eth_getBlockBy{Hash,Number}` (§6).
//!
//! Grounded on `fc-rpc-core`'s `Block`/`Header` types
//! (examples/polkadot-evm-frontier/client/rpc-core/src/types/block.rs):
//! `camelCase` field renaming and a handful of fixed/derived fields rather
//! than a generic passthrough of the stored row.

use ethereum_types::{H256, U256};
use serde::Serialize;
use sg_primitives::BlockInfo;

/// `gasLimit` is a fixed constant in this gateway (§6) — the foreign
/// ledger's real compute budget is not modeled here.
const FIXED_GAS_LIMIT: &str = "0x6691b7";

/// §6: `logsBloom: 128 zero bytes` — this gateway never populates a real
/// bloom filter.
fn zero_logs_bloom() -> String {
	format!("0x{}", "00".repeat(128))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
	pub hash: H256,
	pub number: U256,
	pub parent_hash: H256,
	pub timestamp: U256,
	pub transactions: Vec<H256>,
	pub gas_used: U256,
	pub gas_limit: &'static str,
	pub logs_bloom: String,
}

impl BlockView {
	/// Builds the external JSON shape from a `BlockStore::get_by_*` result.
	/// `info.hash`/`info.time`/`info.parent_hash` are always populated by
	/// `BlockStore` (real or synthesized), never `None`, by the time a block
	/// is returned to a caller that didn't ask for a slot above the tip.
	pub fn from_block_info(info: &BlockInfo, transactions: Vec<H256>) -> Self {
		Self {
			hash: info.hash.unwrap_or_default(),
			number: U256::from(info.slot),
			parent_hash: info.parent_hash.unwrap_or_default(),
			timestamp: U256::from(info.time.unwrap_or_default().max(0)),
			transactions,
			gas_used: U256::zero(),
			gas_limit: FIXED_GAS_LIMIT,
			logs_bloom: zero_logs_bloom(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn logs_bloom_is_128_zero_bytes() {
		let bloom = zero_logs_bloom();
		assert_eq!(bloom.len(), 2 + 128 * 2);
		assert!(bloom[2..].chars().all(|c| c == '0'));
	}
}
