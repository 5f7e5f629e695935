//! Synthetic hash/time for slots the indexer hasn't materialized a row for.
//!
//! Grounded on `SolBlocksDB._generate_fake_block_hash` /
//! `_generate_fake_block_time` / `_get_fake_block_slot`
//! (examples/original_source/proxy/indexer/solana_blocks_db.py).

use ethereum_types::H256;

const SECONDS_PER_SLOT_NUM: i64 = 2;
const SECONDS_PER_SLOT_DEN: i64 = 5; // 0.4s/slot as an exact fraction

fn left_pad(s: &str, width: usize, fill: char) -> String {
	if s.len() >= width {
		s.to_string()
	} else {
		let mut padded: String = std::iter::repeat(fill).take(width - s.len()).collect();
		padded.push_str(s);
		padded
	}
}

/// Encodes `slot` into the decodable 32-byte synthetic hash space. Negative
/// slots (used internally for "the parent of slot 0") clamp to the all-zero
/// hash.
pub fn encode_synthetic_hash(slot: i64) -> H256 {
	if slot < 0 {
		return H256::zero();
	}
	let hex_digits = format!("{slot:x}");
	let len = hex_digits.len();
	let even_len = ((len >> 1) + (len % 2)) << 1;
	let padded_digits = left_pad(&hex_digits, even_len, '0');
	let body = format!("00{padded_digits}");
	let hash_hex = left_pad(&body, 64, 'f');
	let bytes = hex::decode(hash_hex).expect("fixed-width hex string");
	H256::from_slice(&bytes)
}

/// Decodes a synthetic hash back to its slot, or `None` if `hash` doesn't
/// match the `0xff…ff00<slot>` pattern (§8 property 1).
pub fn decode_synthetic_slot(hash: H256) -> Option<u64> {
	let hex_str = hex::encode(hash.as_bytes());
	let stripped = hex_str.trim_start_matches('f');
	if stripped.len() > 12 || !stripped.starts_with("00") {
		return None;
	}
	let value_digits = stripped[2..].trim_start_matches('0');
	if value_digits.is_empty() {
		return Some(0);
	}
	u64::from_str_radix(value_digits, 16).ok()
}

/// `ceil(n * 0.4)` computed exactly in integer arithmetic, for `n >= 0`.
fn ceil_slot_delta(n: u64) -> i64 {
	let numerator = n as i64 * SECONDS_PER_SLOT_NUM;
	(numerator + SECONDS_PER_SLOT_DEN - 1) / SECONDS_PER_SLOT_DEN
}

/// A stored neighbor used to interpolate/extrapolate a synthetic time.
pub struct Neighbor {
	pub slot: u64,
	pub time: i64,
}

/// Synthesizes a time for `slot` from its nearest stored neighbors (§4.1).
pub fn synthetic_time(
	slot: u64,
	lower: Option<Neighbor>,
	upper: Option<Neighbor>,
	genesis_time: i64,
) -> i64 {
	if let Some(lower) = lower {
		lower.time + ceil_slot_delta(slot - lower.slot)
	} else if let Some(upper) = upper {
		upper.time - ceil_slot_delta(upper.slot - slot)
	} else {
		ceil_slot_delta(slot) + genesis_time
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_across_a_wide_slot_range() {
		for slot in [0u64, 1, 2, 0x1234, 0xabcdef, (1u64 << 47) - 1] {
			let hash = encode_synthetic_hash(slot as i64);
			assert_eq!(decode_synthetic_slot(hash), Some(slot), "slot {slot:#x}");
		}
	}

	#[test]
	fn slot_zero_encodes_to_a_decodable_hash() {
		let hash = encode_synthetic_hash(0);
		assert_eq!(decode_synthetic_slot(hash), Some(0));
	}

	#[test]
	fn negative_slot_clamps_to_all_zero_hash() {
		assert_eq!(encode_synthetic_hash(-1), H256::zero());
		assert_eq!(decode_synthetic_slot(H256::zero()), Some(0));
	}

	#[test]
	fn non_synthetic_hash_does_not_decode() {
		let random = H256::repeat_byte(0xAB);
		assert_eq!(decode_synthetic_slot(random), None);
	}

	#[test]
	fn time_interpolates_between_neighbors() {
		let t = synthetic_time(
			12,
			Some(Neighbor { slot: 10, time: 1000 }),
			None,
			0,
		);
		assert_eq!(t, 1001); // 1000 + ceil(2 * 0.4) = 1000 + 1
	}

	#[test]
	fn time_extrapolates_from_upper_neighbor_when_no_lower() {
		let t = synthetic_time(8, None, Some(Neighbor { slot: 10, time: 1000 }), 0);
		assert_eq!(t, 999); // 1000 - ceil(2 * 0.4)
	}

	#[test]
	fn time_falls_back_to_genesis_when_no_neighbors() {
		let t = synthetic_time(5, None, None, 1_600_000_000);
		assert_eq!(t, 1_600_000_000 + 2); // ceil(5 * 0.4) = 2
	}
}
