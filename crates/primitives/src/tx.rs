use std::time::{Duration, Instant};

use ethereum_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

/// Time budget an in-flight executor call gets before the scheduler treats
/// it as hung (§5, "Executor timeouts abort the in-flight job").
pub const DEFAULT_TX_DEADLINE: Duration = Duration::from_secs(30);

fn default_deadline() -> Instant {
	Instant::now() + DEFAULT_TX_DEADLINE
}

/// A transaction admitted to the mempool. Identity is `signature`; secondary
/// key is `(sender, nonce)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolTx {
	pub signature: H256,
	pub sender: H160,
	pub nonce: u64,
	pub gas_price: U256,
	pub raw: Vec<u8>,
	/// Wall-clock deadline for this tx's current executor attempt. Not
	/// meaningful across a wire hop (it's a local `Instant`), so it's
	/// excluded from the wire encoding and refreshed on arrival — a
	/// replicated tx gets its own deadline when resubmitted on this node.
	#[serde(skip, default = "default_deadline")]
	pub deadline: Instant,
}

impl MempoolTx {
	pub fn new(signature: H256, sender: H160, nonce: u64, gas_price: U256, raw: Vec<u8>) -> Self {
		Self {
			signature,
			sender,
			nonce,
			gas_price,
			raw,
			deadline: default_deadline(),
		}
	}

	/// Resets this tx's deadline to a fresh full timeout, for the next
	/// executor attempt (e.g. after a transient failure is retried).
	pub fn refresh_deadline(&mut self) {
		self.deadline = default_deadline();
	}

	/// The minimum gas price a colliding `(sender, nonce)` replacement must
	/// meet or exceed — a 10% bump over this transaction's price, rounded up
	/// (§8 property 7, the replacement rule).
	pub fn min_replacement_gas_price(&self) -> U256 {
		// ceil(1.10 * gp) == ceil((11 * gp) / 10)
		let scaled = self.gas_price.saturating_mul(U256::from(11));
		let (quotient, remainder) = scaled.div_mod(U256::from(10));
		if remainder.is_zero() {
			quotient
		} else {
			quotient.saturating_add(U256::one())
		}
	}
}

/// Outcome of `Mempool::submit` (§4.5). A tagged enum, not an exception, per
/// the REDESIGN FLAGS in spec.md §9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	Accepted,
	DuplicateKnown,
	NonceTooLow { on_chain_nonce: u64 },
	NonceGap { pending_nonce: u64 },
	UnderpricedReplacement { required: U256 },
	Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
	Underpriced,
	BadSignature,
}

/// A snapshot of the current gas price floor/suggestion, TTL-refreshed from
/// an external price source (§3, `GasPriceSnapshot`).
#[derive(Debug, Clone, Copy)]
pub struct GasPriceSnapshot {
	pub minimum: u64,
	pub suggested: u64,
	pub refreshed_at: Instant,
}
