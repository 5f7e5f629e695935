//! Maps `GatewayError` to JSON-RPC error envelopes (§7).
//!
//! Grounded on `internal_err`/`error_on_execution_failure`
//! (examples/polkadot-evm-frontier/client/rpc/src/lib.rs), adapted from
//! `jsonrpc_core::Error` to `jsonrpsee`'s `ErrorObjectOwned` per the
//! workspace's modern RPC stack.

use jsonrpsee::types::ErrorObjectOwned;
use sg_primitives::GatewayError;

const VALIDATION_CODE: i32 = -32602;
const GENERIC_CODE: i32 = -32000;

/// Handler exceptions map per §7: a domain error preserves its `{code,
/// message, data}`; a back-end error surfaces its structured payload;
/// anything else becomes `-32000`.
pub fn to_error_object(err: GatewayError) -> ErrorObjectOwned {
	match err {
		GatewayError::Validation(message) => ErrorObjectOwned::owned(VALIDATION_CODE, message, None::<()>),
		GatewayError::Domain { code, message, logs } => {
			let data = if logs.is_empty() {
				None
			} else {
				Some(serde_json::json!({ "logs": logs }))
			};
			ErrorObjectOwned::owned(code as i32, message, data)
		}
		GatewayError::Backend { code, message, data } => {
			ErrorObjectOwned::owned(code as i32, message, Some(data))
		}
		// Transient errors collapse to a generic message to avoid leaking
		// internal traces (§7).
		GatewayError::Transient(_) => {
			ErrorObjectOwned::owned(GENERIC_CODE, "Request failed", None::<()>)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transient_errors_never_leak_their_message() {
		let object = to_error_object(GatewayError::Transient("db connection reset".into()));
		assert_eq!(object.message(), "Request failed");
	}

	#[test]
	fn domain_errors_preserve_code_and_logs() {
		let object = to_error_object(GatewayError::nonce_too_low(5, 2));
		assert_eq!(object.code(), -32002);
		assert!(object.data().is_some());
	}
}
