use serde_json::Value;
use thiserror::Error;

/// The error taxonomy of §7, realized as a type instead of bare strings.
///
/// `Domain` and `Backend` preserve structured payloads all the way to the
/// RPC boundary; `Transient` is collapsed to a generic message before it
/// reaches a caller (§7, "to avoid leaking internal traces").
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
	#[error("{0}")]
	Validation(String),

	#[error("{message}")]
	Domain {
		code: i64,
		message: String,
		logs: Vec<String>,
	},

	#[error("{message}")]
	Backend {
		code: i64,
		message: String,
		data: Value,
	},

	#[error("Request failed")]
	Transient(String),
}

impl GatewayError {
	pub fn nonce_too_low(on_chain_nonce: u64, got: u64) -> Self {
		GatewayError::Domain {
			code: -32002,
			message: "nonce too low".to_string(),
			logs: vec![format!(
				"on-chain nonce is {on_chain_nonce}, got {got}"
			)],
		}
	}

	pub fn underpriced() -> Self {
		GatewayError::Domain {
			code: -32002,
			message: "gas price is below the minimum".to_string(),
			logs: vec![],
		}
	}

	pub fn bad_signature() -> Self {
		GatewayError::Validation("invalid transaction signature".to_string())
	}

	pub fn underpriced_replacement(required: ethereum_types::U256) -> Self {
		GatewayError::Domain {
			code: -32002,
			message: "replacement transaction underpriced".to_string(),
			logs: vec![format!("required gas price >= {required}")],
		}
	}
}
