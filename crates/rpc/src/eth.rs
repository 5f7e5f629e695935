//! `eth_*` method surface (§6), via `jsonrpsee`'s `#[rpc]` macro — the
//! modern successor to the `jsonrpc-core`-derived trait Frontier exposes in
//! `client/rpc-core/src/eth.rs`; this workspace's own root `Cargo.toml`
//! already declares `jsonrpsee` as the RPC stack, so the dispatcher is built
//! on it directly instead of re-deriving the legacy macro.

use std::sync::Arc;

use ethereum_types::{H160, H256, U256};
use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use sg_db::BlockStore;
use sg_mempool::{ExecutorBackend, Mempool};
use sg_primitives::SubmitOutcome;

use crate::block::BlockView;
use crate::codec::decode_raw_transaction;
use crate::error::to_error_object;

/// Collaborators this gateway treats as external per §1: account balances,
/// contract code, `eth_call`/`eth_estimateGas` execution, and log filtering
/// all live on the foreign ledger side, not in this crate.
#[async_trait]
pub trait ChainBackend: Send + Sync {
	async fn chain_id(&self) -> u64;
	async fn latest_slot(&self) -> u64;
	async fn balance(&self, address: H160) -> U256;
	async fn code(&self, address: H160) -> Vec<u8>;
	async fn call(&self, to: Option<H160>, data: Vec<u8>) -> Result<Vec<u8>, String>;
	async fn estimate_gas(&self, to: Option<H160>, data: Vec<u8>) -> U256;
	async fn logs(&self, from_slot: u64, to_slot: u64) -> Vec<serde_json::Value>;
}

#[rpc(server, namespace = "eth")]
pub trait EthApi {
	#[method(name = "chainId")]
	async fn chain_id(&self) -> RpcResult<String>;

	#[method(name = "blockNumber")]
	async fn block_number(&self) -> RpcResult<String>;

	#[method(name = "gasPrice")]
	async fn gas_price(&self) -> RpcResult<String>;

	#[method(name = "getBalance")]
	async fn get_balance(&self, address: H160, block: Option<String>) -> RpcResult<String>;

	#[method(name = "getTransactionCount")]
	async fn get_transaction_count(&self, address: H160, block: Option<String>) -> RpcResult<String>;

	#[method(name = "getCode")]
	async fn get_code(&self, address: H160, block: Option<String>) -> RpcResult<String>;

	#[method(name = "getBlockByHash")]
	async fn get_block_by_hash(&self, hash: H256, full: bool) -> RpcResult<Option<BlockView>>;

	#[method(name = "getBlockByNumber")]
	async fn get_block_by_number(&self, number: String, full: bool) -> RpcResult<Option<BlockView>>;

	#[method(name = "getTransactionByHash")]
	async fn get_transaction_by_hash(&self, hash: H256) -> RpcResult<Option<serde_json::Value>>;

	#[method(name = "getTransactionReceipt")]
	async fn get_transaction_receipt(&self, hash: H256) -> RpcResult<Option<serde_json::Value>>;

	#[method(name = "sendRawTransaction")]
	async fn send_raw_transaction(&self, data: String) -> RpcResult<H256>;

	#[method(name = "sendTransaction")]
	async fn send_transaction(&self, request: serde_json::Value) -> RpcResult<H256>;

	#[method(name = "call")]
	async fn call(&self, request: serde_json::Value) -> RpcResult<String>;

	#[method(name = "estimateGas")]
	async fn estimate_gas(&self, request: serde_json::Value) -> RpcResult<String>;

	#[method(name = "getLogs")]
	async fn get_logs(&self, filter: serde_json::Value) -> RpcResult<Vec<serde_json::Value>>;
}

pub struct EthApiImpl<B: ExecutorBackend + 'static> {
	store: Arc<BlockStore>,
	mempool: Arc<Mempool<B>>,
	chain: Arc<dyn ChainBackend>,
}

impl<B: ExecutorBackend + 'static> EthApiImpl<B> {
	pub fn new(store: Arc<BlockStore>, mempool: Arc<Mempool<B>>, chain: Arc<dyn ChainBackend>) -> Self {
		Self { store, mempool, chain }
	}

	async fn resolve_block_number(&self, tag_or_number: &str) -> Result<u64, ErrorObjectOwned> {
		match tag_or_number {
			"latest" | "pending" => Ok(self.chain.latest_slot().await),
			"earliest" => Ok(0),
			other => {
				let trimmed = other.strip_prefix("0x").unwrap_or(other);
				u64::from_str_radix(trimmed, 16)
					.map_err(|_| to_error_object(sg_primitives::GatewayError::Validation(format!("invalid block tag: {other}"))))
			}
		}
	}
}

fn hex_u64(value: u64) -> String {
	format!("0x{value:x}")
}

fn hex_u256(value: U256) -> String {
	format!("0x{value:x}")
}

#[async_trait]
impl<B: ExecutorBackend + 'static> EthApiServer for EthApiImpl<B> {
	async fn chain_id(&self) -> RpcResult<String> {
		Ok(hex_u64(self.chain.chain_id().await))
	}

	async fn block_number(&self) -> RpcResult<String> {
		Ok(hex_u64(self.chain.latest_slot().await))
	}

	async fn gas_price(&self) -> RpcResult<String> {
		Ok(hex_u64(self.mempool.get_gas_price().suggested))
	}

	async fn get_balance(&self, address: H160, _block: Option<String>) -> RpcResult<String> {
		Ok(hex_u256(self.chain.balance(address).await))
	}

	async fn get_transaction_count(&self, address: H160, block: Option<String>) -> RpcResult<String> {
		match block.as_deref() {
			Some("pending") | None => Ok(hex_u64(self.mempool.get_pending_nonce(address))),
			Some(_) => Ok(hex_u64(self.mempool.get_pending_nonce(address))),
		}
	}

	/// §9 open question: the source hardcodes `0x01`; here an EOA (no
	/// deployed bytecode on the foreign ledger) correctly returns `0x`.
	async fn get_code(&self, address: H160, _block: Option<String>) -> RpcResult<String> {
		let code = self.chain.code(address).await;
		Ok(format!("0x{}", hex::encode(code)))
	}

	async fn get_block_by_hash(&self, hash: H256, _full: bool) -> RpcResult<Option<BlockView>> {
		let latest = self.chain.latest_slot().await;
		let info = self
			.store
			.get_by_hash(hash, latest)
			.await
			.map_err(|e| to_error_object(sg_primitives::GatewayError::Backend {
				code: -32000,
				message: e.to_string(),
				data: serde_json::Value::Null,
			}))?;
		if info.hash.is_none() {
			return Ok(None);
		}
		Ok(Some(BlockView::from_block_info(&info, vec![])))
	}

	async fn get_block_by_number(&self, number: String, _full: bool) -> RpcResult<Option<BlockView>> {
		let slot = self.resolve_block_number(&number).await?;
		let latest = self.chain.latest_slot().await;
		let info = self.store.get_by_slot(slot, latest).await.map_err(|e| {
			to_error_object(sg_primitives::GatewayError::Backend {
				code: -32000,
				message: e.to_string(),
				data: serde_json::Value::Null,
			})
		})?;
		if info.hash.is_none() {
			return Ok(None);
		}
		Ok(Some(BlockView::from_block_info(&info, vec![])))
	}

	async fn get_transaction_by_hash(&self, hash: H256) -> RpcResult<Option<serde_json::Value>> {
		Ok(self
			.mempool
			.get_pending_tx_by_hash(hash)
			.map(|tx| serde_json::json!({
				"hash": format!("{:#x}", tx.signature),
				"nonce": hex_u64(tx.nonce),
				"from": format!("{:#x}", tx.sender),
				"gasPrice": hex_u256(tx.gas_price),
			})))
	}

	async fn get_transaction_receipt(&self, _hash: H256) -> RpcResult<Option<serde_json::Value>> {
		// Receipts require indexed execution outcomes from the foreign
		// ledger, which is out of scope (§1); a queued/pending tx never has
		// one yet.
		Ok(None)
	}

	async fn send_raw_transaction(&self, data: String) -> RpcResult<H256> {
		let trimmed = data.strip_prefix("0x").unwrap_or(&data);
		let bytes = hex::decode(trimmed)
			.map_err(|_| to_error_object(sg_primitives::GatewayError::Validation("invalid hex".to_string())))?;
		let tx = decode_raw_transaction(&bytes).map_err(to_error_object)?;
		let signature = tx.signature;
		match self.mempool.submit(tx) {
			SubmitOutcome::Accepted => Ok(signature),
			SubmitOutcome::DuplicateKnown => Ok(signature),
			SubmitOutcome::NonceTooLow { on_chain_nonce } => {
				Err(to_error_object(sg_primitives::GatewayError::nonce_too_low(on_chain_nonce, 0)))
			}
			SubmitOutcome::NonceGap { .. } => Ok(signature),
			SubmitOutcome::UnderpricedReplacement { required } => {
				Err(to_error_object(sg_primitives::GatewayError::underpriced_replacement(required)))
			}
			SubmitOutcome::Rejected(sg_primitives::RejectReason::Underpriced) => {
				Err(to_error_object(sg_primitives::GatewayError::underpriced()))
			}
			SubmitOutcome::Rejected(sg_primitives::RejectReason::BadSignature) => {
				Err(to_error_object(sg_primitives::GatewayError::bad_signature()))
			}
		}
	}

	/// §6: `eth_sendTransaction` is explicitly unsupported — this gateway
	/// never holds a signing key.
	async fn send_transaction(&self, _request: serde_json::Value) -> RpcResult<H256> {
		Err(to_error_object(sg_primitives::GatewayError::Validation(
			"eth_sendTransaction is not supported; submit a signed transaction via eth_sendRawTransaction".to_string(),
		)))
	}

	async fn call(&self, request: serde_json::Value) -> RpcResult<String> {
		let to = request.get("to").and_then(|v| v.as_str()).and_then(|s| s.strip_prefix("0x")).and_then(|s| s.parse().ok());
		let data = request
			.get("data")
			.and_then(|v| v.as_str())
			.and_then(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok())
			.unwrap_or_default();
		let result = self
			.chain
			.call(to, data)
			.await
			.map_err(|message| to_error_object(sg_primitives::GatewayError::Backend {
				code: -32000,
				message,
				data: serde_json::Value::Null,
			}))?;
		Ok(format!("0x{}", hex::encode(result)))
	}

	async fn estimate_gas(&self, request: serde_json::Value) -> RpcResult<String> {
		let to = request.get("to").and_then(|v| v.as_str()).and_then(|s| s.strip_prefix("0x")).and_then(|s| s.parse().ok());
		let data = request
			.get("data")
			.and_then(|v| v.as_str())
			.and_then(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok())
			.unwrap_or_default();
		Ok(hex_u256(self.chain.estimate_gas(to, data).await))
	}

	async fn get_logs(&self, filter: serde_json::Value) -> RpcResult<Vec<serde_json::Value>> {
		let from = filter
			.get("fromBlock")
			.and_then(|v| v.as_str())
			.and_then(|s| self.resolve_tag_sync(s))
			.unwrap_or(0);
		let to = filter
			.get("toBlock")
			.and_then(|v| v.as_str())
			.and_then(|s| self.resolve_tag_sync(s))
			.unwrap_or(from);
		Ok(self.chain.logs(from, to).await)
	}
}

impl<B: ExecutorBackend + 'static> EthApiImpl<B> {
	fn resolve_tag_sync(&self, tag: &str) -> Option<u64> {
		let trimmed = tag.strip_prefix("0x")?;
		u64::from_str_radix(trimmed, 16).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_formatting_matches_eth_json_rpc_conventions() {
		assert_eq!(hex_u64(0), "0x0");
		assert_eq!(hex_u64(255), "0xff");
		assert_eq!(hex_u256(U256::from(16)), "0x10");
	}
}
