//! The foreign-ledger collaborator this gateway treats as external (§1):
//! account state, call/estimateGas execution, and log filtering all live
//! upstream. This module is the thin seam that talks to it, plus the
//! in-process caches (`CachedNonceSource`) the mempool's cooperative
//! scheduler needs so its hot path never blocks on network I/O (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethereum_types::{H160, U256};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use parking_lot::RwLock;
use sg_mempool::{ChainNonceSource, ExecutionReceipt, ExecutorBackend, ExecutorRequest, TxValidator};
use sg_primitives::{GatewayError, MempoolTx};
use sg_rpc::ChainBackend;

/// A thin Ethereum-JSON-RPC-shaped pass-through to the foreign ledger. Real
/// Solana-like wire translation is out of scope (§1); this client assumes
/// something upstream already speaks this shape for the handful of reads
/// this gateway can't answer from its own state.
pub struct ForeignLedgerClient {
	client: HttpClient,
	chain_id: u64,
}

impl ForeignLedgerClient {
	pub fn connect(url: &str, chain_id: u64) -> Result<Self, jsonrpsee::core::ClientError> {
		let client = HttpClientBuilder::default().build(url)?;
		Ok(Self { client, chain_id })
	}

	async fn call_hex(&self, method: &str, params: jsonrpsee::core::params::ArrayParams) -> U256 {
		self.client
			.request::<String, _>(method, params)
			.await
			.ok()
			.and_then(|s| U256::from_str_radix(s.trim_start_matches("0x"), 16).ok())
			.unwrap_or_default()
	}
}

#[async_trait::async_trait]
impl ChainBackend for ForeignLedgerClient {
	async fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn latest_slot(&self) -> u64 {
		self.call_hex("eth_blockNumber", rpc_params![]).await.low_u64()
	}

	async fn balance(&self, address: H160) -> U256 {
		self.call_hex("eth_getBalance", rpc_params![format!("{address:#x}"), "latest"]).await
	}

	async fn code(&self, address: H160) -> Vec<u8> {
		self.client
			.request::<String, _>("eth_getCode", rpc_params![format!("{address:#x}"), "latest"])
			.await
			.ok()
			.and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
			.unwrap_or_default()
	}

	async fn call(&self, to: Option<H160>, data: Vec<u8>) -> Result<Vec<u8>, String> {
		let request = serde_json::json!({
			"to": to.map(|a| format!("{a:#x}")),
			"data": format!("0x{}", hex::encode(&data)),
		});
		self.client
			.request::<String, _>("eth_call", rpc_params![request, "latest"])
			.await
			.map_err(|e| e.to_string())
			.and_then(|s| hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string()))
	}

	async fn estimate_gas(&self, to: Option<H160>, data: Vec<u8>) -> U256 {
		let request = serde_json::json!({
			"to": to.map(|a| format!("{a:#x}")),
			"data": format!("0x{}", hex::encode(&data)),
		});
		self.call_hex("eth_estimateGas", rpc_params![request]).await
	}

	async fn logs(&self, _from_slot: u64, _to_slot: u64) -> Vec<serde_json::Value> {
		// Serving historical state of unindexed slots is a non-goal (§1).
		Vec::new()
	}
}

/// Backs `ChainNonceSource` with a cache refreshed by a background task,
/// so the mempool's scheduler (§5: "no mutation ... across a suspension")
/// never makes a network call from its hot path.
pub struct CachedNonceSource {
	nonces: Arc<RwLock<HashMap<H160, u64>>>,
}

impl CachedNonceSource {
	pub fn new() -> Self {
		Self { nonces: Arc::new(RwLock::new(HashMap::new())) }
	}

	/// Spawns the periodic refresh task for the given senders. Senders are
	/// supplied by the caller (the set currently queued in the mempool)
	/// since this client has no way to discover accounts on its own.
	pub fn spawn_refresh(
		&self,
		client: Arc<HttpClient>,
		senders: impl Fn() -> Vec<H160> + Send + 'static,
		interval: Duration,
	) {
		let nonces = self.nonces.clone();
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			loop {
				ticker.tick().await;
				for sender in senders() {
					let params = rpc_params![format!("{sender:#x}"), "latest"];
					if let Ok(hex_nonce) = client.request::<String, _>("eth_getTransactionCount", params).await {
						if let Ok(nonce) = u64::from_str_radix(hex_nonce.trim_start_matches("0x"), 16) {
							nonces.write().insert(sender, nonce);
						}
					}
				}
			}
		});
	}
}

impl Default for CachedNonceSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ChainNonceSource for CachedNonceSource {
	fn on_chain_nonce(&self, sender: H160) -> u64 {
		self.nonces.read().get(&sender).copied().unwrap_or(0)
	}
}

/// Drives the per-transaction back-end work an `ExecutorPool` worker
/// performs (§4.4): handing the raw transaction to the foreign ledger. The
/// ledger's own program/execution semantics are out of scope (§1) — this
/// is only the submission seam.
pub struct ForeignExecutorBackend {
	client: HttpClient,
}

impl ForeignExecutorBackend {
	pub fn new(client: HttpClient) -> Self {
		Self { client }
	}
}

#[async_trait::async_trait]
impl ExecutorBackend for ForeignExecutorBackend {
	async fn execute(&self, req: ExecutorRequest) -> Result<ExecutionReceipt, GatewayError> {
		let hex_raw = format!("0x{}", hex::encode(&req.raw));
		self.client
			.request::<String, _>("eth_sendRawTransaction", rpc_params![hex_raw])
			.await
			.map(|_| ExecutionReceipt { signature: req.signature })
			.map_err(|e| GatewayError::Backend {
				code: -32000,
				message: e.to_string(),
				data: serde_json::Value::Null,
			})
	}
}

/// Re-verifies a transaction's signature by re-running the same recovery
/// the RPC ingress path already performed, so inbound replicated bundles
/// (which skip the RPC layer) get the same admission guarantee (§4.5 step c).
pub struct RawSignatureValidator;

impl TxValidator for RawSignatureValidator {
	fn is_valid(&self, tx: &MempoolTx) -> bool {
		match sg_rpc::codec::decode_raw_transaction(&tx.raw) {
			Ok(decoded) => decoded.sender == tx.sender && decoded.signature == tx.signature,
			Err(_) => false,
		}
	}
}
