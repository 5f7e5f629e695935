//! `net_*` methods (§6), grounded on `NetApi`
//! (examples/polkadot-evm-frontier/client/rpc/src/net.rs): a thin,
//! near-constant surface.

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;

#[rpc(server, namespace = "net")]
pub trait NetApi {
	#[method(name = "version")]
	async fn version(&self) -> RpcResult<String>;

	#[method(name = "listening")]
	async fn is_listening(&self) -> RpcResult<bool>;

	#[method(name = "peerCount")]
	async fn peer_count(&self) -> RpcResult<String>;
}

pub struct NetApiImpl {
	chain_id: u64,
}

impl NetApiImpl {
	pub fn new(chain_id: u64) -> Self {
		Self { chain_id }
	}
}

#[async_trait]
impl NetApiServer for NetApiImpl {
	async fn version(&self) -> RpcResult<String> {
		Ok(self.chain_id.to_string())
	}

	async fn is_listening(&self) -> RpcResult<bool> {
		Ok(true)
	}

	/// This gateway has no peer-to-peer network of its own; the mempool's
	/// `Replicator` peers are a gateway-level concept, not a network layer
	/// one, so this always reports zero.
	async fn peer_count(&self) -> RpcResult<String> {
		Ok("0x0".to_string())
	}
}
