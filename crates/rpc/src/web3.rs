//! `web3_*` methods (§6), grounded on `Web3Api`
//! (examples/polkadot-evm-frontier/client/rpc/src/web3.rs).

use ethereum_types::H256;
use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use sha3::{Digest, Keccak256};

#[rpc(server, namespace = "web3")]
pub trait Web3Api {
	#[method(name = "clientVersion")]
	async fn client_version(&self) -> RpcResult<String>;

	#[method(name = "sha3")]
	async fn sha3(&self, data: String) -> RpcResult<H256>;
}

pub struct Web3ApiImpl;

#[async_trait]
impl Web3ApiServer for Web3ApiImpl {
	async fn client_version(&self) -> RpcResult<String> {
		Ok(format!("slotgate/v{}", env!("CARGO_PKG_VERSION")))
	}

	async fn sha3(&self, data: String) -> RpcResult<H256> {
		let trimmed = data.strip_prefix("0x").unwrap_or(&data);
		let bytes = hex::decode(trimmed).unwrap_or_default();
		Ok(H256::from_slice(Keccak256::digest(&bytes).as_slice()))
	}
}
