//! `Peer` implementation backing `ReplicateRequests` (§4.6): pushes a
//! locally-accepted bundle to another gateway's maintenance socket as a
//! `ReplicateTxsBunch` command, grouping by sender since the wire command
//! carries a single `sender_addr`.

use std::collections::HashMap;

use ethereum_types::H160;
use sg_primitives::MempoolTx;
use sg_rpc::wire::{write_frame, MaintenanceRequest};
use tokio::net::TcpStream;

pub struct SocketPeer {
	addr: String,
}

impl SocketPeer {
	pub fn new(addr: String) -> Self {
		Self { addr }
	}
}

#[async_trait::async_trait]
impl sg_mempool::Peer for SocketPeer {
	async fn send(&self, txs: Vec<MempoolTx>) {
		let mut by_sender: HashMap<H160, Vec<MempoolTx>> = HashMap::new();
		for tx in txs {
			by_sender.entry(tx.sender).or_default().push(tx);
		}
		for (sender_addr, txs) in by_sender {
			let Ok(mut stream) = TcpStream::connect(&self.addr).await else {
				log::warn!(target: "slotgate", "replication peer {} unreachable", self.addr);
				continue;
			};
			let request = MaintenanceRequest::ReplicateTxsBunch { sender_addr, txs };
			if let Err(e) = write_frame(&mut stream, &request).await {
				log::warn!(target: "slotgate", "failed to replicate to {}: {e}", self.addr);
			}
		}
	}
}
