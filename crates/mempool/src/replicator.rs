//! Push accepted transactions to peer gateways; absorb inbound bundles
//! (§4.6).
//!
//! Grounded on `MemPoolReplicator` referenced from
//! examples/original_source/proxy/mempool/mempool_service.py
//! (`ReplicateRequests`/`ReplicateTxsBunch` maintenance commands): best-effort
//! fire-and-forget push with per-peer FIFO ordering.

use std::sync::Arc;

use parking_lot::Mutex;
use sg_primitives::MempoolTx;
use tokio::sync::mpsc;

/// A peer gateway `replicate` pushes accepted bundles to.
#[async_trait::async_trait]
pub trait Peer: Send + Sync {
	async fn send(&self, txs: Vec<MempoolTx>);
}

struct PeerQueue {
	tx: mpsc::UnboundedSender<MempoolTx>,
}

fn spawn_peer_worker(peer: Arc<dyn Peer>) -> PeerQueue {
	let (tx, mut rx) = mpsc::unbounded_channel::<MempoolTx>();
	tokio::spawn(async move {
		// Coalesce whatever has queued up into one push, preserving FIFO
		// per-peer ordering.
		while let Some(first) = rx.recv().await {
			let mut batch = vec![first];
			while let Ok(next) = rx.try_recv() {
				batch.push(next);
			}
			peer.send(batch).await;
		}
	});
	PeerQueue { tx }
}

/// Best-effort broadcast of locally-accepted transactions to a registered
/// peer set (§4.6).
pub struct Replicator {
	peers: Mutex<Vec<PeerQueue>>,
}

impl Replicator {
	pub fn new() -> Self {
		Self {
			peers: Mutex::new(Vec::new()),
		}
	}

	/// `replicate(peers[])` (§4.6): registers the peer set, replacing any
	/// previous registration.
	pub fn replicate(&self, peers: Vec<Arc<dyn Peer>>) {
		let queues = peers.into_iter().map(spawn_peer_worker).collect();
		*self.peers.lock() = queues;
	}

	/// Fire-and-forget push of a locally-accepted tx to every registered peer.
	pub async fn broadcast(&self, tx: MempoolTx) {
		let peers = self.peers.lock();
		for peer in peers.iter() {
			let _ = peer.tx.send(tx.clone());
		}
	}

	/// `on_bundle(sender_addr, txs[])` (§4.6): feeds each tx into
	/// `Mempool::submit` as if locally submitted. Duplicates are absorbed
	/// silently by the mempool's own cache check, so outcomes are discarded.
	pub fn on_bundle<B: crate::executor::ExecutorBackend + 'static>(
		&self,
		mempool: &Arc<crate::mempool::Mempool<B>>,
		txs: Vec<MempoolTx>,
	) {
		for tx in txs {
			let _ = mempool.submit(tx);
		}
	}
}

impl Default for Replicator {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ethereum_types::{H160, H256, U256};
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingPeer(Arc<AtomicUsize>);
	#[async_trait::async_trait]
	impl Peer for CountingPeer {
		async fn send(&self, txs: Vec<MempoolTx>) {
			self.0.fetch_add(txs.len(), Ordering::SeqCst);
		}
	}

	#[tokio::test]
	async fn broadcast_reaches_every_registered_peer() {
		let replicator = Replicator::new();
		let counter_a = Arc::new(AtomicUsize::new(0));
		let counter_b = Arc::new(AtomicUsize::new(0));
		replicator.replicate(vec![
			Arc::new(CountingPeer(counter_a.clone())),
			Arc::new(CountingPeer(counter_b.clone())),
		]);

		replicator
			.broadcast(MempoolTx::new(H256::repeat_byte(1), H160::zero(), 0, U256::zero(), vec![]))
			.await;
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;

		assert_eq!(counter_a.load(Ordering::SeqCst), 1);
		assert_eq!(counter_b.load(Ordering::SeqCst), 1);
	}
}
