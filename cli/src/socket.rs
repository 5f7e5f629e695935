//! The service (§6, `0.0.0.0:9091`) and maintenance (`0.0.0.0:9092`) socket
//! loops: one accepted connection per task, each looping `read_frame` until
//! the peer disconnects. Grounded on `MPService`'s command dispatch in
//! examples/original_source/proxy/mempool/mempool_service.py, re-framed as
//! typed request/response enums instead of pickled dicts (§9).

use std::collections::HashSet;
use std::sync::Arc;

use ethereum_types::H160;
use parking_lot::RwLock;
use sg_mempool::Mempool;
use sg_primitives::{RejectReason, SubmitOutcome};
use sg_rpc::wire::{
	read_frame, write_frame, MaintenanceRequest, ServiceReply, ServiceRequest, ServiceResponse,
	StatusResult,
};
use tokio::net::{TcpListener, TcpStream};

use crate::backend::ForeignExecutorBackend;
use crate::peer::SocketPeer;

fn outcome_to_response(outcome: SubmitOutcome) -> ServiceResponse {
	match outcome {
		SubmitOutcome::Accepted => ServiceResponse::Accepted,
		SubmitOutcome::DuplicateKnown => ServiceResponse::Rejected {
			code: -32003,
			message: "duplicate transaction".to_string(),
		},
		SubmitOutcome::NonceTooLow { on_chain_nonce } => ServiceResponse::Rejected {
			code: -32002,
			message: format!("nonce too low: on-chain nonce is {on_chain_nonce}"),
		},
		SubmitOutcome::NonceGap { pending_nonce } => ServiceResponse::Rejected {
			code: -32004,
			message: format!("nonce gap: pending nonce is {pending_nonce}"),
		},
		SubmitOutcome::UnderpricedReplacement { required } => ServiceResponse::Rejected {
			code: -32002,
			message: format!("replacement underpriced: required gas price >= {required}"),
		},
		SubmitOutcome::Rejected(RejectReason::Underpriced) => ServiceResponse::Rejected {
			code: -32602,
			message: "gas price is below the minimum".to_string(),
		},
		SubmitOutcome::Rejected(RejectReason::BadSignature) => ServiceResponse::Rejected {
			code: -32602,
			message: "invalid transaction signature".to_string(),
		},
	}
}

pub async fn run_service_socket(
	addr: String,
	mempool: Arc<Mempool<ForeignExecutorBackend>>,
	tracked_senders: Arc<RwLock<HashSet<H160>>>,
) {
	let listener = match TcpListener::bind(&addr).await {
		Ok(l) => l,
		Err(e) => {
			log::error!(target: "slotgate", "failed to bind service socket {addr}: {e}");
			return;
		}
	};
	log::info!(target: "slotgate", "service socket listening on {addr}");
	loop {
		let (stream, _) = match listener.accept().await {
			Ok(x) => x,
			Err(e) => {
				log::warn!(target: "slotgate", "service socket accept failed: {e}");
				continue;
			}
		};
		let mempool = mempool.clone();
		let tracked_senders = tracked_senders.clone();
		tokio::spawn(async move {
			handle_service_conn(stream, mempool, tracked_senders).await;
		});
	}
}

async fn handle_service_conn(
	mut stream: TcpStream,
	mempool: Arc<Mempool<ForeignExecutorBackend>>,
	tracked_senders: Arc<RwLock<HashSet<H160>>>,
) {
	loop {
		let request: ServiceRequest = match read_frame(&mut stream).await {
			Ok(r) => r,
			Err(_) => return,
		};
		let req_id = request.req_id();
		let response = match request {
			ServiceRequest::SendTransaction { tx, .. } => {
				tracked_senders.write().insert(tx.sender);
				outcome_to_response(mempool.submit(tx))
			}
			ServiceRequest::GetLastTxNonce { sender, .. } => {
				ServiceResponse::Nonce(mempool.get_pending_nonce(sender))
			}
			ServiceRequest::GetTxByHash { hash, .. } => {
				ServiceResponse::Tx(mempool.get_pending_tx_by_hash(hash))
			}
			ServiceRequest::GetGasPrice { .. } => {
				let snapshot = mempool.get_gas_price();
				ServiceResponse::GasPrice {
					minimum: snapshot.minimum,
					suggested: snapshot.suggested,
				}
			}
		};
		if write_frame(&mut stream, &ServiceReply { req_id, response }).await.is_err() {
			return;
		}
	}
}

pub async fn run_maintenance_socket(
	addr: String,
	mempool: Arc<Mempool<ForeignExecutorBackend>>,
	replicator: Arc<sg_mempool::Replicator>,
) {
	let listener = match TcpListener::bind(&addr).await {
		Ok(l) => l,
		Err(e) => {
			log::error!(target: "slotgate", "failed to bind maintenance socket {addr}: {e}");
			return;
		}
	};
	log::info!(target: "slotgate", "maintenance socket listening on {addr}");
	loop {
		let (stream, _) = match listener.accept().await {
			Ok(x) => x,
			Err(e) => {
				log::warn!(target: "slotgate", "maintenance socket accept failed: {e}");
				continue;
			}
		};
		let mempool = mempool.clone();
		let replicator = replicator.clone();
		tokio::spawn(async move {
			handle_maintenance_conn(stream, mempool, replicator).await;
		});
	}
}

async fn handle_maintenance_conn(
	mut stream: TcpStream,
	mempool: Arc<Mempool<ForeignExecutorBackend>>,
	replicator: Arc<sg_mempool::Replicator>,
) {
	loop {
		let request: MaintenanceRequest = match read_frame(&mut stream).await {
			Ok(r) => r,
			Err(_) => return,
		};
		let response = match request {
			MaintenanceRequest::SuspendMemPool => {
				mempool.suspend();
				StatusResult::ok()
			}
			MaintenanceRequest::ResumeMemPool => {
				mempool.resume();
				StatusResult::ok()
			}
			MaintenanceRequest::ReplicateRequests { peers } => {
				let peers: Vec<Arc<dyn sg_mempool::Peer>> = peers
					.into_iter()
					.map(|addr| Arc::new(SocketPeer::new(addr)) as Arc<dyn sg_mempool::Peer>)
					.collect();
				replicator.replicate(peers);
				StatusResult::ok()
			}
			MaintenanceRequest::ReplicateTxsBunch { txs, .. } => {
				replicator.on_bundle(&mempool, txs);
				StatusResult::ok()
			}
		};
		if write_frame(&mut stream, &response).await.is_err() {
			return;
		}
	}
}
