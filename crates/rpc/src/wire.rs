//! Length-prefixed binary framing for the mempool's service/maintenance
//! sockets (§6, REDESIGN FLAGS in spec.md §9).
//!
//! The source framed pickled Python objects over these sockets; this
//! workspace replaces pickle with a versioned `bincode` envelope behind a
//! 4-byte big-endian length prefix, in the spirit of how `fc-db`'s sql
//! backend (examples/polkadot-evm-frontier/client/db/src/sql/mod.rs) keeps
//! wire concerns in a small dedicated module rather than inline in the
//! service loop.

use ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};
use sg_primitives::MempoolTx;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const WIRE_VERSION: u8 = 1;
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN}-byte limit")]
	FrameTooLarge(u32),
	#[error("unsupported wire version {0}")]
	UnsupportedVersion(u8),
	#[error("encoding error: {0}")]
	Encoding(#[from] bincode::Error),
}

/// Service-socket request variants (§6, default bind `0.0.0.0:9091`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceRequest {
	SendTransaction { req_id: u64, tx: MempoolTx },
	GetLastTxNonce { req_id: u64, sender: H160 },
	GetTxByHash { req_id: u64, hash: H256 },
	GetGasPrice { req_id: u64 },
}

impl ServiceRequest {
	pub fn req_id(&self) -> u64 {
		match self {
			ServiceRequest::SendTransaction { req_id, .. }
			| ServiceRequest::GetLastTxNonce { req_id, .. }
			| ServiceRequest::GetTxByHash { req_id, .. }
			| ServiceRequest::GetGasPrice { req_id } => *req_id,
		}
	}
}

/// Maintenance-socket commands (§6, default bind `0.0.0.0:9092`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MaintenanceRequest {
	SuspendMemPool,
	ResumeMemPool,
	ReplicateRequests { peers: Vec<String> },
	ReplicateTxsBunch { sender_addr: H160, txs: Vec<MempoolTx> },
}

/// Service-socket reply variants, paired back to their request by `req_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceResponse {
	Accepted,
	Rejected { code: i64, message: String },
	Nonce(u64),
	Tx(Option<MempoolTx>),
	GasPrice { minimum: u64, suggested: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReply {
	pub req_id: u64,
	pub response: ServiceResponse,
}

/// A short status wrapper, matching the source's `Result("...")` convention
/// for maintenance responses (§6, §7 `Transient`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
	pub ok: bool,
	pub message: String,
}

impl StatusResult {
	pub fn ok() -> Self {
		Self { ok: true, message: "ok".to_string() }
	}

	pub fn failed(message: impl Into<String>) -> Self {
		Self { ok: false, message: message.into() }
	}
}

/// Writes `payload` as a versioned, length-prefixed frame:
/// `[version: u8][len: u32 BE][bincode(payload)]`.
pub async fn write_frame<W, T>(writer: &mut W, payload: &T) -> Result<(), WireError>
where
	W: tokio::io::AsyncWrite + Unpin,
	T: Serialize,
{
	let body = bincode::serialize(payload)?;
	let len = u32::try_from(body.len()).map_err(|_| WireError::FrameTooLarge(u32::MAX))?;
	if len > MAX_FRAME_LEN {
		return Err(WireError::FrameTooLarge(len));
	}
	writer.write_u8(WIRE_VERSION).await?;
	writer.write_u32(len).await?;
	writer.write_all(&body).await?;
	Ok(())
}

/// Reads one frame written by `write_frame`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, WireError>
where
	R: tokio::io::AsyncRead + Unpin,
	T: for<'de> Deserialize<'de>,
{
	let version = reader.read_u8().await?;
	if version != WIRE_VERSION {
		return Err(WireError::UnsupportedVersion(version));
	}
	let len = reader.read_u32().await?;
	if len > MAX_FRAME_LEN {
		return Err(WireError::FrameTooLarge(len));
	}
	let mut body = vec![0u8; len as usize];
	reader.read_exact(&mut body).await?;
	Ok(bincode::deserialize(&body)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trips_a_service_request_through_an_in_memory_duplex() {
		let (mut client, mut server) = tokio::io::duplex(4096);
		let request = ServiceRequest::GetGasPrice { req_id: 42 };
		write_frame(&mut client, &request).await.unwrap();
		let decoded: ServiceRequest = read_frame(&mut server).await.unwrap();
		assert_eq!(decoded.req_id(), 42);
	}

	#[tokio::test]
	async fn round_trips_a_service_reply() {
		let (mut client, mut server) = tokio::io::duplex(4096);
		let reply = ServiceReply {
			req_id: 7,
			response: ServiceResponse::GasPrice { minimum: 1, suggested: 3 },
		};
		write_frame(&mut client, &reply).await.unwrap();
		let decoded: ServiceReply = read_frame(&mut server).await.unwrap();
		assert_eq!(decoded.req_id, 7);
		assert!(matches!(decoded.response, ServiceResponse::GasPrice { suggested: 3, .. }));
	}

	#[tokio::test]
	async fn rejects_an_unsupported_wire_version() {
		let (mut client, mut server) = tokio::io::duplex(64);
		client.write_u8(99).await.unwrap();
		client.write_u32(0).await.unwrap();
		let result: Result<ServiceRequest, WireError> = read_frame(&mut server).await;
		assert!(matches!(result, Err(WireError::UnsupportedVersion(99))));
	}
}
