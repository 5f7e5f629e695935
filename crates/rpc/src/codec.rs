//! Decodes a raw signed Ethereum transaction into a `MempoolTx` (§3, §6
//! `eth_sendRawTransaction`).
//!
//! The foreign ledger's own wire encoding is out of scope (§1); this module
//! only has to speak Ethereum's transaction envelope well enough to admit a
//! transaction into the mempool. RLP framing and the legacy-vs-typed
//! dispatch follow `EthApi::send_raw_transaction`
//! (examples/polkadot-evm-frontier/client/rpc/src/eth/submit.rs); sender
//! recovery is re-derived here with `libsecp256k1` since that crate's
//! Substrate runtime-API path isn't part of this workspace.

use ethereum::{TransactionAction, TransactionV0, TransactionV2};
use ethereum_types::{H160, H256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};
use sg_primitives::{GatewayError, MempoolTx};

fn keccak(bytes: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(bytes).as_slice())
}

fn encode_action(stream: &mut RlpStream, action: &TransactionAction) {
	match action {
		TransactionAction::Call(address) => {
			stream.append(address);
		}
		TransactionAction::Create => {
			stream.append_empty_data();
		}
	}
}

fn legacy_signing_hash(tx: &TransactionV0, chain_id: Option<u64>) -> H256 {
	let mut stream = RlpStream::new();
	stream.begin_list(if chain_id.is_some() { 9 } else { 6 });
	stream.append(&tx.nonce);
	stream.append(&tx.gas_price);
	stream.append(&tx.gas_limit);
	encode_action(&mut stream, &tx.action);
	stream.append(&tx.value);
	stream.append(&tx.input);
	if let Some(id) = chain_id {
		stream.append(&id);
		stream.append(&0u8);
		stream.append(&0u8);
	}
	keccak(&stream.out())
}

fn recover_sender(signing_hash: H256, r: H256, s: H256, recovery_id: u8) -> Result<H160, GatewayError> {
	let mut signature_bytes = [0u8; 64];
	signature_bytes[..32].copy_from_slice(r.as_bytes());
	signature_bytes[32..].copy_from_slice(s.as_bytes());

	let signature = libsecp256k1::Signature::parse_standard(&signature_bytes)
		.map_err(|_| GatewayError::bad_signature())?;
	let recovery_id =
		libsecp256k1::RecoveryId::parse(recovery_id).map_err(|_| GatewayError::bad_signature())?;
	let message = libsecp256k1::Message::parse_slice(signing_hash.as_bytes())
		.map_err(|_| GatewayError::bad_signature())?;
	let public_key = libsecp256k1::recover(&message, &signature, &recovery_id)
		.map_err(|_| GatewayError::bad_signature())?;

	let uncompressed = public_key.serialize();
	let address_hash = keccak(&uncompressed[1..65]);
	Ok(H160::from_slice(&address_hash.as_bytes()[12..]))
}

/// Splits a legacy `v` value into `(recovery_id, chain_id)` per EIP-155.
fn split_legacy_v(v: u64) -> (u8, Option<u64>) {
	if v == 27 || v == 28 {
		((v - 27) as u8, None)
	} else {
		let chain_id = (v - 35) / 2;
		let recovery_id = ((v - 35) % 2) as u8;
		(recovery_id, Some(chain_id))
	}
}

/// Decodes `bytes` and recovers enough of the transaction to admit it into
/// the mempool. Follows the legacy-vs-typed split in `send_raw_transaction`:
/// a first byte `> 0x7f` is an RLP list (legacy); otherwise it's an
/// EIP-2718 typed envelope.
pub fn decode_raw_transaction(bytes: &[u8]) -> Result<MempoolTx, GatewayError> {
	if bytes.is_empty() {
		return Err(GatewayError::Validation("transaction data is empty".to_string()));
	}

	let transaction = if bytes[0] > 0x7f {
		let legacy = rlp::decode::<TransactionV0>(bytes)
			.map_err(|_| GatewayError::Validation("decode transaction failed".to_string()))?;
		TransactionV2::Legacy(legacy)
	} else {
		let re_encoded = rlp::encode(&bytes);
		rlp::decode::<TransactionV2>(&re_encoded[..])
			.map_err(|_| GatewayError::Validation("decode transaction failed".to_string()))?
	};

	let signature = transaction.hash();

	let (nonce, gas_price, sender) = match &transaction {
		TransactionV2::Legacy(tx) => {
			let (recovery_id, chain_id) = split_legacy_v(tx.signature.v());
			let signing_hash = legacy_signing_hash(tx, chain_id);
			let sender = recover_sender(signing_hash, tx.signature.r(), tx.signature.s(), recovery_id)?;
			(tx.nonce.as_u64(), tx.gas_price, sender)
		}
		TransactionV2::EIP2930(tx) => {
			let mut stream = RlpStream::new();
			stream.begin_list(8);
			stream.append(&tx.chain_id);
			stream.append(&tx.nonce);
			stream.append(&tx.gas_price);
			stream.append(&tx.gas_limit);
			encode_action(&mut stream, &tx.action);
			stream.append(&tx.value);
			stream.append(&tx.input);
			stream.append_list(&tx.access_list);
			let mut payload = vec![0x01u8];
			payload.extend_from_slice(&stream.out());
			let signing_hash = keccak(&payload);
			let recovery_id = tx.odd_y_parity as u8;
			let sender = recover_sender(signing_hash, tx.r, tx.s, recovery_id)?;
			(tx.nonce.as_u64(), tx.gas_price, sender)
		}
		TransactionV2::EIP1559(tx) => {
			let mut stream = RlpStream::new();
			stream.begin_list(9);
			stream.append(&tx.chain_id);
			stream.append(&tx.nonce);
			stream.append(&tx.max_priority_fee_per_gas);
			stream.append(&tx.max_fee_per_gas);
			stream.append(&tx.gas_limit);
			encode_action(&mut stream, &tx.action);
			stream.append(&tx.value);
			stream.append(&tx.input);
			stream.append_list(&tx.access_list);
			let mut payload = vec![0x02u8];
			payload.extend_from_slice(&stream.out());
			let signing_hash = keccak(&payload);
			let recovery_id = tx.odd_y_parity as u8;
			let sender = recover_sender(signing_hash, tx.r, tx.s, recovery_id)?;
			(tx.nonce.as_u64(), tx.max_fee_per_gas, sender)
		}
	};

	Ok(MempoolTx::new(signature, sender, nonce, gas_price, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_payload_is_rejected() {
		let err = decode_raw_transaction(&[]).unwrap_err();
		assert!(matches!(err, GatewayError::Validation(_)));
	}

	#[test]
	fn garbage_payload_fails_to_decode() {
		let err = decode_raw_transaction(&[0xff, 0x01, 0x02]).unwrap_err();
		assert!(matches!(err, GatewayError::Validation(_)));
	}

	#[test]
	fn legacy_v_without_eip155_recovers_no_chain_id() {
		assert_eq!(split_legacy_v(27), (0, None));
		assert_eq!(split_legacy_v(28), (1, None));
	}

	#[test]
	fn legacy_v_with_eip155_recovers_chain_id() {
		// mainnet, odd parity
		assert_eq!(split_legacy_v(37), (0, Some(1)));
		assert_eq!(split_legacy_v(38), (1, Some(1)));
	}
}
