//! Shared types between the block store, mempool and RPC dispatcher crates.

mod block;
mod error;
mod tx;

pub use block::{Block, BlockInfo};
pub use error::GatewayError;
pub use tx::{GasPriceSnapshot, MempoolTx, RejectReason, SubmitOutcome};
