//! JSON-RPC dispatcher for the slotgate gateway (spec.md §4.7, §6).

pub mod block;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod eth;
pub mod net;
pub mod web3;
pub mod wire;

pub use block::BlockView;
pub use dispatcher::{build_methods, serve};
pub use eth::{ChainBackend, EthApiImpl, EthApiServer};
pub use error::to_error_object;
pub use net::{NetApiImpl, NetApiServer};
pub use web3::{Web3ApiImpl, Web3ApiServer};
