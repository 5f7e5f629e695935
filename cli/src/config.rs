//! `GatewayConfig` (SPEC_FULL §4.8) — a flat `clap` struct of bind
//! addresses and tunables, following Frontier's derive-based CLI flag
//! conventions
//! (examples/polkadot-evm-frontier/client/cli/src/frontier_db_cmd/mod.rs)
//! with env overrides.

use clap::Parser;
use ethereum_types::U256;

#[derive(Debug, Clone, Parser)]
#[command(name = "slotgate", about = "Ethereum JSON-RPC gateway over a slot-based foreign ledger")]
pub struct GatewayConfig {
	/// JSON-RPC URL of the foreign ledger this gateway routes transactions onto.
	#[arg(long, env = "SLOTGATE_FOREIGN_RPC_URL")]
	pub foreign_rpc_url: String,

	/// Minimum gas price admitted by the mempool, in wei.
	#[arg(long, env = "SLOTGATE_MIN_GAS_PRICE", default_value = "1")]
	pub min_gas_price: u64,

	/// SQLite connection string for the block store.
	#[arg(long, env = "SLOTGATE_DATABASE_URL", default_value = "sqlite://slotgate.db")]
	pub database_url: String,

	/// Number of back-end executor workers.
	#[arg(long, env = "SLOTGATE_EXECUTOR_COUNT", default_value_t = sg_mempool::DEFAULT_EXECUTOR_COUNT)]
	pub executor_count: u32,

	/// Size of the operator-resource lease pool.
	#[arg(long, env = "SLOTGATE_RESOURCE_POOL_SIZE", default_value = "8")]
	pub resource_pool_size: u32,

	/// Service socket bind address (§6).
	#[arg(long, env = "SLOTGATE_SERVICE_ADDR", default_value = "0.0.0.0:9091")]
	pub service_addr: String,

	/// Maintenance socket bind address (§6).
	#[arg(long, env = "SLOTGATE_MAINTENANCE_ADDR", default_value = "0.0.0.0:9092")]
	pub maintenance_addr: String,

	/// JSON-RPC HTTP bind address.
	#[arg(long, env = "SLOTGATE_RPC_ADDR", default_value = "0.0.0.0:8545")]
	pub rpc_addr: String,

	/// Mempool tx cache TTL, in seconds.
	#[arg(long, env = "SLOTGATE_MEMPOOL_TTL_SECS", default_value = "15")]
	pub mempool_ttl_secs: u64,

	/// Genesis timestamp used by synthetic time reconstruction (§4.1).
	#[arg(long, env = "SLOTGATE_GENESIS_TIME")]
	pub genesis_time: i64,
}

impl GatewayConfig {
	pub fn min_gas_price_u256(&self) -> U256 {
		U256::from(self.min_gas_price)
	}
}
