//! `slotgate`: an Ethereum JSON-RPC gateway in front of a slot-based foreign
//! ledger (spec.md, §6).
//!
//! Wires the block store, mempool and JSON-RPC dispatcher together and runs
//! the HTTP, service and maintenance listeners side by side from one entry
//! point, the way Frontier's own node service assembles its RPC, db and
//! import-queue tasks (examples/polkadot-evm-frontier/client/rpc/src/lib.rs).

mod backend;
mod config;
mod peer;
mod socket;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ethereum_types::H160;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use parking_lot::RwLock;
use sg_db::BlockStore;
use sg_mempool::{ChainNonceSource, ExecutorBackend, Mempool, Replicator};

use backend::{CachedNonceSource, ForeignExecutorBackend, ForeignLedgerClient, RawSignatureValidator};
use config::GatewayConfig;
use sg_mempool::MempoolMetrics;

#[tokio::main]
async fn main() {
	env_logger::init();
	let config = GatewayConfig::parse();

	let store = Arc::new(
		BlockStore::connect(&config.database_url, config.genesis_time)
			.await
			.expect("failed to open the block store"),
	);

	let chain_id = discover_chain_id(&config.foreign_rpc_url).await;
	let ledger = Arc::new(
		ForeignLedgerClient::connect(&config.foreign_rpc_url, chain_id)
			.expect("invalid --foreign-rpc-url"),
	);

	let executor_client = HttpClientBuilder::default()
		.build(&config.foreign_rpc_url)
		.expect("invalid --foreign-rpc-url");
	let executor_backend = Arc::new(ForeignExecutorBackend::new(executor_client));

	let nonce_source = Arc::new(CachedNonceSource::new());
	let tracked_senders: Arc<RwLock<HashSet<H160>>> = Arc::new(RwLock::new(HashSet::new()));
	{
		let refresh_client = Arc::new(
			HttpClientBuilder::default()
				.build(&config.foreign_rpc_url)
				.expect("invalid --foreign-rpc-url"),
		);
		let tracked_senders = tracked_senders.clone();
		nonce_source.spawn_refresh(
			refresh_client,
			move || tracked_senders.read().iter().copied().collect(),
			Duration::from_secs(5),
		);
	}

	let replicator = Arc::new(Replicator::new());
	let mempool = Mempool::new(
		config.resource_pool_size,
		config.min_gas_price_u256(),
		config.mempool_ttl_secs,
		executor_backend,
		Arc::new(RawSignatureValidator),
		nonce_source as Arc<dyn ChainNonceSource>,
		replicator.clone(),
	);
	mempool.async_init(config.executor_count).await;

	{
		let gas_price_client = Arc::new(
			HttpClientBuilder::default()
				.build(&config.foreign_rpc_url)
				.expect("invalid --foreign-rpc-url"),
		);
		spawn_gas_price_refresher(gas_price_client, mempool.clone(), Duration::from_secs(10));
	}

	let registry = prometheus::Registry::new();
	let metrics = MempoolMetrics::register(&registry).expect("duplicate metric registration");
	spawn_metrics_sampler(mempool.clone(), metrics, registry);

	let methods = sg_rpc::build_methods(
		store,
		mempool.clone(),
		ledger as Arc<dyn sg_rpc::ChainBackend>,
		chain_id,
	);
	let rpc_addr: SocketAddr = config.rpc_addr.parse().expect("invalid --rpc-addr");
	let _rpc_handle = sg_rpc::serve(rpc_addr, methods)
		.await
		.expect("failed to start the JSON-RPC server");
	log::info!(target: "slotgate", "JSON-RPC listening on {rpc_addr}");

	let service = tokio::spawn(socket::run_service_socket(
		config.service_addr.clone(),
		mempool.clone(),
		tracked_senders,
	));
	let maintenance = tokio::spawn(socket::run_maintenance_socket(
		config.maintenance_addr.clone(),
		mempool,
		replicator,
	));

	let _ = tokio::join!(service, maintenance);
}

/// Periodically samples the mempool's internal counters into the registered
/// gauges and logs the rendered exposition text. No HTTP exporter sits in
/// front of this (none of the teacher's own dependencies pull one in); an
/// operator wiring a `/metrics` endpoint in front of `registry` only needs
/// the `prometheus::Encoder` already in scope here.
fn spawn_metrics_sampler(
	mempool: Arc<Mempool<ForeignExecutorBackend>>,
	metrics: MempoolMetrics,
	registry: prometheus::Registry,
) {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(Duration::from_secs(15));
		loop {
			ticker.tick().await;
			metrics.queued_tx_count.set(mempool.queued_tx_count() as i64);
			metrics.free_resource_count.set(mempool.free_resource_count() as i64);
			metrics.live_executor_count.set(mempool.live_executor_count() as i64);

			let mut buffer = Vec::new();
			let encoder = prometheus::TextEncoder::new();
			if prometheus::Encoder::encode(&encoder, &registry.gather(), &mut buffer).is_ok() {
				log::trace!(target: "slotgate", "{}", String::from_utf8_lossy(&buffer));
			}
		}
	});
}

/// Periodically polls the foreign ledger's `eth_gasPrice` and feeds it into
/// the mempool's `GasPriceSnapshot` (§3: "TTL-refreshed from an external
/// price source"), mirroring `CachedNonceSource::spawn_refresh`'s
/// background-poll shape so the scheduler hot path never makes this call
/// itself.
fn spawn_gas_price_refresher<B: ExecutorBackend + 'static>(
	client: Arc<HttpClient>,
	mempool: Arc<Mempool<B>>,
	interval: Duration,
) {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		loop {
			ticker.tick().await;
			if let Ok(hex_price) = client.request::<String, _>("eth_gasPrice", rpc_params![]).await {
				if let Ok(price) = u64::from_str_radix(hex_price.trim_start_matches("0x"), 16) {
					mempool.set_gas_price(price);
				}
			}
		}
	});
}

/// The gateway needs the foreign ledger's chain id up front to answer
/// `eth_chainId`/`net_version` locally; fetched once at startup rather than
/// on every call.
async fn discover_chain_id(url: &str) -> u64 {
	let client = HttpClientBuilder::default()
		.build(url)
		.expect("invalid --foreign-rpc-url");
	let hex_id: String = client
		.request("eth_chainId", rpc_params![])
		.await
		.expect("foreign ledger did not answer eth_chainId");
	u64::from_str_radix(hex_id.trim_start_matches("0x"), 16)
		.expect("foreign ledger returned a malformed chain id")
}
