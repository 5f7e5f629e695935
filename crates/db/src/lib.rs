//! Slot-indexed block store (§4.1).
//!
//! Grounded on `fc-db`'s sqlx/SQLite backend
//! (examples/polkadot-evm-frontier/client/db/src/sql/mod.rs): a pooled
//! `SqlitePool`, `QueryBuilder` for batch inserts, and transactions wrapping
//! multi-statement mutations.

mod synthetic;

use ethereum_types::H256;
use sg_primitives::{Block, BlockInfo};
use sqlx::{sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};
use thiserror::Error;

pub use synthetic::{decode_synthetic_slot, encode_synthetic_hash};

#[derive(Debug, Error)]
pub enum BlockStoreError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

type Result<T> = std::result::Result<T, BlockStoreError>;

/// Slot-indexed persistence over `solana_blocks`, with synthetic hash/time
/// reconstruction and the active/finalized branch-switch state machine
/// (§4.1).
#[derive(Clone)]
pub struct BlockStore {
	pool: SqlitePool,
	genesis_time: i64,
}

impl BlockStore {
	pub async fn connect(database_url: &str, genesis_time: i64) -> Result<Self> {
		let pool = SqlitePoolOptions::new()
			.max_connections(16)
			.connect(database_url)
			.await?;
		let store = Self { pool, genesis_time };
		store.create_schema_if_missing().await?;
		Ok(store)
	}

	/// For tests: an in-memory store that doesn't touch the filesystem.
	pub async fn connect_in_memory(genesis_time: i64) -> Result<Self> {
		Self::connect("sqlite::memory:", genesis_time).await
	}

	async fn create_schema_if_missing(&self) -> Result<()> {
		sqlx::query(
			"CREATE TABLE IF NOT EXISTS solana_blocks (
				block_slot INTEGER PRIMARY KEY,
				block_hash BLOB,
				block_time INTEGER,
				parent_block_slot INTEGER NOT NULL,
				is_finalized BOOLEAN NOT NULL,
				is_active BOOLEAN NOT NULL
			)",
		)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	/// §4.1 `get_by_slot`. Mirrors the source's two-branch union: the target
	/// slot being active is the common case (branch one), but a target row
	/// that's gone inactive or missing still has a real parent hash to
	/// recover as long as the parent slot is itself active (branch two).
	/// Only when neither branch has a row does this fall back to a fully
	/// synthetic block.
	pub async fn get_by_slot(&self, slot: u64, latest_slot: u64) -> Result<BlockInfo> {
		if slot > latest_slot {
			return Ok(BlockInfo::stub(slot));
		}

		let row = sqlx::query(
			"SELECT a.block_hash, a.block_time, a.is_finalized, b.block_hash AS parent_hash
			   FROM solana_blocks a
			   LEFT JOIN solana_blocks b
			          ON b.block_slot = ?1 AND b.is_active = 1
			  WHERE a.block_slot = ?2 AND a.is_active = 1",
		)
		.bind(slot as i64 - 1)
		.bind(slot as i64)
		.fetch_optional(&self.pool)
		.await?;

		if let Some(row) = row {
			let hash: Option<Vec<u8>> = row.try_get("block_hash")?;
			let time: Option<i64> = row.try_get("block_time")?;
			let is_finalized: bool = row.try_get("is_finalized")?;
			let parent_hash: Option<Vec<u8>> = row.try_get("parent_hash")?;

			return Ok(BlockInfo {
				slot,
				hash: Some(to_h256_or_synthetic(hash, slot as i64)),
				time: Some(match time {
					Some(t) => t,
					None => self.synthesize_time(slot).await?,
				}),
				parent_hash: Some(match parent_hash {
					Some(bytes) => H256::from_slice(&bytes),
					None => encode_synthetic_hash(slot as i64 - 1),
				}),
				is_finalized,
			});
		}

		let parent_row = sqlx::query("SELECT block_hash FROM solana_blocks WHERE block_slot = ?1 AND is_active = 1")
			.bind(slot as i64 - 1)
			.fetch_optional(&self.pool)
			.await?;

		if let Some(parent_row) = parent_row {
			let parent_hash: Option<Vec<u8>> = parent_row.try_get("block_hash")?;
			return Ok(BlockInfo {
				slot,
				hash: Some(encode_synthetic_hash(slot as i64)),
				time: Some(self.synthesize_time(slot).await?),
				parent_hash: Some(to_h256_or_synthetic(parent_hash, slot as i64 - 1)),
				is_finalized: false,
			});
		}

		Ok(self.synthesize_block_info(slot).await?)
	}

	/// §4.1 `get_by_hash`.
	pub async fn get_by_hash(&self, hash: H256, latest_slot: u64) -> Result<BlockInfo> {
		if let Some(slot) = decode_synthetic_slot(hash) {
			let mut info = self.get_by_slot(slot, latest_slot).await?;
			// The caller may be probing an uncle branch; preserve the hash they asked for.
			info.set_hash(hash);
			return Ok(info);
		}

		let row = sqlx::query(
			"SELECT a.block_slot, a.block_time, a.is_finalized, b.block_hash AS parent_hash
			   FROM solana_blocks a
			   LEFT JOIN solana_blocks b
			          ON b.block_slot = a.block_slot - 1 AND b.is_active = 1
			  WHERE a.block_hash = ?1 AND a.is_active = 1",
		)
		.bind(hash.as_bytes())
		.fetch_optional(&self.pool)
		.await?;

		let Some(row) = row else {
			// Matches the source's fallback: an unknown, non-synthetic hash
			// resolves to a bare stub rather than an error (§4.1 failure semantics).
			return Ok(BlockInfo::stub(0));
		};

		let slot: i64 = row.try_get("block_slot")?;
		let time: Option<i64> = row.try_get("block_time")?;
		let is_finalized: bool = row.try_get("is_finalized")?;
		let parent_hash: Option<Vec<u8>> = row.try_get("parent_hash")?;

		Ok(BlockInfo {
			slot: slot as u64,
			hash: Some(hash),
			time: Some(match time {
				Some(t) => t,
				None => self.synthesize_time(slot as u64).await?,
			}),
			parent_hash: Some(match parent_hash {
				Some(bytes) => H256::from_slice(&bytes),
				None => encode_synthetic_hash(slot - 1),
			}),
			is_finalized,
		})
	}

	/// §4.1 `insert_batch`. `is_active` takes the same value as `is_finalized`
	/// on insert — a block only becomes active later via `activate_list`.
	pub async fn insert_batch<I: IntoIterator<Item = Block>>(&self, blocks: I) -> Result<()> {
		let blocks: Vec<Block> = blocks.into_iter().collect();
		if blocks.is_empty() {
			return Ok(());
		}

		let mut builder: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new(
			"INSERT OR REPLACE INTO solana_blocks
				(block_slot, block_hash, block_time, parent_block_slot, is_finalized, is_active) ",
		);
		builder.push_values(blocks.iter(), |mut b, block| {
			b.push_bind(block.slot as i64)
				.push_bind(block.hash.as_bytes().to_vec())
				.push_bind(block.time)
				.push_bind(block.parent_slot as i64)
				.push_bind(block.is_finalized)
				.push_bind(block.is_finalized);
		});
		builder.build().execute(&self.pool).await?;
		Ok(())
	}

	/// §4.1 `finalize_list`.
	pub async fn finalize_list(&self, base_slot: u64, slots: &[u64]) -> Result<()> {
		let Some(&last) = slots.last() else {
			return Ok(());
		};
		let mut tx = self.pool.begin().await?;

		let placeholders = placeholder_list(slots.len());
		let update_sql =
			format!("UPDATE solana_blocks SET is_finalized = 1, is_active = 1 WHERE block_slot IN ({placeholders})");
		let mut q = sqlx::query(&update_sql);
		for &slot in slots {
			q = q.bind(slot as i64);
		}
		q.execute(&mut *tx).await?;

		sqlx::query(
			"DELETE FROM solana_blocks
			  WHERE block_slot > ?1 AND block_slot < ?2 AND is_active = 0",
		)
		.bind(base_slot as i64)
		.bind(last as i64)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;
		log::debug!(target: "sg-db", "finalized {} slots up to {last}", slots.len());
		Ok(())
	}

	/// §4.1 `activate_list` — implements a branch switch: only one active
	/// chain above `base_slot` at a time.
	pub async fn activate_list(&self, base_slot: u64, slots: &[u64]) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("UPDATE solana_blocks SET is_active = 0 WHERE block_slot > ?1")
			.bind(base_slot as i64)
			.execute(&mut *tx)
			.await?;

		if !slots.is_empty() {
			let placeholders = placeholder_list(slots.len());
			let update_sql =
				format!("UPDATE solana_blocks SET is_active = 1 WHERE block_slot IN ({placeholders})");
			let mut q = sqlx::query(&update_sql);
			for &slot in slots {
				q = q.bind(slot as i64);
			}
			q.execute(&mut *tx).await?;
		}

		tx.commit().await?;
		log::debug!(target: "sg-db", "activated {} slots above base {base_slot}", slots.len());
		Ok(())
	}

	async fn synthesize_block_info(&self, slot: u64) -> Result<BlockInfo> {
		let time = self.synthesize_time(slot).await?;
		Ok(BlockInfo {
			slot,
			hash: Some(encode_synthetic_hash(slot as i64)),
			time: Some(time),
			parent_hash: Some(encode_synthetic_hash(slot as i64 - 1)),
			is_finalized: false,
		})
	}

	async fn synthesize_time(&self, slot: u64) -> Result<i64> {
		let lower = sqlx::query(
			"SELECT block_slot, block_time FROM solana_blocks
			  WHERE block_slot <= ?1 AND block_time IS NOT NULL
			  ORDER BY block_slot DESC LIMIT 1",
		)
		.bind(slot as i64)
		.fetch_optional(&self.pool)
		.await?
		.map(|row| synthetic::Neighbor {
			slot: row.get::<i64, _>("block_slot") as u64,
			time: row.get("block_time"),
		});

		let upper = sqlx::query(
			"SELECT block_slot, block_time FROM solana_blocks
			  WHERE block_slot >= ?1 AND block_time IS NOT NULL
			  ORDER BY block_slot ASC LIMIT 1",
		)
		.bind(slot as i64)
		.fetch_optional(&self.pool)
		.await?
		.map(|row| synthetic::Neighbor {
			slot: row.get::<i64, _>("block_slot") as u64,
			time: row.get("block_time"),
		});

		Ok(synthetic::synthetic_time(slot, lower, upper, self.genesis_time))
	}
}

fn to_h256_or_synthetic(hash: Option<Vec<u8>>, slot: i64) -> H256 {
	match hash {
		Some(bytes) => H256::from_slice(&bytes),
		None => encode_synthetic_hash(slot),
	}
}

fn placeholder_list(len: usize) -> String {
	std::iter::repeat("?").take(len).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn block(slot: u64, parent_slot: u64, finalized: bool) -> Block {
		Block {
			slot,
			hash: H256::repeat_byte(slot as u8 + 1),
			time: 1000 + slot as i64,
			parent_slot,
			is_finalized: finalized,
			is_active: finalized,
		}
	}

	#[tokio::test]
	async fn stub_above_tip() {
		let store = BlockStore::connect_in_memory(0).await.unwrap();
		let info = store.get_by_slot(100, 50).await.unwrap();
		assert_eq!(info.slot, 100);
		assert!(info.hash.is_none());
		assert!(info.time.is_none());
	}

	#[tokio::test]
	async fn recovers_a_real_parent_hash_when_the_target_row_is_inactive() {
		let store = BlockStore::connect_in_memory(0).await.unwrap();
		store
			.insert_batch([block(1, 0, true), block(2, 1, false)])
			.await
			.unwrap();

		// slot 2 was never activated, so branch one misses; branch two still
		// finds slot 1 active and returns its real hash as the parent.
		let info = store.get_by_slot(2, 10).await.unwrap();
		assert_eq!(info.parent_hash, Some(H256::repeat_byte(2)));
		assert_eq!(info.is_finalized, false);
	}

	#[tokio::test]
	async fn synthesizes_time_from_a_lower_neighbor() {
		let store = BlockStore::connect_in_memory(0).await.unwrap();
		store
			.insert_batch([block(10, 9, true)])
			.await
			.unwrap();

		let info = store.get_by_slot(12, 20).await.unwrap();
		assert_eq!(info.time, Some(1000 + 10 + 1)); // t_lower=1010, + ceil(2*0.4)=1
		assert_eq!(info.parent_hash, Some(encode_synthetic_hash(11)));
	}

	#[tokio::test]
	async fn branch_switch_activates_exactly_the_given_slots() {
		let store = BlockStore::connect_in_memory(0).await.unwrap();
		store
			.insert_batch([block(1, 0, true), block(2, 1, false), block(3, 2, false)])
			.await
			.unwrap();

		store.activate_list(1, &[2, 3]).await.unwrap();

		let info2 = store.get_by_slot(2, 3).await.unwrap();
		let info3 = store.get_by_slot(3, 3).await.unwrap();
		assert!(info2.hash.is_some());
		assert!(info3.hash.is_some());
	}

	#[tokio::test]
	async fn finalize_deletes_orphan_inactive_rows_below_horizon() {
		let store = BlockStore::connect_in_memory(0).await.unwrap();
		store
			.insert_batch([block(1, 0, true), block(2, 1, false), block(3, 2, false)])
			.await
			.unwrap();

		store.finalize_list(0, &[1, 2, 3]).await.unwrap();

		// Re-finalizing with a different orphan in between should remove it.
		store
			.insert_batch([block(4, 2, false)])
			.await
			.unwrap();
		store.finalize_list(3, &[5]).await.unwrap_or(()); // no-op, 5 doesn't exist but call is valid
		let info4 = store.get_by_slot(4, 10).await.unwrap();
		// slot 4 was never finalized nor activated, so it stays inactive and
		// therefore invisible to live reads — synthesized instead.
		assert!(info4.is_finalized == false);
	}
}
