//! Indexer integration
//!
//! After a transaction confirms, the indexer mirrors the new chain state into its queryable store
//! with some delay. The pipeline optionally waits for it through an `IndexerSync` so callers do
//! not read stale data right after a successful operation.

/// GraphQL client polling the indexer's progress
mod client;
/// Type definitions for indexer data structures
mod types;

pub use client::{GraphqlIndexerSync, IndexerSyncConfig};
pub use types::*;

use crate::allo::error::AlloResult;

use async_trait::async_trait;

/// Blocks until the external index reflects a confirmed block.
#[async_trait]
pub trait IndexerSync: Send + Sync {
	async fn wait_until_synced(&self, target: IndexerSyncTarget) -> AlloResult<()>;
}
