//! Protocol backends.
//!
//! Each backend compiles the three domain actions into operations for one version of the Allo
//! contracts. The stage shape is shared; only the encoding of the protocol call and the event
//! read back from the receipt differ.

/// Solidity interfaces of both protocol versions
pub mod abi;
#[cfg(test)]
pub(crate) mod test_utils;
/// Legacy project registry and round contracts
pub mod v1;
/// Profile registry and pool strategies
pub mod v2;

pub use v1::AlloV1;
pub use v2::AlloV2;

use crate::allo::addresses::ChainId;
use crate::allo::error::{AlloError, AlloResult};
use crate::indexer::{IndexerSync, IndexerSyncTarget};
use crate::ipfs::Uploader;
use crate::transaction::{TransactionReceipt, TransactionSender};

use alloy::primitives::{Address, B256, TxHash, U256};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Handles to the services an operation runs against.
#[derive(Clone)]
pub struct Collaborators {
	pub uploader: Arc<dyn Uploader>,
	pub transaction_sender: Arc<dyn TransactionSender>,
	/// When set, confirmation also waits for the indexer to catch up with the receipt's block.
	pub indexer_sync: Option<Arc<dyn IndexerSync>>,
}

/// Final value of `create_project` and `update_project_metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectOutcome {
	pub project_id: B256,
}

/// How the round identifies a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRef {
	/// Position in the v1 round's application list
	Index(U256),
	/// Recipient id registered with the v2 pool strategy
	Recipient(Address),
}

/// Final value of `apply_to_round`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationOutcome {
	/// The id the round knows the project by
	pub project_id: B256,
	pub application: ApplicationRef,
}

/// Milliseconds since the epoch, stamped into uploaded documents.
pub(crate) fn created_at() -> i64 {
	chrono::Utc::now().timestamp_millis()
}

pub(crate) async fn upload_metadata(uploader: &dyn Uploader, document: &Value) -> AlloResult<String> {
	let cid = uploader.upload(document).await?;
	debug!("Metadata uploaded as {}", cid);
	Ok(cid)
}

/// Wait for `tx_hash` to confirm, then for the indexer when one is configured.
pub(crate) async fn confirm(
	collaborators: &Collaborators,
	chain: ChainId,
	tx_hash: TxHash,
) -> AlloResult<TransactionReceipt> {
	let receipt = collaborators
		.transaction_sender
		.wait(tx_hash)
		.await
		.map_err(|e| {
			AlloError::wait(format!("Failed to confirm transaction {}: {}", tx_hash, e)).with_inner(e)
		})?;
	info!(
		"Transaction {} confirmed in block {}",
		tx_hash, receipt.block_number
	);

	if let Some(indexer) = &collaborators.indexer_sync {
		indexer
			.wait_until_synced(IndexerSyncTarget {
				chain_id: chain.id(),
				block_number: receipt.block_number,
			})
			.await?;
		debug!("Indexer caught up with block {}", receipt.block_number);
	}

	Ok(receipt)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allo::error::ErrorKind;
	use crate::transaction::MockTransactionSender;
	use super::test_utils::{MockIndexerSync, MockUploader};

	fn collaborators(
		sender: Arc<MockTransactionSender>,
		indexer: Option<Arc<MockIndexerSync>>,
	) -> Collaborators {
		Collaborators {
			uploader: Arc::new(MockUploader::new()),
			transaction_sender: sender,
			indexer_sync: indexer.map(|indexer| indexer as Arc<dyn IndexerSync>),
		}
	}

	#[tokio::test]
	async fn test_confirm_waits_for_indexer_at_receipt_block() {
		let indexer = Arc::new(MockIndexerSync::new());
		let collaborators = collaborators(Arc::new(MockTransactionSender::new()), Some(indexer.clone()));

		let receipt = confirm(&collaborators, ChainId::Mainnet, TxHash::ZERO)
			.await
			.unwrap();

		assert_eq!(
			indexer.targets(),
			vec![IndexerSyncTarget {
				chain_id: 1,
				block_number: receipt.block_number,
			}]
		);
	}

	#[tokio::test]
	async fn test_confirm_maps_sender_failure_to_wait_error() {
		let sender = Arc::new(MockTransactionSender::new());
		sender.fail_next_wait("dropped from mempool");
		let indexer = Arc::new(MockIndexerSync::new());
		let collaborators = collaborators(sender, Some(indexer.clone()));

		let err = confirm(&collaborators, ChainId::Mainnet, TxHash::ZERO)
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Wait);
		assert!(indexer.targets().is_empty());
	}

	#[tokio::test]
	async fn test_confirm_without_indexer_returns_receipt() {
		let collaborators = collaborators(Arc::new(MockTransactionSender::new()), None);
		let tx_hash = TxHash::repeat_byte(4);

		let receipt = confirm(&collaborators, ChainId::Sepolia, tx_hash).await.unwrap();

		assert_eq!(receipt.transaction_hash, tx_hash);
	}
}
