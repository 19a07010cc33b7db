//!
//! Network-backed transaction sender.
//!
//! Signs with a local key through an alloy wallet provider and tracks confirmation through the
//! provider's pending-transaction watcher.

use super::{ReceiptLog, SenderError, TransactionData, TransactionReceipt, TransactionSender};

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash};
use alloy::providers::{
	DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
	WatchTxError,
};
use alloy::rpc::types::{TransactionReceipt as RpcReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Confirmation settings for the network sender
#[derive(Debug, Clone)]
pub struct SenderConfig {
	/// How long `wait` suspends before giving up
	pub confirmation_timeout: Duration,
	/// Blocks on top of the inclusion block before a transaction counts as confirmed
	pub required_confirmations: u64,
	/// Delay between block number polls for a transaction that is mined but not yet deep enough
	pub poll_interval: Duration,
}

impl Default for SenderConfig {
	fn default() -> Self {
		Self {
			confirmation_timeout: Duration::from_secs(300),
			required_confirmations: 1,
			poll_interval: Duration::from_secs(1),
		}
	}
}

/// Transaction sender for an EVM JSON-RPC endpoint
pub struct AlloyTransactionSender {
	provider: DynProvider,
	address: Address,
	config: SenderConfig,
}

/// Whether a transaction mined in `mined_in` has `required` confirmations at block `latest`.
/// The inclusion block counts as the first confirmation.
fn has_confirmations(mined_in: u64, latest: u64, required: u64) -> bool {
	latest >= mined_in && latest - mined_in + 1 >= required
}

impl AlloyTransactionSender {
	/// Creates a sender signing with `signer` against `rpc_url`
	pub fn new(rpc_url: reqwest::Url, signer: PrivateKeySigner, config: SenderConfig) -> Self {
		let address = signer.address();
		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer))
			.connect_http(rpc_url)
			.erased();

		Self {
			provider,
			address,
			config,
		}
	}

	/// Poll the chain head until `mined_in` is buried under the configured confirmations.
	async fn wait_for_depth(&self, mined_in: u64) -> Result<(), SenderError> {
		let required = self.config.required_confirmations;
		let poll = async {
			loop {
				let latest = self.provider.get_block_number().await?;
				if has_confirmations(mined_in, latest, required) {
					return Ok::<(), SenderError>(());
				}
				debug!(
					"Block {} has {} of {} confirmations",
					mined_in,
					latest.saturating_sub(mined_in) + 1,
					required
				);
				tokio::time::sleep(self.config.poll_interval).await;
			}
		};

		tokio::time::timeout(self.config.confirmation_timeout, poll)
			.await
			.map_err(|_| SenderError::Timeout(self.config.confirmation_timeout))?
	}

	fn convert_receipt(receipt: RpcReceipt) -> Result<TransactionReceipt, SenderError> {
		let tx_hash = receipt.transaction_hash;
		if !receipt.inner.status() {
			return Err(SenderError::Reverted(tx_hash));
		}

		let block_hash = receipt.block_hash.ok_or_else(|| {
			SenderError::IncompleteReceipt(tx_hash, "missing block hash".to_string())
		})?;
		let block_number = receipt.block_number.ok_or_else(|| {
			SenderError::IncompleteReceipt(tx_hash, "missing block number".to_string())
		})?;

		let logs = receipt
			.inner
			.logs()
			.iter()
			.map(|log| ReceiptLog {
				data: log.inner.data.data.clone(),
				topics: log.inner.data.topics().to_vec(),
			})
			.collect();

		Ok(TransactionReceipt {
			transaction_hash: tx_hash,
			block_hash,
			block_number,
			logs,
		})
	}
}

#[async_trait]
impl TransactionSender for AlloyTransactionSender {
	async fn send(&self, tx: &TransactionData) -> Result<TxHash, SenderError> {
		let request = TransactionRequest::default()
			.with_from(self.address)
			.with_to(tx.to)
			.with_input(tx.data.clone())
			.with_value(tx.value);

		debug!("SENDING to {} from {}", tx.to, self.address);
		let pending = self.provider.send_transaction(request).await.map_err(|e| {
			error!("Transaction submission failed: {:?}", e);
			SenderError::Rpc(e)
		})?;
		let tx_hash = *pending.tx_hash();
		debug!("SENT {}", tx_hash);

		Ok(tx_hash)
	}

	async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt, SenderError> {
		// Already mined: the watcher only sees new blocks, so answer from the node directly.
		if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
			let receipt = Self::convert_receipt(receipt)?;
			debug!(
				"Receipt for {} already available in block {}",
				tx_hash, receipt.block_number
			);
			self.wait_for_depth(receipt.block_number).await?;
			return Ok(receipt);
		}

		debug!(
			"Waiting for {} ({} confirmations, timeout {:?})",
			tx_hash, self.config.required_confirmations, self.config.confirmation_timeout
		);
		let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
			.with_required_confirmations(self.config.required_confirmations)
			.with_timeout(Some(self.config.confirmation_timeout))
			.get_receipt()
			.await
			.map_err(|e| match e {
				PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
					SenderError::Timeout(self.config.confirmation_timeout)
				}
				other => SenderError::Confirmation(other.to_string()),
			})?;

		let receipt = Self::convert_receipt(receipt)?;
		info!(
			"Transaction {} confirmed in block {} ({:?})",
			tx_hash, receipt.block_number, receipt.block_hash
		);
		Ok(receipt)
	}

	fn address(&self) -> Address {
		self.address
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{Value, json};

	fn rpc_receipt(status: &str, block_hash: Value) -> RpcReceipt {
		serde_json::from_value(json!({
			"type": "0x2",
			"status": status,
			"cumulativeGasUsed": "0x5208",
			"logs": [],
			"logsBloom": format!("0x{}", "00".repeat(256)),
			"transactionHash": TxHash::repeat_byte(0x11),
			"transactionIndex": "0x0",
			"blockHash": block_hash,
			"blockNumber": "0x64",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x3b9aca00",
			"from": Address::repeat_byte(0x22),
			"to": Address::repeat_byte(0x33),
			"contractAddress": null
		}))
		.unwrap()
	}

	#[test]
	fn test_inclusion_block_counts_as_first_confirmation() {
		assert!(has_confirmations(100, 100, 1));
		assert!(has_confirmations(100, 100, 0));
		assert!(!has_confirmations(100, 100, 2));
	}

	#[test]
	fn test_shallow_receipt_is_not_confirmed() {
		// mined one block ago with three confirmations required
		assert!(!has_confirmations(100, 101, 3));
		assert!(has_confirmations(100, 102, 3));
		assert!(has_confirmations(100, 150, 3));
	}

	#[test]
	fn test_head_behind_inclusion_block_is_not_confirmed() {
		assert!(!has_confirmations(100, 99, 1));
	}

	#[test]
	fn test_successful_receipt_converts() {
		let receipt = AlloyTransactionSender::convert_receipt(rpc_receipt(
			"0x1",
			json!(TxHash::repeat_byte(0x44)),
		))
		.unwrap();

		assert_eq!(receipt.transaction_hash, TxHash::repeat_byte(0x11));
		assert_eq!(receipt.block_hash, TxHash::repeat_byte(0x44));
		assert_eq!(receipt.block_number, 100);
		assert!(receipt.logs.is_empty());
	}

	#[test]
	fn test_reverted_receipt_is_rejected() {
		let result = AlloyTransactionSender::convert_receipt(rpc_receipt(
			"0x0",
			json!(TxHash::repeat_byte(0x44)),
		));

		assert!(
			matches!(result, Err(SenderError::Reverted(hash)) if hash == TxHash::repeat_byte(0x11))
		);
	}

	#[test]
	fn test_receipt_without_block_hash_is_incomplete() {
		let result = AlloyTransactionSender::convert_receipt(rpc_receipt("0x1", Value::Null));

		assert!(matches!(
			result,
			Err(SenderError::IncompleteReceipt(hash, reason))
				if hash == TxHash::repeat_byte(0x11) && reason.contains("block hash")
		));
	}
}
