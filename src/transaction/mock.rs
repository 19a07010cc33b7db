//!
//! In-memory transaction sender.
//!
//! Satisfies the same contract as the network sender without touching a chain: every `send`
//! succeeds with the zero hash and is recorded, every `wait` synthesizes a receipt.

use super::{ReceiptLog, SenderError, TransactionData, TransactionReceipt, TransactionSender};

use alloy::primitives::{Address, B256, TxHash};
use async_trait::async_trait;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MockState {
	sent_transactions: Vec<TransactionData>,
	receipts: HashMap<TxHash, TransactionReceipt>,
	scripted_logs: VecDeque<Vec<ReceiptLog>>,
	send_failure: Option<String>,
	wait_failure: Option<String>,
}

/// Deterministic stand-in for a network sender.
///
/// ```
/// # tokio_test_block_on(async {
/// use allo_operations::transaction::{MockTransactionSender, TransactionData, TransactionSender};
/// use alloy::primitives::{Address, Bytes, U256};
///
/// let sender = MockTransactionSender::new();
/// let tx = TransactionData { to: Address::ZERO, data: Bytes::new(), value: U256::ZERO };
/// let hash = sender.send(&tx).await.unwrap();
/// let receipt = sender.wait(hash).await.unwrap();
/// assert_eq!(receipt.transaction_hash, hash);
/// assert_eq!(sender.sent_transactions(), vec![tx]);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Default)]
pub struct MockTransactionSender {
	state: Mutex<MockState>,
}

impl MockTransactionSender {
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Snapshot of every transaction submitted so far, oldest first.
	pub fn sent_transactions(&self) -> Vec<TransactionData> {
		self.state().sent_transactions.clone()
	}

	pub fn clear_transactions(&self) {
		self.state().sent_transactions.clear();
	}

	/// Logs to place in the next synthesized receipt. Queued entries are consumed in order.
	pub fn push_receipt_logs(&self, logs: Vec<ReceiptLog>) {
		self.state().scripted_logs.push_back(logs);
	}

	/// Make the next `send` fail with the given reason.
	pub fn fail_next_send(&self, reason: impl Into<String>) {
		self.state().send_failure = Some(reason.into());
	}

	/// Make the next `wait` on an unconfirmed hash fail with the given reason.
	pub fn fail_next_wait(&self, reason: impl Into<String>) {
		self.state().wait_failure = Some(reason.into());
	}
}

fn random_block_hash() -> B256 {
	let mut bytes = [0u8; 32];
	rand::rng().fill(&mut bytes);
	B256::from(bytes)
}

#[async_trait]
impl TransactionSender for MockTransactionSender {
	async fn send(&self, tx: &TransactionData) -> Result<TxHash, SenderError> {
		let mut state = self.state();
		if let Some(reason) = state.send_failure.take() {
			return Err(SenderError::Rejected(reason));
		}

		let tx_hash = TxHash::ZERO;
		state.sent_transactions.push(tx.clone());
		// A fresh submission under the same hash supersedes the previous confirmation.
		state.receipts.remove(&tx_hash);
		Ok(tx_hash)
	}

	async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt, SenderError> {
		let mut state = self.state();
		if let Some(receipt) = state.receipts.get(&tx_hash) {
			return Ok(receipt.clone());
		}
		if let Some(reason) = state.wait_failure.take() {
			return Err(SenderError::Confirmation(reason));
		}

		let logs = state.scripted_logs.pop_front().unwrap_or_default();
		let receipt = TransactionReceipt {
			transaction_hash: tx_hash,
			block_hash: random_block_hash(),
			block_number: 1,
			logs,
		};
		state.receipts.insert(tx_hash, receipt.clone());
		Ok(receipt)
	}

	fn address(&self) -> Address {
		Address::ZERO
	}
}
