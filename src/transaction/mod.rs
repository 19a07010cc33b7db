//! Transaction submission and confirmation.
//!
//! This module defines the chain-facing types the pipeline works with, the `TransactionSender`
//! abstraction over "submit" and "wait for confirmation", and helpers to send ABI-encoded calls
//! and to pull typed events back out of a confirmed receipt.

/// In-memory sender for tests
pub mod mock;
/// Network-backed sender built on an alloy provider
pub mod sender;

pub use mock::MockTransactionSender;
pub use sender::{AlloyTransactionSender, SenderConfig};

use crate::allo::error::{AlloError, AlloResult};

use alloy::primitives::{Address, B256, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A transaction ready to be signed and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
	/// Contract the call is addressed to.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Bytes,
	/// Native value attached to the call, in wei.
	pub value: U256,
}

/// One log entry emitted by a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
	pub data: Bytes,
	pub topics: Vec<B256>,
}

/// Chain-confirmed record of a transaction. Logs are kept in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub transaction_hash: TxHash,
	pub block_hash: B256,
	pub block_number: u64,
	pub logs: Vec<ReceiptLog>,
}

/// Failures reported by a `TransactionSender`.
#[derive(Error, Debug)]
pub enum SenderError {
	#[error("Transaction rejected: {0}")]
	Rejected(String),

	#[error("RPC error: {0}")]
	Rpc(#[from] alloy::transports::TransportError),

	#[error("Confirmation failed: {0}")]
	Confirmation(String),

	#[error("Confirmation timed out after {0:?}")]
	Timeout(Duration),

	#[error("Transaction {0} reverted")]
	Reverted(TxHash),

	#[error("Incomplete receipt for {0}: {1}")]
	IncompleteReceipt(TxHash, String),
}

/// Submits transactions for a fixed signing identity and waits for them to confirm.
#[async_trait]
pub trait TransactionSender: Send + Sync {
	/// Submit a transaction. Returns as soon as it is accepted into the pending pool.
	async fn send(&self, tx: &TransactionData) -> Result<TxHash, SenderError>;

	/// Suspend until the transaction is confirmed. Waiting twice on the same hash yields the same
	/// receipt.
	async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt, SenderError>;

	/// The identity `send` signs with.
	fn address(&self) -> Address;
}

/// Extract a typed event from a receipt that is known to contain it.
///
/// Scans the logs in order for the first one whose first topic is the event's signature hash.
///
/// # Panics
///
/// Panics when no such log exists or it does not decode: a successful receipt for a call the
/// backend encoded itself always carries the event, so a miss means the backend's ABI tables
/// disagree with the chain.
pub fn decode_event_from_receipt<E: SolEvent>(receipt: &TransactionReceipt) -> E {
	let log = receipt
		.logs
		.iter()
		.find(|log| log.topics.first() == Some(&E::SIGNATURE_HASH));

	let Some(log) = log else {
		panic!(
			"Event {} not found in receipt {}",
			E::SIGNATURE,
			receipt.transaction_hash
		);
	};

	E::decode_raw_log(log.topics.iter().copied(), &log.data).unwrap_or_else(|e| {
		panic!(
			"Event {} in receipt {} failed to decode: {}",
			E::SIGNATURE,
			receipt.transaction_hash,
			e
		)
	})
}

/// Send pre-encoded transaction data, folding sender failures into a `Send` error.
pub async fn send_raw_transaction(
	sender: &dyn TransactionSender,
	tx: TransactionData,
) -> AlloResult<TxHash> {
	debug!("Sending raw transaction to {}", tx.to);
	sender.send(&tx).await.map_err(|e| {
		AlloError::send(format!("Failed to send raw transaction: {}", e)).with_inner(e)
	})
}

/// ABI-encode `call` and send it to `to` with no value attached.
pub async fn send_transaction<C: SolCall>(
	sender: &dyn TransactionSender,
	to: Address,
	call: &C,
) -> AlloResult<TxHash> {
	let tx = TransactionData {
		to,
		data: call.abi_encode().into(),
		value: U256::ZERO,
	};

	debug!("Sending {} to {}", C::SIGNATURE, to);
	sender.send(&tx).await.map_err(|e| {
		AlloError::send(format!("Failed to send transaction: {}", e)).with_inner(e)
	})
}
