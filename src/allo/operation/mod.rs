//! Operation orchestrator.
//!
//! An `Operation` is what every domain action returns. It owns the action's stages and the
//! listeners registered on its channels, runs the stages strictly in order when executed, reports
//! each stage's result on its channel before the next stage starts, and resolves to one final
//! result.
//!
//! Stages:
//! - metadata (`ipfs`): validate the input and upload the metadata document
//! - transaction (`transaction`): encode the protocol call and submit it
//! - confirmation (`transactionStatus`): wait for the receipt and for the indexer
//!
//! After a successful confirmation the receipt is turned into the operation's final value.
//! The first failing stage settles the operation; later stages never run.

/// Channels, events and the dispatcher
pub mod events;
/// Execution state machine and stage timing
pub mod progress_tracker;

pub use events::{Channel, EventDispatcher, OperationEvent, OperationEventHandler};
pub use progress_tracker::{OperationProgress, OperationState};

use crate::allo::error::AlloResult;
use crate::transaction::TransactionReceipt;
use events::ChannelListener;

use alloy::primitives::TxHash;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use tracing::debug;

type Stage<I, O> = Box<dyn FnOnce(I) -> BoxFuture<'static, AlloResult<O>> + Send>;

/// A pending multi-stage blockchain action.
///
/// Listeners have to be registered before `execute`, which consumes the operation: an operation
/// runs once and cannot be executed again.
///
/// ```compile_fail
/// # use allo_operations::allo::operation::Operation;
/// # use alloy::primitives::TxHash;
/// # async fn demo() {
/// let operation = Operation::new(
///     "demo",
///     async { Ok("cid".to_string()) },
///     |_cid| async { Ok(TxHash::ZERO) },
///     |_hash| async { unimplemented!() },
///     |_receipt| (),
/// );
/// let _ = operation.execute().await;
/// let _ = operation.execute().await; // use of moved value
/// # }
/// ```
pub struct Operation<T> {
	kind: &'static str,
	metadata: BoxFuture<'static, AlloResult<String>>,
	transaction: Stage<String, TxHash>,
	confirmation: Stage<TxHash, TransactionReceipt>,
	settle: Box<dyn FnOnce(TransactionReceipt) -> T + Send>,
	dispatcher: EventDispatcher,
}

impl<T> Operation<T> {
	/// Assemble an operation from its stages. Nothing runs until `execute`.
	///
	/// * `metadata` - resolves to the content identifier of the uploaded metadata
	/// * `transaction` - submits the protocol call referencing that identifier
	/// * `confirmation` - waits until the submitted transaction is confirmed
	/// * `settle` - derives the final value from the confirmed receipt
	pub fn new<M, X, XF, C, CF, S>(
		kind: &'static str,
		metadata: M,
		transaction: X,
		confirmation: C,
		settle: S,
	) -> Self
	where
		M: Future<Output = AlloResult<String>> + Send + 'static,
		X: FnOnce(String) -> XF + Send + 'static,
		XF: Future<Output = AlloResult<TxHash>> + Send + 'static,
		C: FnOnce(TxHash) -> CF + Send + 'static,
		CF: Future<Output = AlloResult<TransactionReceipt>> + Send + 'static,
		S: FnOnce(TransactionReceipt) -> T + Send + 'static,
	{
		Self {
			kind,
			metadata: metadata.boxed(),
			transaction: Box::new(move |cid| transaction(cid).boxed()),
			confirmation: Box::new(move |tx_hash| confirmation(tx_hash).boxed()),
			settle: Box::new(settle),
			dispatcher: EventDispatcher::new(),
		}
	}

	/// Name of the domain action, e.g. `createProject`.
	pub fn kind(&self) -> &'static str {
		self.kind
	}

	/// Register a handler receiving the events of every channel.
	pub fn on(mut self, handler: impl OperationEventHandler + 'static) -> Self {
		self.dispatcher.register_handler(Box::new(handler));
		self
	}

	/// Listen for the content identifier of the uploaded metadata.
	pub fn on_ipfs<F>(self, mut listener: F) -> Self
	where
		F: FnMut(&AlloResult<String>) + Send + 'static,
	{
		self.on(ChannelListener::new(Channel::Ipfs, move |event: &OperationEvent<'_>| {
			if let OperationEvent::Ipfs(result) = event {
				listener(*result)
			}
		}))
	}

	/// Listen for the hash of the submitted transaction.
	pub fn on_transaction<F>(self, mut listener: F) -> Self
	where
		F: FnMut(&AlloResult<TxHash>) + Send + 'static,
	{
		self.on(ChannelListener::new(
			Channel::Transaction,
			move |event: &OperationEvent<'_>| {
				if let OperationEvent::Transaction(result) = event {
					listener(*result)
				}
			},
		))
	}

	/// Listen for the receipt of the confirmed transaction.
	pub fn on_transaction_status<F>(self, mut listener: F) -> Self
	where
		F: FnMut(&AlloResult<TransactionReceipt>) + Send + 'static,
	{
		self.on(ChannelListener::new(
			Channel::TransactionStatus,
			move |event: &OperationEvent<'_>| {
				if let OperationEvent::TransactionStatus(result) = event {
					listener(*result)
				}
			},
		))
	}

	/// Run every stage in order and resolve to the final result.
	///
	/// Dropping the returned future abandons the in-flight collaborator call and every later
	/// stage. A transaction the node already accepted stays submitted.
	pub async fn execute(self) -> AlloResult<T> {
		let Operation {
			kind,
			metadata,
			transaction,
			confirmation,
			settle,
			mut dispatcher,
		} = self;

		if dispatcher.is_empty() {
			debug!("{} operation: executing without listeners", kind);
		} else {
			debug!("{} operation: executing with {} listeners", kind, dispatcher.len());
		}
		let mut progress = OperationProgress::new(kind);
		let result = run_stages(
			metadata,
			transaction,
			confirmation,
			settle,
			&mut dispatcher,
			&mut progress,
		)
		.await;
		progress.settle(result.is_ok());
		result
	}
}

async fn run_stages<T>(
	metadata: BoxFuture<'static, AlloResult<String>>,
	transaction: Stage<String, TxHash>,
	confirmation: Stage<TxHash, TransactionReceipt>,
	settle: Box<dyn FnOnce(TransactionReceipt) -> T + Send>,
	dispatcher: &mut EventDispatcher,
	progress: &mut OperationProgress,
) -> AlloResult<T> {
	progress.begin(Channel::Ipfs);
	let cid = metadata.await;
	progress.record(Channel::Ipfs, cid.is_err());
	dispatcher.dispatch(&OperationEvent::Ipfs(&cid)).await;
	let cid = cid?;

	progress.begin(Channel::Transaction);
	let tx_hash = transaction(cid).await;
	progress.record(Channel::Transaction, tx_hash.is_err());
	dispatcher.dispatch(&OperationEvent::Transaction(&tx_hash)).await;
	let tx_hash = tx_hash?;

	progress.begin(Channel::TransactionStatus);
	let receipt = confirmation(tx_hash).await;
	progress.record(Channel::TransactionStatus, receipt.is_err());
	dispatcher
		.dispatch(&OperationEvent::TransactionStatus(&receipt))
		.await;
	let receipt = receipt?;

	Ok(settle(receipt))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allo::error::{AlloError, ErrorKind};
	use alloy::primitives::B256;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::{Arc, Mutex};

	fn receipt(tx_hash: TxHash) -> TransactionReceipt {
		TransactionReceipt {
			transaction_hash: tx_hash,
			block_hash: B256::repeat_byte(3),
			block_number: 8,
			logs: Vec::new(),
		}
	}

	fn recorder(operation: Operation<u64>, log: Arc<Mutex<Vec<&'static str>>>) -> Operation<u64> {
		let (a, b, c) = (log.clone(), log.clone(), log);
		operation
			.on_ipfs(move |_| a.lock().unwrap().push("ipfs"))
			.on_transaction(move |_| b.lock().unwrap().push("transaction"))
			.on_transaction_status(move |_| c.lock().unwrap().push("transactionStatus"))
	}

	#[tokio::test]
	async fn test_successful_run_emits_each_channel_once_in_order() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let operation = Operation::new(
			"test",
			async { Ok("cid".to_string()) },
			|cid| async move {
				assert_eq!(cid, "cid");
				Ok(TxHash::repeat_byte(1))
			},
			|tx_hash| async move { Ok(receipt(tx_hash)) },
			|receipt| receipt.block_number,
		);

		let result = recorder(operation, log.clone()).execute().await;

		assert_eq!(result.unwrap(), 8);
		assert_eq!(
			*log.lock().unwrap(),
			vec!["ipfs", "transaction", "transactionStatus"]
		);
	}

	#[tokio::test]
	async fn test_failed_stage_halts_later_stages() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let transaction_ran = Arc::new(AtomicBool::new(false));
		let flag = transaction_ran.clone();
		let operation = Operation::new(
			"test",
			async { Err(AlloError::upload("pinning service unavailable")) },
			move |_cid| async move {
				flag.store(true, Ordering::SeqCst);
				Ok(TxHash::ZERO)
			},
			|tx_hash| async move { Ok(receipt(tx_hash)) },
			|receipt| receipt.block_number,
		);

		let err = recorder(operation, log.clone()).execute().await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Upload);
		assert!(!transaction_ran.load(Ordering::SeqCst));
		assert_eq!(*log.lock().unwrap(), vec!["ipfs"]);
	}

	#[tokio::test]
	async fn test_confirmation_error_is_emitted_and_returned() {
		let statuses = Arc::new(Mutex::new(Vec::new()));
		let seen = statuses.clone();
		let operation = Operation::new(
			"test",
			async { Ok("cid".to_string()) },
			|_cid| async { Ok(TxHash::ZERO) },
			|_tx_hash| async { Err(AlloError::wait("dropped")) },
			|receipt| receipt.block_number,
		)
		.on_transaction_status(move |result| {
			seen.lock().unwrap().push(result.as_ref().map_err(|e| e.kind()).err())
		});

		let err = operation.execute().await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Wait);
		assert_eq!(*statuses.lock().unwrap(), vec![Some(ErrorKind::Wait)]);
	}

	#[tokio::test]
	async fn test_nothing_runs_before_execute() {
		let started = Arc::new(AtomicBool::new(false));
		let flag = started.clone();
		let operation = Operation::new(
			"test",
			async move {
				flag.store(true, Ordering::SeqCst);
				Ok("cid".to_string())
			},
			|_cid| async { Ok(TxHash::ZERO) },
			|tx_hash| async move { Ok(receipt(tx_hash)) },
			|_receipt| (),
		);

		assert!(!started.load(Ordering::SeqCst));
		operation.execute().await.unwrap();
		assert!(started.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn test_dropping_execute_abandons_remaining_stages() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let confirmation_ran = Arc::new(AtomicBool::new(false));
		let flag = confirmation_ran.clone();
		let operation = Operation::new(
			"test",
			async { Ok("cid".to_string()) },
			|_cid| futures::future::pending(),
			move |tx_hash| async move {
				flag.store(true, Ordering::SeqCst);
				Ok(receipt(tx_hash))
			},
			|receipt| receipt.block_number,
		);

		let execution = recorder(operation, log.clone()).execute();
		let timed_out =
			tokio::time::timeout(std::time::Duration::from_millis(50), execution).await;

		assert!(timed_out.is_err());
		assert!(!confirmation_ran.load(Ordering::SeqCst));
		assert_eq!(*log.lock().unwrap(), vec!["ipfs"]);
	}
}
