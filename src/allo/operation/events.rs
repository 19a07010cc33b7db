//! Progress channels of an operation.
//!
//! Every operation reports on a fixed, closed set of channels, one per stage. Each completed
//! stage produces exactly one `OperationEvent` carrying that stage's result, which the
//! `EventDispatcher` hands to every registered handler before the next stage starts.

use crate::allo::error::{AlloResult, BoxError};
use crate::transaction::TransactionReceipt;

use alloy::primitives::TxHash;
use std::fmt;

/// Named progress channel, in stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
	/// Metadata stored in the content-addressed store
	Ipfs,
	/// Transaction submitted
	Transaction,
	/// Transaction confirmed (and indexed, when an indexer is configured)
	TransactionStatus,
}

impl Channel {
	pub const ALL: [Channel; 3] = [Channel::Ipfs, Channel::Transaction, Channel::TransactionStatus];

	pub fn name(self) -> &'static str {
		match self {
			Channel::Ipfs => "ipfs",
			Channel::Transaction => "transaction",
			Channel::TransactionStatus => "transactionStatus",
		}
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Result of one stage, tagged with its channel
#[derive(Debug)]
pub enum OperationEvent<'a> {
	/// Content identifier of the uploaded metadata
	Ipfs(&'a AlloResult<String>),
	/// Hash of the submitted transaction
	Transaction(&'a AlloResult<TxHash>),
	/// Receipt of the confirmed transaction
	TransactionStatus(&'a AlloResult<TransactionReceipt>),
}

impl OperationEvent<'_> {
	pub fn channel(&self) -> Channel {
		match self {
			OperationEvent::Ipfs(_) => Channel::Ipfs,
			OperationEvent::Transaction(_) => Channel::Transaction,
			OperationEvent::TransactionStatus(_) => Channel::TransactionStatus,
		}
	}

	pub fn is_error(&self) -> bool {
		match self {
			OperationEvent::Ipfs(result) => result.is_err(),
			OperationEvent::Transaction(result) => result.is_err(),
			OperationEvent::TransactionStatus(result) => result.is_err(),
		}
	}
}

/// Trait for handling operation events.
///
/// Implementors receive every event of the operation they are registered on.
#[async_trait::async_trait]
pub trait OperationEventHandler: Send {
	/// Handle an operation event.
	///
	/// A failing handler is logged and does not affect the operation.
	async fn handle(&mut self, event: &OperationEvent<'_>) -> Result<(), BoxError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Handler that forwards the events of one channel to a closure.
pub(crate) struct ChannelListener<F> {
	channel: Channel,
	callback: F,
}

impl<F> ChannelListener<F>
where
	F: FnMut(&OperationEvent<'_>) + Send,
{
	pub(crate) fn new(channel: Channel, callback: F) -> Self {
		Self { channel, callback }
	}
}

#[async_trait::async_trait]
impl<F> OperationEventHandler for ChannelListener<F>
where
	F: FnMut(&OperationEvent<'_>) + Send,
{
	async fn handle(&mut self, event: &OperationEvent<'_>) -> Result<(), BoxError> {
		if event.channel() == self.channel {
			(self.callback)(event);
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		self.channel.name()
	}
}

/// Event dispatcher that manages the handlers of one operation.
pub struct EventDispatcher {
	handlers: Vec<Box<dyn OperationEventHandler>>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self {
			handlers: Vec::new(),
		}
	}

	/// Register a new event handler.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Box<dyn OperationEventHandler>) {
		self.handlers.push(handler);
	}

	/// Number of registered handlers.
	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&mut self, event: &OperationEvent<'_>) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				tracing::error!(
					"Handler {} failed to process {} event: {}",
					handler.name(),
					event.channel(),
					e
				);
				// Continue processing with other handlers
			}
		}
	}
}

impl Default for EventDispatcher {
	fn default() -> Self {
		Self::new()
	}
}
