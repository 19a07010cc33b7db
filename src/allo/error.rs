//! Error types shared by every stage of an Allo operation.

use std::fmt;
use thiserror::Error;

/// Boxed underlying cause carried by an [`AlloError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a stage or of a whole operation.
pub type AlloResult<T> = Result<T, AlloError>;

/// Which part of the pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Caller-supplied input was rejected before anything was uploaded
	Validation,
	/// Metadata could not be persisted to the content store
	Upload,
	/// A protocol call could not be encoded
	Encoding,
	/// The network refused the transaction
	Send,
	/// The transaction never reached a confirmed state
	Wait,
	/// The indexer did not observe the confirmed state in time
	Sync,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ErrorKind::Validation => "Validation",
			ErrorKind::Upload => "Upload",
			ErrorKind::Encoding => "Encoding",
			ErrorKind::Send => "Send",
			ErrorKind::Wait => "Wait",
			ErrorKind::Sync => "Sync",
		};
		f.write_str(name)
	}
}

/// Error surfaced on an operation channel.
///
/// Wraps whatever failed underneath (HTTP, RPC, ABI encoding) behind a message and an
/// optional inner cause, so collaborator error types never cross the facade.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct AlloError {
	kind: ErrorKind,
	message: String,
	#[source]
	inner: Option<BoxError>,
}

impl AlloError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			inner: None,
		}
	}

	/// Attach the underlying cause.
	pub fn with_inner(mut self, inner: impl Into<BoxError>) -> Self {
		self.inner = Some(inner.into());
		self
	}

	pub fn validation(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Validation, message)
	}

	pub fn upload(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Upload, message)
	}

	pub fn encoding(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Encoding, message)
	}

	pub fn send(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Send, message)
	}

	pub fn wait(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Wait, message)
	}

	pub fn sync(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Sync, message)
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
		self.inner.as_deref()
	}
}

/// Deployment-time mistakes. Returned from setup functions only, never on a channel.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Unknown Allo version: {0}")]
	UnknownVersion(String),

	#[error("Unsupported chain id: {0}")]
	UnsupportedChain(u64),

	#[error("Missing configuration value: {0}")]
	Missing(String),

	#[error("Invalid configuration value for {key}: {reason}")]
	Invalid { key: String, reason: String },
}
