//! Progress tracking for a single operation execution.
//!
//! The `OperationProgress` tracker walks the state machine `Pending → Running(stage) → Settled`,
//! records which channels have fired and enforces that they fire in stage order, at most once.

use super::events::Channel;

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle of an operation execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
	Pending,
	Running(Channel),
	Settled { success: bool },
}

/// Tracks one execution of an operation.
#[derive(Debug, Clone)]
pub struct OperationProgress {
	kind: &'static str,
	state: OperationState,
	/// Channels in the order they fired, with how long their stage took
	fired: Vec<(Channel, Duration)>,
	started_at: Option<Instant>,
	stage_started_at: Option<Instant>,
}

impl OperationProgress {
	pub fn new(kind: &'static str) -> Self {
		Self {
			kind,
			state: OperationState::Pending,
			fired: Vec::new(),
			started_at: None,
			stage_started_at: None,
		}
	}

	pub fn state(&self) -> OperationState {
		self.state
	}

	/// Channels fired so far, in order.
	pub fn fired(&self) -> Vec<Channel> {
		self.fired.iter().map(|(channel, _)| *channel).collect()
	}

	/// Enter the stage reporting on `channel`.
	///
	/// # Panics
	///
	/// Panics when the stage would run out of order, twice, or after settling.
	pub fn begin(&mut self, channel: Channel) {
		assert!(
			!matches!(self.state, OperationState::Settled { .. }),
			"{} operation already settled, cannot start {}",
			self.kind,
			channel
		);
		if let Some((last, _)) = self.fired.last() {
			assert!(
				*last < channel,
				"{} operation ran {} after {}",
				self.kind,
				channel,
				last
			);
		}

		let now = Instant::now();
		self.started_at.get_or_insert(now);
		self.stage_started_at = Some(now);
		self.state = OperationState::Running(channel);
		debug!("{} operation: running {} stage", self.kind, channel);
	}

	/// Record that the running stage produced its result.
	pub fn record(&mut self, channel: Channel, is_error: bool) {
		assert_eq!(
			self.state,
			OperationState::Running(channel),
			"{} operation recorded {} outside its stage",
			self.kind,
			channel
		);

		let elapsed = self
			.stage_started_at
			.map(|started| started.elapsed())
			.unwrap_or_default();
		self.fired.push((channel, elapsed));

		if is_error {
			warn!("{} operation: {} stage failed after {:?}", self.kind, channel, elapsed);
		} else {
			debug!("{} operation: {} stage done in {:?}", self.kind, channel, elapsed);
		}
	}

	/// Move to the terminal state. Later calls to `begin` panic.
	pub fn settle(&mut self, success: bool) {
		self.state = OperationState::Settled { success };
		info!("{}", self.summary());
	}

	/// Get a human-readable summary of the execution
	pub fn summary(&self) -> String {
		let total = self
			.started_at
			.map(|started| started.elapsed())
			.unwrap_or_default();
		let stages = self
			.fired
			.iter()
			.map(|(channel, elapsed)| format!("{} {:?}", channel, elapsed))
			.collect::<Vec<_>>()
			.join(", ");
		let outcome = match self.state {
			OperationState::Settled { success: true } => "succeeded",
			OperationState::Settled { success: false } => "failed",
			_ => "in progress",
		};
		format!("{} operation {} in {:?} [{}]", self.kind, outcome, total, stages)
	}
}
