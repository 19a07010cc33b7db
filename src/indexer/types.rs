//! Types for the indexer sync integration

use serde::{Deserialize, Serialize};

/// The confirmed state the indexer has to catch up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerSyncTarget {
	pub chain_id: u64,
	pub block_number: u64,
}

/// Progress of one indexer subscription for a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatus {
	#[serde(rename = "chainId")]
	pub chain_id: u64,
	/// The indexer reports block heights as decimal strings (GraphQL BigInt).
	#[serde(rename = "indexedToBlock")]
	pub indexed_to_block: String,
}

impl SubscriptionStatus {
	pub fn indexed_to_block(&self) -> Result<u64, IndexerError> {
		self.indexed_to_block.parse().map_err(|_| {
			IndexerError::GraphQLError(format!(
				"indexedToBlock is not a block number: {}",
				self.indexed_to_block
			))
		})
	}
}

/// Lowest block every subscription of the chain has indexed, if any subscription exists.
pub fn lowest_indexed_block(subscriptions: &[SubscriptionStatus]) -> Result<Option<u64>, IndexerError> {
	let mut lowest: Option<u64> = None;
	for subscription in subscriptions {
		let block = subscription.indexed_to_block()?;
		lowest = Some(lowest.map_or(block, |current| current.min(block)));
	}
	Ok(lowest)
}

/// Error types for indexer queries
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
	#[error("GraphQL error: {0}")]
	GraphQLError(String),

	#[error("No data returned")]
	NoData,

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Indexed to block {indexed:?}, waiting for {target}")]
	NotSynced { indexed: Option<u64>, target: u64 },
}

impl IndexerError {
	/// Errors no amount of polling recovers from: the indexer answered, but not with what the
	/// query expects.
	pub fn is_permanent(&self) -> bool {
		matches!(
			self,
			IndexerError::GraphQLError(_) | IndexerError::NoData | IndexerError::JsonError(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status(block: &str) -> SubscriptionStatus {
		SubscriptionStatus {
			chain_id: 10,
			indexed_to_block: block.to_string(),
		}
	}

	#[test]
	fn test_lowest_indexed_block_takes_minimum() {
		let lowest = lowest_indexed_block(&[status("120"), status("98"), status("300")]).unwrap();
		assert_eq!(lowest, Some(98));
	}

	#[test]
	fn test_lowest_indexed_block_empty() {
		assert_eq!(lowest_indexed_block(&[]).unwrap(), None);
	}

	#[test]
	fn test_non_numeric_block_is_an_error() {
		let err = lowest_indexed_block(&[status("latest")]).unwrap_err();
		assert!(err.is_permanent());
	}

	#[test]
	fn test_query_errors_are_permanent() {
		assert!(IndexerError::GraphQLError("unknown field".to_string()).is_permanent());
		assert!(IndexerError::NoData.is_permanent());
		assert!(
			IndexerError::JsonError(serde_json::from_str::<u64>("x").unwrap_err()).is_permanent()
		);
	}

	#[test]
	fn test_lagging_indexer_is_retried() {
		let err = IndexerError::NotSynced {
			indexed: Some(90),
			target: 100,
		};
		assert!(!err.is_permanent());
	}
}
