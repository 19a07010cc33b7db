//!
//! GraphQL client tracking how far the grants indexer has progressed.
//!
//! The indexer exposes one subscription per chain and contract set, each reporting the block it
//! has indexed up to. Waiting for sync means polling those subscriptions, with exponential
//! backoff, until every one of them has passed the target block.

use super::types::*;
use super::IndexerSync;
use crate::allo::error::{AlloError, AlloResult};

use async_trait::async_trait;
use backoff::{ExponentialBackoff, future::retry};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

const SUBSCRIPTIONS_QUERY: &str = r#"
    query IndexedToBlock($chainId: Int!) {
        subscriptions(filter: { chainId: { equalTo: $chainId }, toBlock: { equalTo: "latest" } }) {
            chainId
            indexedToBlock
        }
    }
"#;

/// Polling settings for indexer sync
#[derive(Debug, Clone)]
pub struct IndexerSyncConfig {
	/// First delay between polls
	pub initial_interval: Duration,
	/// Upper bound on the delay between polls
	pub max_interval: Duration,
	/// Give up after this long
	pub timeout: Duration,
}

impl Default for IndexerSyncConfig {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_millis(500),
			max_interval: Duration::from_secs(5),
			timeout: Duration::from_secs(120),
		}
	}
}

/// Indexer sync waiter backed by the indexer GraphQL HTTP endpoint
#[derive(Clone)]
pub struct GraphqlIndexerSync {
	/// The underlying HTTP client for GraphQL queries.
	http_client: Client,
	/// The indexer GraphQL HTTP endpoint.
	indexer_url: String,
	config: IndexerSyncConfig,
}

impl GraphqlIndexerSync {
	/// Create a new indexer sync waiter.
	///
	/// # Arguments
	/// * `indexer_url` - The HTTP endpoint for GraphQL queries.
	/// * `config` - Polling intervals and overall timeout.
	pub fn new(indexer_url: String, config: IndexerSyncConfig) -> Result<Self, IndexerError> {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()?;

		Ok(Self {
			http_client,
			indexer_url,
			config,
		})
	}

	/// Execute a GraphQL query and return the raw response document.
	async fn execute_query(&self, query: &str, variables: Option<Value>) -> Result<Value, IndexerError> {
		let mut request_body = json!({ "query": query });
		if let Some(vars) = variables {
			request_body["variables"] = vars;
		}

		let response = self
			.http_client
			.post(&self.indexer_url)
			.json(&request_body)
			.send()
			.await?;

		let response_json: Value = response.json().await?;

		if let Some(errors) = response_json.get("errors") {
			return Err(IndexerError::GraphQLError(errors.to_string()));
		}

		Ok(response_json)
	}

	/// Fetch the subscriptions of a chain.
	pub async fn subscriptions(&self, chain_id: u64) -> Result<Vec<SubscriptionStatus>, IndexerError> {
		let response = self
			.execute_query(SUBSCRIPTIONS_QUERY, Some(json!({ "chainId": chain_id })))
			.await?;

		let subscriptions = response
			.get("data")
			.and_then(|data| data.get("subscriptions"))
			.ok_or(IndexerError::NoData)?;

		Ok(serde_json::from_value(subscriptions.clone())?)
	}

	async fn check_synced(&self, target: IndexerSyncTarget) -> Result<u64, IndexerError> {
		let subscriptions = self.subscriptions(target.chain_id).await?;
		match lowest_indexed_block(&subscriptions)? {
			Some(indexed) if indexed >= target.block_number => Ok(indexed),
			indexed => Err(IndexerError::NotSynced {
				indexed,
				target: target.block_number,
			}),
		}
	}

	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			initial_interval: self.config.initial_interval,
			max_interval: self.config.max_interval,
			max_elapsed_time: Some(self.config.timeout),
			..ExponentialBackoff::default()
		}
	}
}

#[async_trait]
impl IndexerSync for GraphqlIndexerSync {
	async fn wait_until_synced(&self, target: IndexerSyncTarget) -> AlloResult<()> {
		debug!(
			"Waiting for indexer to reach block {} on chain {}",
			target.block_number, target.chain_id
		);

		let indexed = retry(self.backoff(), || async {
			self.check_synced(target).await.map_err(|e| {
				if e.is_permanent() {
					backoff::Error::permanent(e)
				} else {
					debug!("Indexer not ready yet: {}", e);
					backoff::Error::transient(e)
				}
			})
		})
		.await
		.map_err(|e| {
			warn!("Indexer did not sync to block {}: {}", target.block_number, e);
			AlloError::sync(format!(
				"Indexer did not reach block {} on chain {}: {}",
				target.block_number, target.chain_id, e
			))
			.with_inner(e)
		})?;

		info!(
			"Indexer synced to block {} (target {}) on chain {}",
			indexed, target.block_number, target.chain_id
		);
		Ok(())
	}
}
