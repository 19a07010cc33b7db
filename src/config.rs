//! Application configuration loaded from environment variables.

use crate::allo::AlloVersion;
use crate::allo::addresses::ChainId;
use crate::allo::error::ConfigError;

use alloy::signers::local::PrivateKeySigner;
use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

#[derive(Clone)]
pub struct Config {
	/// Protocol version tag, `allo-v1` or `allo-v2`
	pub version: AlloVersion,
	pub chain: ChainId,
	/// JSON-RPC endpoint of the chain
	pub rpc_url: Url,
	/// Key transactions are signed with
	pub signer: PrivateKeySigner,
	/// JWT for the Pinata pinning API
	pub pinata_jwt: String,
	pub pinata_api_url: String,
	/// Indexer GraphQL endpoint. Without it operations do not wait for the indexer.
	pub indexer_url: Option<String>,
	pub confirmation_timeout: Duration,
	pub indexer_sync_timeout: Duration,
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("version", &self.version)
			.field("chain", &self.chain)
			.field("rpc_url", &self.rpc_url.as_str())
			.field("signer", &self.signer.address())
			.field("pinata_api_url", &self.pinata_api_url)
			.field("indexer_url", &self.indexer_url)
			.field("confirmation_timeout", &self.confirmation_timeout)
			.field("indexer_sync_timeout", &self.indexer_sync_timeout)
			.finish_non_exhaustive()
	}
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Build the configuration from any key/value source.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		let required = |key: &str| var(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

		let chain_id: u64 = parse("CHAIN_ID", &required("CHAIN_ID")?)?;
		let rpc_url = required("RPC_URL")?;

		Ok(Config {
			version: required("ALLO_VERSION")?.parse()?,
			chain: ChainId::try_from(chain_id)?,
			rpc_url: Url::parse(&rpc_url).map_err(|e| invalid("RPC_URL", e))?,
			signer: parse("PRIVATE_KEY", &required("PRIVATE_KEY")?)?,
			pinata_jwt: required("PINATA_JWT")?,
			pinata_api_url: var("PINATA_API_URL")
				.unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
			indexer_url: var("INDEXER_URL"),
			confirmation_timeout: Duration::from_secs(
				var("CONFIRMATION_TIMEOUT_SECS")
					.map(|value| parse("CONFIRMATION_TIMEOUT_SECS", &value))
					.transpose()?
					.unwrap_or(300),
			),
			indexer_sync_timeout: Duration::from_secs(
				var("INDEXER_SYNC_TIMEOUT_SECS")
					.map(|value| parse("INDEXER_SYNC_TIMEOUT_SECS", &value))
					.transpose()?
					.unwrap_or(120),
			),
		})
	}
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: fmt::Display,
{
	value.trim().parse().map_err(|e| invalid(key, e))
}

fn invalid(key: &str, reason: impl fmt::Display) -> ConfigError {
	ConfigError::Invalid {
		key: key.to_string(),
		reason: reason.to_string(),
	}
}
