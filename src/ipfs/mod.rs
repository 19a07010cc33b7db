//! Content-addressed metadata storage.
//!
//! The pipeline persists every metadata document through an `Uploader` before a transaction
//! references it. `PinataUploader` pins JSON documents to IPFS through the Pinata HTTP API.

use crate::allo::error::{AlloError, AlloResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Persists a JSON document and returns its content identifier.
///
/// Implementations must be safe for the caller to retry; the pipeline itself never retries.
#[async_trait]
pub trait Uploader: Send + Sync {
	async fn upload(&self, content: &Value) -> AlloResult<String>;
}

/// Error types for the Pinata HTTP API
#[derive(Debug, Error)]
pub enum UploadError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("Pinata returned status {status}: {body}")]
	Status { status: u16, body: String },
}

/// Connection settings for Pinata
#[derive(Debug, Clone)]
pub struct PinataConfig {
	/// API base, e.g. `https://api.pinata.cloud`
	pub api_url: String,
	/// JWT used as bearer token
	pub jwt: String,
	/// Request timeout
	pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
	#[serde(rename = "IpfsHash")]
	ipfs_hash: String,
}

/// Uploader pinning JSON documents through Pinata
#[derive(Clone)]
pub struct PinataUploader {
	http_client: Client,
	config: PinataConfig,
}

impl PinataUploader {
	pub fn new(config: PinataConfig) -> Result<Self, UploadError> {
		let http_client = Client::builder().timeout(config.timeout).build()?;
		Ok(Self {
			http_client,
			config,
		})
	}

	fn endpoint(&self) -> String {
		format!(
			"{}/pinning/pinJSONToIPFS",
			self.config.api_url.trim_end_matches('/')
		)
	}

	/// Request body Pinata expects: the document plus a pin name.
	fn request_body(content: &Value) -> Value {
		json!({
			"pinataMetadata": {
				"name": "allo-metadata",
			},
			"pinataContent": content,
		})
	}

	async fn pin(&self, content: &Value) -> Result<String, UploadError> {
		let response = self
			.http_client
			.post(self.endpoint())
			.bearer_auth(&self.config.jwt)
			.json(&Self::request_body(content))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(UploadError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let pinned: PinResponse = response.json().await?;
		Ok(pinned.ipfs_hash)
	}
}

#[async_trait]
impl Uploader for PinataUploader {
	async fn upload(&self, content: &Value) -> AlloResult<String> {
		debug!("Pinning metadata document to {}", self.endpoint());
		let cid = self.pin(content).await.map_err(|e| {
			AlloError::upload(format!("Failed to upload metadata: {}", e)).with_inner(e)
		})?;
		info!("Pinned metadata as {}", cid);
		Ok(cid)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allo::error::ErrorKind;

	fn uploader(api_url: &str) -> PinataUploader {
		PinataUploader::new(PinataConfig {
			api_url: api_url.to_string(),
			jwt: "jwt".to_string(),
			timeout: Duration::from_secs(5),
		})
		.expect("client builds")
	}

	#[test]
	fn test_endpoint_strips_trailing_slash() {
		assert_eq!(
			uploader("https://api.pinata.cloud/").endpoint(),
			"https://api.pinata.cloud/pinning/pinJSONToIPFS"
		);
	}

	#[test]
	fn test_request_body_wraps_content() {
		let content = json!({ "title": "X" });
		let body = PinataUploader::request_body(&content);
		assert_eq!(body["pinataContent"], content);
		assert_eq!(body["pinataMetadata"]["name"], "allo-metadata");
	}

	#[test]
	fn test_pin_response_parses_ipfs_hash() {
		let parsed: PinResponse = serde_json::from_str(
			r#"{"IpfsHash":"bafkreih","PinSize":12,"Timestamp":"2024-01-01T00:00:00Z"}"#,
		)
		.unwrap();
		assert_eq!(parsed.ipfs_hash, "bafkreih");
	}

	#[tokio::test]
	async fn test_unreachable_api_is_an_upload_error() {
		let err = uploader("http://127.0.0.1:1")
			.upload(&json!({ "title": "X" }))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Upload);
		assert!(err.message().starts_with("Failed to upload metadata"));
		assert!(err.inner().is_some());
	}
}
