//! Shared fixtures for backend tests.

use super::{AlloV1, AlloV2, Collaborators};
use crate::allo::addresses::ChainId;
use crate::allo::error::{AlloError, AlloResult};
use crate::allo::metadata::{
	AnswerValue, ApplicationAnswer, ApplicationQuestion, ApplyToRoundArgs, CreateProjectArgs,
	ProjectMetadata, QuestionKind, RoundApplicationMetadata, UpdateProjectMetadataArgs,
};
use crate::allo::{Allo, AlloVersion};
use crate::indexer::{IndexerSync, IndexerSyncTarget};
use crate::ipfs::Uploader;
use crate::transaction::{MockTransactionSender, ReceiptLog};

use alloy::primitives::{Address, B256, TxHash, address};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub const CHAIN: ChainId = ChainId::Mainnet;
pub const PROJECT_REGISTRY: Address = address!("0x00000000000000000000000000000000000000a1");
pub const REGISTRY: Address = address!("0x00000000000000000000000000000000000000a2");
pub const ALLO: Address = address!("0x00000000000000000000000000000000000000a3");
pub const ROUND: Address = address!("0x00000000000000000000000000000000000000b1");
pub const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000c1");
pub const ANCHOR: Address = address!("0x00000000000000000000000000000000000000c2");
pub const ZERO_TX_HASH: TxHash = TxHash::ZERO;

/// Uploader answering every call with `ipfsHash`, or failing when told to.
#[derive(Default)]
pub struct MockUploader {
	documents: Mutex<Vec<Value>>,
	failure: Mutex<Option<String>>,
}

impl MockUploader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every later upload fails with `reason`.
	pub fn fail_with(&self, reason: &str) {
		*self.failure.lock().unwrap() = Some(reason.to_string());
	}

	pub fn documents(&self) -> Vec<Value> {
		self.documents.lock().unwrap().clone()
	}

	pub fn calls(&self) -> usize {
		self.documents.lock().unwrap().len()
	}
}

#[async_trait]
impl Uploader for MockUploader {
	async fn upload(&self, content: &Value) -> AlloResult<String> {
		self.documents.lock().unwrap().push(content.clone());
		match self.failure.lock().unwrap().as_ref() {
			Some(reason) => Err(AlloError::upload(reason.clone())),
			None => Ok("ipfsHash".to_string()),
		}
	}
}

/// Indexer reporting every target as synced, or failing when told to.
#[derive(Default)]
pub struct MockIndexerSync {
	targets: Mutex<Vec<IndexerSyncTarget>>,
	failure: Mutex<Option<String>>,
}

impl MockIndexerSync {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_with(&self, reason: &str) {
		*self.failure.lock().unwrap() = Some(reason.to_string());
	}

	pub fn targets(&self) -> Vec<IndexerSyncTarget> {
		self.targets.lock().unwrap().clone()
	}
}

#[async_trait]
impl IndexerSync for MockIndexerSync {
	async fn wait_until_synced(&self, target: IndexerSyncTarget) -> AlloResult<()> {
		self.targets.lock().unwrap().push(target);
		match self.failure.lock().unwrap().as_ref() {
			Some(reason) => Err(AlloError::sync(reason.clone())),
			None => Ok(()),
		}
	}
}

/// One set of mock collaborators and the backends wired to them.
pub struct TestContext {
	pub uploader: Arc<MockUploader>,
	pub sender: Arc<MockTransactionSender>,
	pub indexer: Arc<MockIndexerSync>,
}

impl TestContext {
	pub fn new() -> Self {
		Self {
			uploader: Arc::new(MockUploader::new()),
			sender: Arc::new(MockTransactionSender::new()),
			indexer: Arc::new(MockIndexerSync::new()),
		}
	}

	pub fn collaborators(&self) -> Collaborators {
		Collaborators {
			uploader: self.uploader.clone(),
			transaction_sender: self.sender.clone(),
			indexer_sync: Some(self.indexer.clone() as Arc<dyn IndexerSync>),
		}
	}

	pub fn allo_v1(&self) -> AlloV1 {
		AlloV1::new(CHAIN, PROJECT_REGISTRY, self.collaborators())
	}

	pub fn allo_v2(&self) -> AlloV2 {
		AlloV2::new(CHAIN, REGISTRY, ALLO, self.collaborators())
	}

	pub fn get_allo(&self, version: &str) -> Arc<dyn Allo> {
		match version.parse::<AlloVersion>() {
			Ok(AlloVersion::V1) => Arc::new(self.allo_v1()),
			Ok(AlloVersion::V2) => Arc::new(self.allo_v2()),
			Err(e) => panic!("{}", e),
		}
	}
}

/// Receipt log a chain would emit for `event`.
pub fn log_of<E: SolEvent>(event: &E) -> ReceiptLog {
	let data = event.encode_log_data();
	ReceiptLog {
		data: data.data.clone(),
		topics: data.topics().to_vec(),
	}
}

pub fn project_metadata() -> ProjectMetadata {
	ProjectMetadata {
		description: "A public good".to_string(),
		website: Some("https://example.org".to_string()),
		..Default::default()
	}
}

pub fn create_project_args() -> CreateProjectArgs {
	CreateProjectArgs {
		name: "My Project".to_string(),
		metadata: project_metadata(),
	}
}

pub fn update_project_args(project_id: B256) -> UpdateProjectMetadataArgs {
	UpdateProjectMetadataArgs {
		project_id,
		name: "My Project".to_string(),
		metadata: project_metadata(),
	}
}

/// Application with one required question answered. `round_id` is version-specific.
pub fn apply_args(project_id: B256, round_id: &str) -> ApplyToRoundArgs {
	ApplyToRoundArgs {
		project_id,
		round_id: round_id.to_string(),
		form_inputs: vec![ApplicationAnswer {
			question_id: 0,
			answer: AnswerValue::Text("hello@example.org".to_string()),
		}],
		project_metadata: project_metadata(),
		project_name: "My Project".to_string(),
		application_metadata: RoundApplicationMetadata {
			version: "2.0.0".to_string(),
			last_updated_on: 0,
			questions: vec![ApplicationQuestion {
				id: 0,
				title: "Email".to_string(),
				kind: QuestionKind::Email,
				required: true,
				hidden: true,
			}],
		},
		chain_name: "mainnet".to_string(),
		recipient: RECIPIENT,
		anchor_address: Some(ANCHOR),
	}
}

/// Application arguments with a round id in the format `version` expects.
pub fn apply_args_for(version: &str, project_id: B256) -> ApplyToRoundArgs {
	match version {
		"allo-v1" => apply_args(project_id, &ROUND.to_string()),
		_ => apply_args(project_id, "7"),
	}
}
