//! Allo v1 backend.
//!
//! Projects live in a per-chain `ProjectRegistry` and are numbered by it. Every round is its own
//! contract, addressed directly, which records applications under a project id qualified by the
//! chain and registry the project was created in.

use super::abi::IPFS_PROTOCOL;
use super::abi::v1::{MetaPtr, ProjectRegistry, RoundImplementation};
use super::{
	ApplicationOutcome, ApplicationRef, Collaborators, ProjectOutcome, confirm, created_at,
	upload_metadata,
};
use crate::allo::Allo;
use crate::allo::addresses::ChainId;
use crate::allo::error::{AlloError, AlloResult};
use crate::allo::metadata::{ApplyToRoundArgs, CreateProjectArgs, UpdateProjectMetadataArgs};
use crate::allo::operation::Operation;
use crate::transaction::{decode_event_from_receipt, send_transaction};

use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::sol_types::SolValue;
use tracing::debug;

fn meta_ptr(cid: String) -> MetaPtr {
	MetaPtr {
		protocol: U256::from(IPFS_PROTOCOL),
		pointer: cid,
	}
}

fn project_number(project_id: B256) -> U256 {
	U256::from_be_bytes(project_id.0)
}

fn project_id_of(project_number: U256) -> B256 {
	B256::from(project_number.to_be_bytes::<32>())
}

/// The id a v1 round records an application of `project_id` under.
///
/// `keccak256(abi.encodePacked(uint256 chainId, address registry, uint256 projectId))`
pub fn application_project_id(chain: ChainId, project_registry: Address, project_id: B256) -> B256 {
	keccak256((U256::from(chain.id()), project_registry, project_number(project_id)).abi_encode_packed())
}

fn parse_round_address(round_id: &str) -> AlloResult<Address> {
	round_id.trim().parse::<Address>().map_err(|e| {
		AlloError::validation(format!("Round id {} is not a round address", round_id)).with_inner(e)
	})
}

/// Backend for the v1 project registry and round contracts.
#[derive(Clone)]
pub struct AlloV1 {
	chain: ChainId,
	project_registry: Address,
	collaborators: Collaborators,
}

impl AlloV1 {
	pub fn new(chain: ChainId, project_registry: Address, collaborators: Collaborators) -> Self {
		Self {
			chain,
			project_registry,
			collaborators,
		}
	}

	pub fn chain(&self) -> ChainId {
		self.chain
	}
}

impl Allo for AlloV1 {
	fn create_project(&self, args: CreateProjectArgs) -> Operation<ProjectOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let (chain, registry) = (self.chain, self.project_registry);

		Operation::new(
			"createProject",
			async move {
				args.validate()?;
				let document = args.metadata.to_document(&args.name, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = ProjectRegistry::createProjectCall {
					metadata: meta_ptr(cid),
				};
				send_transaction(sender.as_ref(), registry, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			|receipt| {
				let event: ProjectRegistry::ProjectCreated = decode_event_from_receipt(&receipt);
				debug!("Project {} created by {}", event.projectID, event.owner);
				ProjectOutcome {
					project_id: project_id_of(event.projectID),
				}
			},
		)
	}

	fn update_project_metadata(&self, args: UpdateProjectMetadataArgs) -> Operation<ProjectOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let (chain, registry) = (self.chain, self.project_registry);
		let project = project_number(args.project_id);

		Operation::new(
			"updateProjectMetadata",
			async move {
				args.validate()?;
				let document = args.metadata.to_document(&args.name, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = ProjectRegistry::updateProjectMetadataCall {
					projectID: project,
					metadata: meta_ptr(cid),
				};
				send_transaction(sender.as_ref(), registry, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			|receipt| {
				let event: ProjectRegistry::MetadataUpdated = decode_event_from_receipt(&receipt);
				ProjectOutcome {
					project_id: project_id_of(event.projectID),
				}
			},
		)
	}

	fn apply_to_round(&self, args: ApplyToRoundArgs) -> Operation<ApplicationOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let chain = self.chain;

		let round = parse_round_address(&args.round_id);
		// Only read once the metadata stage has accepted `round`.
		let round_address = round.as_ref().copied().unwrap_or_default();
		let project_id = application_project_id(chain, self.project_registry, args.project_id);

		Operation::new(
			"applyToRound",
			async move {
				args.validate()?;
				let round = round?;
				let reference = format!("{}:{}", args.chain_name, round);
				let document = args.to_document(&reference, project_id, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = RoundImplementation::applyToRoundCall {
					projectID: project_id,
					newApplicationMetaPtr: meta_ptr(cid),
				};
				send_transaction(sender.as_ref(), round_address, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			move |receipt| {
				let event: RoundImplementation::NewProjectApplication =
					decode_event_from_receipt(&receipt);
				ApplicationOutcome {
					project_id,
					application: ApplicationRef::Index(event.applicationIndex),
				}
			},
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allo::backends::test_utils::*;
	use crate::allo::error::ErrorKind;
	use alloy::sol_types::SolCall;
	use std::sync::{Arc, Mutex};

	fn created(project: u64) -> ProjectRegistry::ProjectCreated {
		ProjectRegistry::ProjectCreated {
			projectID: U256::from(project),
			owner: Address::ZERO,
		}
	}

	#[tokio::test]
	async fn test_create_project_reports_every_stage() {
		let ctx = TestContext::new();
		ctx.sender.push_receipt_logs(vec![log_of(&created(42))]);
		let seen = Arc::new(Mutex::new(Vec::new()));
		let (ipfs, transaction) = (seen.clone(), seen.clone());

		let result = ctx
			.allo_v1()
			.create_project(create_project_args())
			.on_ipfs(move |cid| ipfs.lock().unwrap().push(cid.as_ref().unwrap().clone()))
			.on_transaction(move |hash| {
				transaction.lock().unwrap().push(hash.as_ref().unwrap().to_string())
			})
			.execute()
			.await
			.unwrap();

		assert_eq!(result.project_id, project_id_of(U256::from(42)));
		assert_eq!(
			*seen.lock().unwrap(),
			vec!["ipfsHash".to_string(), ZERO_TX_HASH.to_string()]
		);
	}

	#[tokio::test]
	async fn test_create_project_encodes_registry_call() {
		let ctx = TestContext::new();
		ctx.sender.push_receipt_logs(vec![log_of(&created(1))]);

		ctx.allo_v1()
			.create_project(create_project_args())
			.execute()
			.await
			.unwrap();

		let sent = ctx.sender.sent_transactions();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].to, PROJECT_REGISTRY);
		let call = ProjectRegistry::createProjectCall::abi_decode(&sent[0].data).unwrap();
		assert_eq!(call.metadata, meta_ptr("ipfsHash".to_string()));

		let document = &ctx.uploader.documents()[0];
		assert_eq!(document["title"], "My Project");
		assert_eq!(document["description"], "A public good");
	}

	#[tokio::test]
	async fn test_update_project_metadata_targets_project_number() {
		let ctx = TestContext::new();
		let project_id = project_id_of(U256::from(7));
		ctx.sender
			.push_receipt_logs(vec![log_of(&ProjectRegistry::MetadataUpdated {
				projectID: U256::from(7),
				metaPtr: meta_ptr("ipfsHash".to_string()),
			})]);

		let result = ctx
			.allo_v1()
			.update_project_metadata(update_project_args(project_id))
			.execute()
			.await
			.unwrap();

		assert_eq!(result.project_id, project_id);
		let sent = ctx.sender.sent_transactions();
		let call = ProjectRegistry::updateProjectMetadataCall::abi_decode(&sent[0].data).unwrap();
		assert_eq!(call.projectID, U256::from(7));
	}

	#[tokio::test]
	async fn test_apply_to_round_sends_to_round_contract() {
		let ctx = TestContext::new();
		let project_id = project_id_of(U256::from(3));
		let expected_id = application_project_id(CHAIN, PROJECT_REGISTRY, project_id);
		ctx.sender
			.push_receipt_logs(vec![log_of(&RoundImplementation::NewProjectApplication {
				projectID: expected_id,
				applicationIndex: U256::from(5),
				applicationMetaPtr: meta_ptr("ipfsHash".to_string()),
			})]);

		let result = ctx
			.allo_v1()
			.apply_to_round(apply_args(project_id, &ROUND.to_string()))
			.execute()
			.await
			.unwrap();

		assert_eq!(
			result,
			ApplicationOutcome {
				project_id: expected_id,
				application: ApplicationRef::Index(U256::from(5)),
			}
		);

		let sent = ctx.sender.sent_transactions();
		assert_eq!(sent[0].to, ROUND);
		let call = RoundImplementation::applyToRoundCall::abi_decode(&sent[0].data).unwrap();
		assert_eq!(call.projectID, expected_id);

		let application = &ctx.uploader.documents()[0]["application"];
		assert_eq!(application["round"], format!("mainnet:{}", ROUND));
		assert_eq!(application["projectId"], expected_id.to_string());
	}

	#[tokio::test]
	async fn test_apply_to_round_rejects_non_address_round() {
		let ctx = TestContext::new();
		let errors = Arc::new(Mutex::new(Vec::new()));
		let seen = errors.clone();

		let err = ctx
			.allo_v1()
			.apply_to_round(apply_args(B256::ZERO, "12"))
			.on_ipfs(move |cid| seen.lock().unwrap().push(cid.as_ref().unwrap_err().kind()))
			.execute()
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Validation);
		assert_eq!(*errors.lock().unwrap(), vec![ErrorKind::Validation]);
		assert_eq!(ctx.uploader.calls(), 0);
		assert!(ctx.sender.sent_transactions().is_empty());
	}

	#[test]
	fn test_application_project_id_packs_chain_registry_and_project() {
		let project_id = project_id_of(U256::from(3));
		let mut packed = Vec::new();
		packed.extend_from_slice(&U256::from(1).to_be_bytes::<32>());
		packed.extend_from_slice(PROJECT_REGISTRY.as_slice());
		packed.extend_from_slice(project_id.as_slice());

		assert_eq!(
			application_project_id(ChainId::Mainnet, PROJECT_REGISTRY, project_id),
			keccak256(&packed)
		);
		assert_ne!(
			application_project_id(ChainId::Sepolia, PROJECT_REGISTRY, project_id),
			keccak256(&packed)
		);
	}
}
