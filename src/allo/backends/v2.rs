//! Allo v2 backend.
//!
//! Projects are profiles in the shared `Registry`, identified by a 32-byte profile id and
//! represented on chain by an anchor contract. Rounds are pools of the core `Allo` contract;
//! applying registers the profile's anchor as a recipient with the pool's strategy.

use super::abi::IPFS_PROTOCOL;
use super::abi::v2::{Allo as AlloCore, Metadata, RecipientStrategy, Registry};
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

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolValue;
use tracing::debug;

fn metadata(cid: String) -> Metadata {
	Metadata {
		protocol: U256::from(IPFS_PROTOCOL),
		pointer: cid,
	}
}

fn parse_pool_id(round_id: &str) -> AlloResult<U256> {
	round_id.trim().parse::<U256>().map_err(|e| {
		AlloError::validation(format!("Round id {} is not a pool id", round_id)).with_inner(e)
	})
}

/// Strategy registration payload: `abi.encode(address anchor, address recipient, Metadata)`.
pub fn registration_data(anchor: Address, recipient: Address, cid: String) -> Vec<u8> {
	(anchor, recipient, metadata(cid)).abi_encode_params()
}

/// Backend for the v2 registry and pool contracts.
#[derive(Clone)]
pub struct AlloV2 {
	chain: ChainId,
	registry: Address,
	allo: Address,
	collaborators: Collaborators,
}

impl AlloV2 {
	pub fn new(chain: ChainId, registry: Address, allo: Address, collaborators: Collaborators) -> Self {
		Self {
			chain,
			registry,
			allo,
			collaborators,
		}
	}

	pub fn chain(&self) -> ChainId {
		self.chain
	}
}

impl Allo for AlloV2 {
	fn create_project(&self, args: CreateProjectArgs) -> Operation<ProjectOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let (chain, registry) = (self.chain, self.registry);
		let name = args.name.clone();

		Operation::new(
			"createProject",
			async move {
				args.validate()?;
				let document = args.metadata.to_document(&args.name, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = Registry::createProfileCall {
					nonce: U256::from(rand::random::<u64>()),
					name,
					metadata: metadata(cid),
					owner: sender.address(),
					members: Vec::new(),
				};
				send_transaction(sender.as_ref(), registry, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			|receipt| {
				let event: Registry::ProfileCreated = decode_event_from_receipt(&receipt);
				debug!("Profile {} created with anchor {}", event.profileId, event.anchor);
				ProjectOutcome {
					project_id: event.profileId,
				}
			},
		)
	}

	fn update_project_metadata(&self, args: UpdateProjectMetadataArgs) -> Operation<ProjectOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let (chain, registry) = (self.chain, self.registry);
		let profile_id = args.project_id;

		Operation::new(
			"updateProjectMetadata",
			async move {
				args.validate()?;
				let document = args.metadata.to_document(&args.name, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = Registry::updateProfileMetadataCall {
					profileId: profile_id,
					metadata: metadata(cid),
				};
				send_transaction(sender.as_ref(), registry, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			|receipt| {
				let event: Registry::ProfileMetadataUpdated = decode_event_from_receipt(&receipt);
				ProjectOutcome {
					project_id: event.profileId,
				}
			},
		)
	}

	fn apply_to_round(&self, args: ApplyToRoundArgs) -> Operation<ApplicationOutcome> {
		let uploader = self.collaborators.uploader.clone();
		let sender = self.collaborators.transaction_sender.clone();
		let collaborators = self.collaborators.clone();
		let (chain, allo) = (self.chain, self.allo);

		let pool = parse_pool_id(&args.round_id);
		// Only read once the metadata stage has accepted `pool` and the anchor.
		let pool_id = pool.as_ref().copied().unwrap_or_default();
		let anchor = args.anchor_address.unwrap_or_default();
		let (project_id, recipient) = (args.project_id, args.recipient);

		Operation::new(
			"applyToRound",
			async move {
				args.validate()?;
				let pool = pool?;
				if args.anchor_address.is_none_or(|anchor| anchor.is_zero()) {
					return Err(AlloError::validation(
						"Applying to a v2 pool requires the profile anchor address",
					));
				}
				let document = args.to_document(&pool.to_string(), project_id, created_at())?;
				upload_metadata(uploader.as_ref(), &document).await
			},
			move |cid| async move {
				let call = AlloCore::registerRecipientCall {
					poolId: pool_id,
					data: registration_data(anchor, recipient, cid).into(),
				};
				send_transaction(sender.as_ref(), allo, &call).await
			},
			move |tx_hash| async move { confirm(&collaborators, chain, tx_hash).await },
			move |receipt| {
				let event: RecipientStrategy::Registered = decode_event_from_receipt(&receipt);
				ApplicationOutcome {
					project_id,
					application: ApplicationRef::Recipient(event.recipientId),
				}
			},
		)
	}
}
