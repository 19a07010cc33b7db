//! Version-agnostic entry point to the Allo protocol.
//!
//! Callers hold an `Arc<dyn Allo>` chosen once at startup by [`create_allo`] and run the three
//! domain actions through it. Every action returns an [`Operation`] that reports on the `ipfs`,
//! `transaction` and `transactionStatus` channels and resolves to the action's final value.
//!
//! ```no_run
//! # use allo_operations::allo::{Allo, AlloVersion, AlloConfig, create_allo};
//! # use allo_operations::allo::metadata::{CreateProjectArgs, ProjectMetadata};
//! # async fn demo(config: AlloConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let allo = create_allo("allo-v2".parse::<AlloVersion>()?, config)?;
//! let outcome = allo
//!     .create_project(CreateProjectArgs {
//!         name: "My Project".to_string(),
//!         metadata: ProjectMetadata::default(),
//!     })
//!     .on_ipfs(|cid| println!("metadata: {:?}", cid))
//!     .on_transaction(|hash| println!("transaction: {:?}", hash))
//!     .on_transaction_status(|receipt| println!("confirmed: {:?}", receipt.is_ok()))
//!     .execute()
//!     .await?;
//! println!("project id {}", outcome.project_id);
//! # Ok(())
//! # }
//! ```

/// Supported chains and per-chain contract address tables
pub mod addresses;
/// Protocol backends
pub mod backends;
/// Error taxonomy
pub mod error;
/// Typed action inputs and metadata documents
pub mod metadata;
/// Multi-stage operation engine
pub mod operation;

pub use backends::{
	AlloV1, AlloV2, ApplicationOutcome, ApplicationRef, Collaborators, ProjectOutcome,
};
pub use error::{AlloError, AlloResult, ConfigError, ErrorKind};
pub use operation::Operation;

use addresses::{ChainId, ContractAddresses};
use metadata::{ApplyToRoundArgs, CreateProjectArgs, UpdateProjectMetadataArgs};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// The domain actions every protocol version supports.
///
/// Implementations are stateless across calls, so operations from one instance may run
/// concurrently.
pub trait Allo: Send + Sync {
	/// Register a new project. Resolves to the id the protocol assigned it.
	fn create_project(&self, args: CreateProjectArgs) -> Operation<ProjectOutcome>;

	/// Point an existing project at a new metadata document.
	fn update_project_metadata(&self, args: UpdateProjectMetadataArgs) -> Operation<ProjectOutcome>;

	/// Submit an application for a project to a round.
	fn apply_to_round(&self, args: ApplyToRoundArgs) -> Operation<ApplicationOutcome>;
}

/// Protocol version a deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlloVersion {
	V1,
	V2,
}

impl AlloVersion {
	pub fn tag(self) -> &'static str {
		match self {
			AlloVersion::V1 => "allo-v1",
			AlloVersion::V2 => "allo-v2",
		}
	}
}

impl fmt::Display for AlloVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

impl FromStr for AlloVersion {
	type Err = ConfigError;

	fn from_str(tag: &str) -> Result<Self, Self::Err> {
		match tag {
			"allo-v1" => Ok(AlloVersion::V1),
			"allo-v2" => Ok(AlloVersion::V2),
			other => Err(ConfigError::UnknownVersion(other.to_string())),
		}
	}
}

/// Everything a backend is built from. Read-only once the backend exists.
#[derive(Clone)]
pub struct AlloConfig {
	pub chain: ChainId,
	/// v1 `ProjectRegistry`
	pub project_registry: ContractAddresses,
	/// v2 `Registry`
	pub registry: ContractAddresses,
	/// v2 `Allo` core
	pub allo: ContractAddresses,
	pub collaborators: Collaborators,
}

impl AlloConfig {
	/// Configuration using the published deployments.
	pub fn new(chain: ChainId, collaborators: Collaborators) -> Self {
		Self {
			chain,
			project_registry: ContractAddresses::project_registry_v1(),
			registry: ContractAddresses::registry_v2(),
			allo: ContractAddresses::allo_v2(),
			collaborators,
		}
	}
}

fn deployed(table: &ContractAddresses, chain: ChainId) -> Result<(), ConfigError> {
	if table.is_deployed(chain) {
		Ok(())
	} else {
		Err(ConfigError::UnsupportedChain(chain.id()))
	}
}

/// Build the backend for `version`.
///
/// Fails when the version's contracts are not deployed on the configured chain. Nothing is sent
/// to any collaborator.
pub fn create_allo(version: AlloVersion, config: AlloConfig) -> Result<Arc<dyn Allo>, ConfigError> {
	let chain = config.chain;
	info!("Using {} on {} ({})", version, chain.name(), chain.id());

	let allo: Arc<dyn Allo> = match version {
		AlloVersion::V1 => {
			deployed(&config.project_registry, chain)?;
			Arc::new(AlloV1::new(
				chain,
				config.project_registry.get(chain),
				config.collaborators,
			))
		}
		AlloVersion::V2 => {
			deployed(&config.registry, chain)?;
			deployed(&config.allo, chain)?;
			Arc::new(AlloV2::new(
				chain,
				config.registry.get(chain),
				config.allo.get(chain),
				config.collaborators,
			))
		}
	};
	Ok(allo)
}

/// Parse `tag` and build the matching backend.
pub fn select_allo(tag: &str, config: AlloConfig) -> Result<Arc<dyn Allo>, ConfigError> {
	create_allo(tag.parse()?, config)
}
