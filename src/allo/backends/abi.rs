//! Contract interfaces the backends encode calls for and decode events from.

/// Allo v1: a project registry plus one contract per round.
pub mod v1 {
	use alloy::sol;

	sol! {
		/// Pointer to off-chain metadata; protocol 1 is IPFS.
		#[derive(Debug, PartialEq, Eq)]
		struct MetaPtr {
			uint256 protocol;
			string pointer;
		}

		interface ProjectRegistry {
			function createProject(MetaPtr metadata) external;
			function updateProjectMetadata(uint256 projectID, MetaPtr metadata) external;

			event ProjectCreated(uint256 indexed projectID, address indexed owner);
			event MetadataUpdated(uint256 indexed projectID, MetaPtr metaPtr);
		}

		interface RoundImplementation {
			function applyToRound(bytes32 projectID, MetaPtr newApplicationMetaPtr) external;

			event NewProjectApplication(bytes32 indexed projectID, uint256 applicationIndex, MetaPtr applicationMetaPtr);
		}
	}
}

/// Allo v2: a profile registry, a core contract owning pools and per-pool strategies.
pub mod v2 {
	use alloy::sol;

	sol! {
		#[derive(Debug, PartialEq, Eq)]
		struct Metadata {
			uint256 protocol;
			string pointer;
		}

		interface Registry {
			function createProfile(uint256 nonce, string name, Metadata metadata, address owner, address[] members) external returns (bytes32);
			function updateProfileMetadata(bytes32 profileId, Metadata metadata) external;

			event ProfileCreated(bytes32 indexed profileId, uint256 nonce, string name, Metadata metadata, address owner, address anchor);
			event ProfileMetadataUpdated(bytes32 indexed profileId, Metadata metadata);
		}

		interface Allo {
			function registerRecipient(uint256 poolId, bytes data) external payable returns (address);
		}

		interface RecipientStrategy {
			event Registered(address indexed recipientId, bytes data, address sender);
		}
	}
}

/// Metadata pointer protocol id for IPFS.
pub const IPFS_PROTOCOL: u64 = 1;
