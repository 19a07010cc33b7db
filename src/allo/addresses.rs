//! Supported chains and per-chain contract address tables.

use crate::allo::error::ConfigError;

use alloy::primitives::{Address, address};

const CHAIN_COUNT: usize = 17;

/// Chains the grants platform supports. Declaration order matches [`ChainId::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainId {
	Dev1,
	Dev2,
	Mainnet,
	Pgn,
	PgnTestnet,
	FantomMainnet,
	OptimismMainnet,
	FantomTestnet,
	ArbitrumGoerli,
	Arbitrum,
	Fuji,
	Avalanche,
	Polygon,
	PolygonMumbai,
	Base,
	Sepolia,
	Scroll,
}

impl ChainId {
	pub const ALL: [ChainId; CHAIN_COUNT] = [
		ChainId::Dev1,
		ChainId::Dev2,
		ChainId::Mainnet,
		ChainId::Pgn,
		ChainId::PgnTestnet,
		ChainId::FantomMainnet,
		ChainId::OptimismMainnet,
		ChainId::FantomTestnet,
		ChainId::ArbitrumGoerli,
		ChainId::Arbitrum,
		ChainId::Fuji,
		ChainId::Avalanche,
		ChainId::Polygon,
		ChainId::PolygonMumbai,
		ChainId::Base,
		ChainId::Sepolia,
		ChainId::Scroll,
	];

	pub fn id(self) -> u64 {
		match self {
			ChainId::Dev1 => 313371,
			ChainId::Dev2 => 313372,
			ChainId::Mainnet => 1,
			ChainId::Pgn => 424,
			ChainId::PgnTestnet => 58008,
			ChainId::FantomMainnet => 250,
			ChainId::OptimismMainnet => 10,
			ChainId::FantomTestnet => 4002,
			ChainId::ArbitrumGoerli => 421613,
			ChainId::Arbitrum => 42161,
			ChainId::Fuji => 43113,
			ChainId::Avalanche => 43114,
			ChainId::Polygon => 137,
			ChainId::PolygonMumbai => 80001,
			ChainId::Base => 8453,
			ChainId::Sepolia => 11155111,
			ChainId::Scroll => 534352,
		}
	}

	/// Lowercase network name, as used to qualify round references.
	pub fn name(self) -> &'static str {
		match self {
			ChainId::Dev1 => "dev1",
			ChainId::Dev2 => "dev2",
			ChainId::Mainnet => "mainnet",
			ChainId::Pgn => "pgn",
			ChainId::PgnTestnet => "pgn-testnet",
			ChainId::FantomMainnet => "fantom",
			ChainId::OptimismMainnet => "optimism",
			ChainId::FantomTestnet => "fantom-testnet",
			ChainId::ArbitrumGoerli => "arbitrum-goerli",
			ChainId::Arbitrum => "arbitrum",
			ChainId::Fuji => "fuji",
			ChainId::Avalanche => "avalanche",
			ChainId::Polygon => "polygon",
			ChainId::PolygonMumbai => "polygon-mumbai",
			ChainId::Base => "base",
			ChainId::Sepolia => "sepolia",
			ChainId::Scroll => "scroll",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl TryFrom<u64> for ChainId {
	type Error = ConfigError;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		ChainId::ALL
			.into_iter()
			.find(|chain| chain.id() == value)
			.ok_or(ConfigError::UnsupportedChain(value))
	}
}

/// Address of one contract on every supported chain.
///
/// Chains where the contract is not deployed hold the zero address, so a lookup never misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAddresses {
	by_chain: [Address; CHAIN_COUNT],
}

impl ContractAddresses {
	/// Build a table by asking `address_of` for every supported chain.
	pub fn from_fn(address_of: impl Fn(ChainId) -> Address) -> Self {
		Self {
			by_chain: ChainId::ALL.map(address_of),
		}
	}

	/// Same address everywhere.
	pub fn uniform(address: Address) -> Self {
		Self::from_fn(|_| address)
	}

	pub fn get(&self, chain: ChainId) -> Address {
		self.by_chain[chain.index()]
	}

	pub fn is_deployed(&self, chain: ChainId) -> bool {
		!self.get(chain).is_zero()
	}

	/// Allo v1 `ProjectRegistry`.
	pub fn project_registry_v1() -> Self {
		Self::from_fn(|chain| match chain {
			// dev chains get their address injected once the local deployment exists
			ChainId::Dev1 | ChainId::Dev2 => Address::ZERO,
			ChainId::Mainnet => address!("0x03506eD3f57892C85DB20C36846e9c808aFe9ef4"),
			ChainId::Pgn => address!("0xDF9BF58Aa1A1B73F0e214d79C652a7dd37a6074e"),
			ChainId::PgnTestnet => address!("0x6294bed5B884Ae18bf737793Ef9415069Bf4bc11"),
			ChainId::FantomMainnet => address!("0x8e1bD5Da87C14dd8e08F7ecc2aBf9D1d558ea174"),
			ChainId::OptimismMainnet => address!("0x8e1bD5Da87C14dd8e08F7ecc2aBf9D1d558ea174"),
			ChainId::FantomTestnet => address!("0x984749e408FF0446d8ADaf20E293F2F299396631"),
			ChainId::ArbitrumGoerli => address!("0x0CD135777dEaB6D0Bb150bDB0592aC9Baa4d0871"),
			ChainId::Arbitrum => address!("0x73AB205af1476Dc22104A6B8b3d4c273B58C6E27"),
			ChainId::Fuji => address!("0x8918401DD47f1645fF1111D8E513c0404b84d5bB"),
			ChainId::Avalanche => address!("0xDF9BF58Aa1A1B73F0e214d79C652a7dd37a6074e"),
			ChainId::Polygon => address!("0x5C5E2D94b107C7691B08E43169fDe76EAAB6D48b"),
			ChainId::PolygonMumbai => address!("0x545B282A50EaeA01A619914d44105437036CbB36"),
			ChainId::Base => address!("0xA78Daa89fE9C1eC66c5cB1c5833bC8C6Cb307918"),
			ChainId::Sepolia => address!("0x2420EABfA2C0e6f77E435B0B7615c848bF4963AF"),
			ChainId::Scroll => address!("0xDF9BF58Aa1A1B73F0e214d79C652a7dd37a6074e"),
		})
	}

	/// Allo v2 `Registry`, deployed at the same address on every public chain.
	pub fn registry_v2() -> Self {
		Self::from_fn(|chain| match chain {
			ChainId::Dev1 | ChainId::Dev2 | ChainId::Pgn | ChainId::PgnTestnet => Address::ZERO,
			_ => address!("0x4AAcca72145e1dF2aeC137E1f3C5E3D75DB8b5f3"),
		})
	}

	/// Allo v2 core contract.
	pub fn allo_v2() -> Self {
		Self::from_fn(|chain| match chain {
			ChainId::Dev1 | ChainId::Dev2 | ChainId::Pgn | ChainId::PgnTestnet => Address::ZERO,
			_ => address!("0x1133eA7Af70876e64665ecD07C0A0476d09465a1"),
		})
	}
}
