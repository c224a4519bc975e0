//! Supported chains and their node provider endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Ethereum network the relay follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet.
    Mainnet,
    /// Sepolia testnet.
    #[default]
    Sepolia,
}

impl Network {
    /// Returns the lowercase network name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
        }
    }

    /// Returns the Alchemy JSON-RPC endpoint for this network.
    #[must_use]
    pub fn rpc_url(&self, api_key: &str) -> String {
        match self {
            Self::Mainnet => format!("https://eth-mainnet.alchemyapi.io/v2/{api_key}"),
            Self::Sepolia => format!("https://eth-sepolia.g.alchemy.com/v2/{api_key}"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            other => Err(RelayError::InvalidNetwork(other.to_string())),
        }
    }
}
