//! Chain-specific types and error definitions.

use std::fmt;

use alloy::primitives::TxHash;
use alloy::rpc::types::Log;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Networks the client knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownNetwork {
    /// Ethereum mainnet.
    Mainnet,
    /// Ethereum Sepolia testnet.
    Sepolia,
    /// BlockDAG Primordial testnet.
    BlockdagTestnet,
    /// Local development node (Anvil/Hardhat).
    Local,
}

impl KnownNetwork {
    pub const ALL: [KnownNetwork; 4] = [
        KnownNetwork::Mainnet,
        KnownNetwork::Sepolia,
        KnownNetwork::BlockdagTestnet,
        KnownNetwork::Local,
    ];

    pub fn chain_id(self) -> u64 {
        match self {
            KnownNetwork::Mainnet => 1,
            KnownNetwork::Sepolia => 11_155_111,
            KnownNetwork::BlockdagTestnet => 1043,
            KnownNetwork::Local => 31_337,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }

    pub fn name(self) -> &'static str {
        match self {
            KnownNetwork::Mainnet => "Ethereum Mainnet",
            KnownNetwork::Sepolia => "Sepolia Testnet",
            KnownNetwork::BlockdagTestnet => "BlockDAG Primordial Testnet",
            KnownNetwork::Local => "Local Development",
        }
    }

    /// Native currency symbol.
    pub fn currency(self) -> &'static str {
        match self {
            KnownNetwork::BlockdagTestnet => "BDAG",
            _ => "ETH",
        }
    }
}

impl fmt::Display for KnownNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.chain_id())
    }
}

/// Raw failure reported by a wallet backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No wallet provider is installed or configured.
    #[error("no wallet provider available")]
    ProviderMissing,

    /// The wallet or node answered with an error object.
    #[error("{message} (code {code:?})")]
    Rpc { code: Option<i64>, message: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code: Some(code),
            message: message.into(),
        }
    }

    /// An execution revert with the contract's reason string.
    pub fn revert(reason: &str) -> Self {
        Self::rpc(3, format!("execution reverted: {}", reason))
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Mined transaction as seen by the client.
#[derive(Debug, Clone)]
pub struct CallReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False when execution reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Notifications pushed by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of exposed accounts changed; empty means locked or revoked.
    AccountsChanged(Vec<alloy::primitives::Address>),
    /// The wallet moved to another chain.
    ChainChanged(u64),
    /// The provider lost its connection.
    Disconnected,
}

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction reverted on-chain.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks() {
        assert_eq!(KnownNetwork::from_chain_id(1043), Some(KnownNetwork::BlockdagTestnet));
        assert_eq!(KnownNetwork::from_chain_id(56), None);
        for network in KnownNetwork::ALL {
            assert_eq!(KnownNetwork::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(KnownNetwork::Local.to_string(), "Local Development (31337)");
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::revert("already registered");
        assert_eq!(
            err.to_string(),
            "execution reverted: already registered (code Some(3))"
        );
        assert_eq!(BackendError::ProviderMissing.to_string(), "no wallet provider available");
    }
}
