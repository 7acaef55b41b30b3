//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the LifelineDAG client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Contract location and supported networks.
    pub network: NetworkConfig,

    /// Which wallet backend to use and where it gets its key.
    pub wallet: WalletConfig,

    /// Confirmation and preflight behaviour for submitted actions.
    pub transactions: TransactionConfig,

    /// Settings for the in-memory backend.
    pub mock: MockConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network and contract binding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Address of the deployed LifelineDAG contract.
    pub contract_address: String,

    /// Chain IDs the client is willing to operate on.
    pub allowed_chain_ids: Vec<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            allowed_chain_ids: vec![1, 11_155_111, 1043, 31_337],
        }
    }
}

/// Selects the wallet backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// JSON-RPC provider signing with a local key.
    Rpc,
    /// In-memory contract simulation.
    #[default]
    Mock,
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Backend implementation.
    pub backend: BackendKind,

    /// Environment variable holding the signer's private key (rpc backend).
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mock,
            private_key_env: crate::blockchain::wallet::PRIVATE_KEY_ENV_VAR.to_string(),
        }
    }
}

/// Transaction submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Number of block confirmations (including the mining block) required.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Optional deadline for confirmation. Unset means wait indefinitely.
    pub confirmation_timeout_secs: Option<u64>,

    /// Check the caller's identity is verified before declaring an emergency
    /// or using break-glass access.
    pub require_verified_identity: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            confirmation_blocks: 1,
            poll_interval_ms: 2_000,
            confirmation_timeout_secs: None,
            require_verified_identity: false,
        }
    }
}

/// In-memory backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MockConfig {
    /// Whether a wallet is "installed".
    pub wallet_installed: bool,

    /// Accounts exposed by the wallet (hex addresses).
    pub accounts: Vec<String>,

    /// Chain the mock wallet reports.
    pub chain_id: u64,

    /// Starting balance of every account in wei.
    pub initial_balance_wei: u128,

    /// Gas cost debited per transaction in wei.
    pub gas_cost_wei: u128,

    /// Artificial latency per call in milliseconds.
    pub latency_ms: u64,

    /// Verifications needed before a crisis counts as verified.
    pub verification_threshold: u32,

    /// Duration of a break-glass grant in seconds.
    pub emergency_access_secs: u64,

    /// Mark identities verified as soon as they register.
    pub auto_verify_identities: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            wallet_installed: true,
            accounts: vec!["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string()],
            chain_id: 31_337,
            initial_balance_wei: 2_450_000_000_000_000_000,
            gas_cost_wei: 210_000_000_000_000,
            latency_ms: 0,
            verification_threshold: 2,
            emergency_access_secs: 86_400,
            auto_verify_identities: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
