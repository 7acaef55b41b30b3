//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig.wallet.backend
//!     → rpc:  wallet.rs (key from env) + client.rs (alloy provider + contract.rs bindings)
//!     → mock: mock.rs (in-memory contract simulation)
//!     → Arc<dyn WalletBackend> handed to the facade
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data

pub mod backend;
pub mod client;
pub mod contract;
pub mod mock;
pub mod types;
pub mod wallet;

use std::sync::Arc;

use alloy::primitives::Address;

pub use backend::WalletBackend;
pub use client::RpcBackend;
pub use mock::MockBackend;
pub use types::{BackendError, BackendResult, CallReceipt, KnownNetwork, WalletEvent};
pub use wallet::Wallet;

use crate::config::{BackendKind, ClientConfig};

/// Build the backend selected by configuration.
///
/// For the rpc backend a missing private key is not an error here: the
/// backend starts without a signer and `connect` later reports no wallet.
pub fn build_backend(config: &ClientConfig) -> BackendResult<Arc<dyn WalletBackend>> {
    match config.wallet.backend {
        BackendKind::Rpc => {
            let wallet = match Wallet::from_env(&config.wallet.private_key_env) {
                Ok(wallet) => Some(wallet),
                Err(BackendError::ProviderMissing) => None,
                Err(e) => return Err(e),
            };
            Ok(Arc::new(RpcBackend::new(&config.network, wallet)?))
        }
        BackendKind::Mock => {
            let contract_address: Address =
                config.network.contract_address.parse().map_err(|e| BackendError::Rpc {
                    code: None,
                    message: format!(
                        "Invalid contract address '{}': {}",
                        config.network.contract_address, e
                    ),
                })?;
            Ok(Arc::new(MockBackend::new(config.mock.clone(), contract_address)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_from_defaults() {
        let backend = build_backend(&ClientConfig::default()).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_bad_contract_address_is_rejected() {
        let mut config = ClientConfig::default();
        config.network.contract_address = "0xnot-an-address".to_string();

        let err = build_backend(&config).err().unwrap();
        assert!(err.to_string().contains("Invalid contract address"));
    }
}
