//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the contract address and RPC URL parse
//! - Check the network allow-list only names known networks
//! - Validate value ranges (poll interval > 0, confirmations > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::types::KnownNetwork;
use crate::config::schema::{BackendKind, ClientConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("network.contract_address '{0}' is not a valid address")]
    ContractAddress(String),

    #[error("network.rpc_url '{0}' is not a valid URL")]
    RpcUrl(String),

    #[error("network.allowed_chain_ids must not be empty")]
    EmptyAllowList,

    #[error("network.allowed_chain_ids contains unknown chain id {0}")]
    UnknownChain(u64),

    #[error("transactions.confirmation_blocks must be at least 1")]
    ZeroConfirmations,

    #[error("transactions.poll_interval_ms must be greater than 0")]
    ZeroPollInterval,

    #[error("mock.accounts entry '{0}' is not a valid address")]
    MockAccount(String),

    #[error("mock.verification_threshold must be at least 1")]
    ZeroThreshold,

    #[error("wallet.private_key_env must not be empty")]
    EmptyKeyEnv,
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let network = &config.network;

    if network.contract_address.parse::<Address>().is_err() {
        errors.push(ValidationError::ContractAddress(network.contract_address.clone()));
    }

    if network.allowed_chain_ids.is_empty() {
        errors.push(ValidationError::EmptyAllowList);
    }
    for id in &network.allowed_chain_ids {
        if KnownNetwork::from_chain_id(*id).is_none() {
            errors.push(ValidationError::UnknownChain(*id));
        }
    }

    if config.transactions.confirmation_blocks == 0 {
        errors.push(ValidationError::ZeroConfirmations);
    }
    if config.transactions.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    match config.wallet.backend {
        BackendKind::Rpc => {
            if network.rpc_url.parse::<url::Url>().is_err() {
                errors.push(ValidationError::RpcUrl(network.rpc_url.clone()));
            }
            if config.wallet.private_key_env.trim().is_empty() {
                errors.push(ValidationError::EmptyKeyEnv);
            }
        }
        BackendKind::Mock => {
            for account in &config.mock.accounts {
                if account.parse::<Address>().is_err() {
                    errors.push(ValidationError::MockAccount(account.clone()));
                }
            }
            if config.mock.verification_threshold == 0 {
                errors.push(ValidationError::ZeroThreshold);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ClientConfig::default();
        config.network.contract_address = "not-an-address".into();
        config.network.allowed_chain_ids = vec![1, 56];
        config.transactions.poll_interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::UnknownChain(56)));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
    }

    #[test]
    fn test_rpc_url_checked_only_for_rpc_backend() {
        let mut config = ClientConfig::default();
        config.network.rpc_url = "::bad::".into();
        assert!(validate_config(&config).is_ok());

        config.wallet.backend = BackendKind::Rpc;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::RpcUrl("::bad::".into())]);
    }
}
