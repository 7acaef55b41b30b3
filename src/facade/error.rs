//! Client error taxonomy and normalization of raw backend failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::types::BackendError;
use crate::model::InputError;

/// Errors surfaced to callers of the facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No wallet provider found")]
    WalletNotFound,

    #[error("Request rejected by user")]
    UserRejected,

    #[error("Insufficient funds for transaction")]
    InsufficientFunds,

    #[error("Unsupported network (chain id {chain_id})")]
    NetworkMismatch { chain_id: u64 },

    #[error("Contract not connected")]
    ContractNotBound,

    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("{0}")]
    InvalidInput(#[from] InputError),

    #[error("Identity is not verified")]
    NotVerified,
}

/// Closed tag for a [`ClientError`], stable for metrics and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WalletNotFound,
    UserRejected,
    InsufficientFunds,
    NetworkMismatch,
    ContractNotBound,
    GasEstimationFailed,
    NetworkError,
    Reverted,
    Unknown,
    InvalidInput,
    NotVerified,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::WalletNotFound => "wallet_not_found",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::NetworkMismatch => "network_mismatch",
            ErrorKind::ContractNotBound => "contract_not_bound",
            ErrorKind::GasEstimationFailed => "gas_estimation_failed",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Reverted => "reverted",
            ErrorKind::Unknown => "unknown",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotVerified => "not_verified",
        }
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::WalletNotFound => ErrorKind::WalletNotFound,
            ClientError::UserRejected => ErrorKind::UserRejected,
            ClientError::InsufficientFunds => ErrorKind::InsufficientFunds,
            ClientError::NetworkMismatch { .. } => ErrorKind::NetworkMismatch,
            ClientError::ContractNotBound => ErrorKind::ContractNotBound,
            ClientError::GasEstimationFailed(_) => ErrorKind::GasEstimationFailed,
            ClientError::Network(_) => ErrorKind::NetworkError,
            ClientError::Reverted(_) => ErrorKind::Reverted,
            ClientError::Unknown(_) => ErrorKind::Unknown,
            ClientError::InvalidInput(_) => ErrorKind::InvalidInput,
            ClientError::NotVerified => ErrorKind::NotVerified,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::WalletNotFound => {
                "No wallet found. Install a wallet or configure a signing key.".to_string()
            }
            ClientError::UserRejected => "Transaction rejected by user".to_string(),
            ClientError::ContractNotBound => "Please connect your wallet first".to_string(),
            ClientError::NotVerified => {
                "Only verified identities can perform this action. Please register and verify your identity first."
                    .to_string()
            }
            ClientError::Reverted(reason) => {
                let lower = reason.to_ascii_lowercase();
                if lower.contains("already registered") {
                    "Identity already registered for this wallet".to_string()
                } else if lower.contains("not verified") {
                    "Only verified responders can declare emergencies".to_string()
                } else if lower.contains("not authorized") {
                    "You are not authorized to grant access for this crisis".to_string()
                } else {
                    self.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<BackendError> for ClientError {
    fn from(err: BackendError) -> Self {
        normalize(err)
    }
}

const USER_REJECTED_CODES: [i64; 2] = [4001, 4100];
const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

const GAS_MARKERS: [&str; 5] = [
    "gas required exceeds",
    "cannot estimate gas",
    "unpredictable gas limit",
    "intrinsic gas too low",
    "out of gas",
];

const NETWORK_MARKERS: [&str; 4] = ["timeout", "timed out", "connection", "network"];

/// Map a raw backend error onto the client taxonomy.
pub fn normalize(err: BackendError) -> ClientError {
    let (code, message) = match err {
        BackendError::ProviderMissing => return ClientError::WalletNotFound,
        BackendError::Transport(message) => return ClientError::Network(message),
        BackendError::Rpc { code, message } => (code, message),
    };
    let lower = message.to_ascii_lowercase();

    if code.is_some_and(|c| USER_REJECTED_CODES.contains(&c))
        || lower.contains("user rejected")
        || lower.contains("user denied")
    {
        return ClientError::UserRejected;
    }
    if code == Some(UNRECOGNIZED_CHAIN_CODE) || lower.contains("unrecognized chain") {
        return ClientError::NetworkMismatch {
            chain_id: chain_id_in(&message).unwrap_or_default(),
        };
    }
    if lower.contains("insufficient funds") {
        return ClientError::InsufficientFunds;
    }
    if GAS_MARKERS.iter().any(|m| lower.contains(m)) {
        return ClientError::GasEstimationFailed(message);
    }
    if lower.contains("revert") {
        return ClientError::Reverted(revert_reason(&message));
    }
    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        return ClientError::Network(message);
    }
    ClientError::Unknown(message)
}

/// Text after `execution reverted:`, or the whole message.
fn revert_reason(message: &str) -> String {
    const PREFIX: &str = "execution reverted:";
    match message.find(PREFIX) {
        Some(idx) => message[idx + PREFIX.len()..].trim().to_string(),
        None => message.trim().to_string(),
    }
}

/// First decimal number in a message, taken as the offending chain id.
fn chain_id_in(message: &str) -> Option<u64> {
    message
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_provider() {
        assert_eq!(normalize(BackendError::ProviderMissing), ClientError::WalletNotFound);
    }

    #[test]
    fn test_user_rejection_by_code_and_text() {
        assert_eq!(
            normalize(BackendError::rpc(4001, "User rejected the request.")),
            ClientError::UserRejected
        );
        assert_eq!(
            normalize(BackendError::Rpc {
                code: None,
                message: "MetaMask Tx Signature: User denied transaction signature.".into(),
            }),
            ClientError::UserRejected
        );
    }

    #[test]
    fn test_insufficient_funds_wins_over_gas() {
        let err = BackendError::rpc(-32000, "insufficient funds for gas * price + value");
        assert_eq!(normalize(err), ClientError::InsufficientFunds);
    }

    #[test]
    fn test_gas_estimation() {
        let err = BackendError::rpc(-32000, "gas required exceeds allowance (30000000)");
        assert_eq!(ClientError::from(err).kind(), ErrorKind::GasEstimationFailed);
    }

    #[test]
    fn test_revert_reason_extracted() {
        let err = normalize(BackendError::revert("Identity already registered"));
        assert_eq!(err, ClientError::Reverted("Identity already registered".into()));
        assert_eq!(err.user_message(), "Identity already registered for this wallet");
    }

    #[test]
    fn test_unrecognized_chain() {
        let err = BackendError::rpc(4902, "Unrecognized chain ID \"56\". Try adding the chain first.");
        assert_eq!(normalize(err), ClientError::NetworkMismatch { chain_id: 56 });
    }

    #[test]
    fn test_transport_and_unknown() {
        assert_eq!(
            normalize(BackendError::Transport("connection refused".into())).kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            normalize(BackendError::Rpc {
                code: Some(-32601),
                message: "method not found".into(),
            }),
            ClientError::Unknown("method not found".into())
        );
    }
}
