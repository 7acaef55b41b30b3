//! JSON-RPC backend.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint, signing with the local wallet
//! - Bind the LifelineDAG contract at its configured address
//! - Translate alloy errors into raw backend errors for normalization
//!
//! No timeouts or retries are added here; whatever the transport does applies.

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::blockchain::backend::WalletBackend;
use crate::blockchain::contract::{self, LifelineDAG};
use crate::blockchain::types::{BackendError, BackendResult, CallReceipt, WalletEvent};
use crate::blockchain::wallet::Wallet;
use crate::config::NetworkConfig;
use crate::model::{Action, View, ViewOutput};

/// Wallet backend talking to a real node.
pub struct RpcBackend {
    provider: DynProvider,
    contract: LifelineDAG::LifelineDAGInstance<DynProvider>,
    wallet: Option<Wallet>,
    rpc_url: String,
    events: broadcast::Sender<WalletEvent>,
}

impl RpcBackend {
    /// Create a backend for the configured endpoint and contract.
    ///
    /// Without a wallet the backend still answers chain queries but reports
    /// no accounts, so the facade never binds.
    pub fn new(network: &NetworkConfig, wallet: Option<Wallet>) -> BackendResult<Self> {
        let url: url::Url = network.rpc_url.parse().map_err(|e| {
            BackendError::Transport(format!("Invalid RPC URL '{}': {}", network.rpc_url, e))
        })?;
        let contract_address: Address = network.contract_address.parse().map_err(|e| BackendError::Rpc {
            code: None,
            message: format!("Invalid contract address '{}': {}", network.contract_address, e),
        })?;

        let provider = match &wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet.ethereum_wallet())
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };
        let contract = LifelineDAG::new(contract_address, provider.clone());
        let (events, _) = broadcast::channel(16);

        tracing::info!(
            rpc_url = %network.rpc_url,
            contract = %contract_address,
            signer = wallet.is_some(),
            "RPC backend initialized"
        );

        Ok(Self {
            provider,
            contract,
            wallet,
            rpc_url: network.rpc_url.clone(),
            events,
        })
    }
}

fn from_transport(err: TransportError) -> BackendError {
    match err {
        RpcError::ErrorResp(payload) => BackendError::Rpc {
            code: Some(payload.code),
            message: payload.message.to_string(),
        },
        RpcError::Transport(kind) => BackendError::Transport(kind.to_string()),
        other => BackendError::Rpc {
            code: None,
            message: other.to_string(),
        },
    }
}

fn from_contract(err: alloy::contract::Error) -> BackendError {
    match err {
        alloy::contract::Error::TransportError(e) => from_transport(e),
        other => BackendError::Rpc {
            code: None,
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl WalletBackend for RpcBackend {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn request_accounts(&self) -> BackendResult<Vec<Address>> {
        self.wallet
            .as_ref()
            .map(|wallet| vec![wallet.address()])
            .ok_or(BackendError::ProviderMissing)
    }

    async fn chain_id(&self) -> BackendResult<u64> {
        self.provider.get_chain_id().await.map_err(from_transport)
    }

    async fn balance(&self, account: Address) -> BackendResult<U256> {
        self.provider.get_balance(account).await.map_err(from_transport)
    }

    async fn switch_chain(&self, chain_id: u64) -> BackendResult<()> {
        let current = self.chain_id().await?;
        if current == chain_id {
            return Ok(());
        }
        Err(BackendError::rpc(
            4902,
            format!(
                "Unrecognized chain ID {}: endpoint {} serves chain {}",
                chain_id, self.rpc_url, current
            ),
        ))
    }

    async fn send(&self, from: Address, action: &Action) -> BackendResult<TxHash> {
        let pending = match action {
            Action::RegisterIdentity {
                did,
                sector,
                metadata_uri,
            } => {
                self.contract
                    .registerIdentity(did.clone(), sector.code(), metadata_uri.clone().unwrap_or_default())
                    .from(from)
                    .send()
                    .await
            }
            Action::DeclareEmergency {
                emergency_type,
                location,
                encrypted_data,
                data_hash,
                initial_responders,
            } => {
                self.contract
                    .declareEmergency(
                        emergency_type.code(),
                        location.clone(),
                        encrypted_data.clone().unwrap_or_default(),
                        data_hash.clone().unwrap_or_default(),
                        initial_responders.clone(),
                    )
                    .from(from)
                    .send()
                    .await
            }
            Action::VerifyCrisis {
                crisis_id,
                signatures,
            } => {
                self.contract
                    .verifyCrisis(*crisis_id, signatures.clone())
                    .from(from)
                    .send()
                    .await
            }
            Action::GrantAccess {
                crisis_id,
                grantee,
                duration_secs,
            } => {
                self.contract
                    .grantCrisisAccess(*crisis_id, *grantee, U256::from(*duration_secs))
                    .from(from)
                    .send()
                    .await
            }
            Action::EmergencyAccess { crisis_id } => {
                self.contract.emergencyAccess(*crisis_id).from(from).send().await
            }
        }
        .map_err(from_contract)?;

        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> BackendResult<Option<CallReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(from_transport)?;

        Ok(receipt.map(|r| CallReceipt {
            tx_hash,
            block_number: r.block_number.unwrap_or_default(),
            success: r.status(),
            logs: r.inner.logs().to_vec(),
        }))
    }

    async fn block_number(&self) -> BackendResult<u64> {
        self.provider.get_block_number().await.map_err(from_transport)
    }

    async fn read(&self, view: &View) -> BackendResult<ViewOutput> {
        let output = match view {
            View::AllCrises => {
                let raw = self.contract.getAllCrises().call().await.map_err(from_contract)?;
                let mut crises = Vec::with_capacity(raw.len());
                for crisis in raw {
                    crises.extend(contract::crisis_from_raw(crisis)?);
                }
                ViewOutput::Crises(crises)
            }
            View::Crisis(id) => {
                let raw = self.contract.getCrisis(*id).call().await.map_err(from_contract)?;
                ViewOutput::Crisis(contract::crisis_from_raw(raw)?)
            }
            View::CrisisCount => {
                let count = self.contract.getCrisisCount().call().await.map_err(from_contract)?;
                ViewOutput::Count(count)
            }
            View::Identity(wallet) => {
                let raw = self.contract.getIdentity(*wallet).call().await.map_err(from_contract)?;
                ViewOutput::Identity(contract::identity_from_raw(raw)?)
            }
            View::IsVerified(wallet) => {
                let verified = self
                    .contract
                    .isIdentityVerified(*wallet)
                    .call()
                    .await
                    .map_err(from_contract)?;
                ViewOutput::Verified(verified)
            }
            View::CanAccess { crisis_id, user } => {
                let allowed = self
                    .contract
                    .canAccessCrisis(*crisis_id, *user)
                    .call()
                    .await
                    .map_err(from_contract)?;
                ViewOutput::CanAccess(allowed)
            }
            View::AccessLogs(id) => {
                let raw = self
                    .contract
                    .getCrisisAccessLogs(*id)
                    .call()
                    .await
                    .map_err(from_contract)?;
                ViewOutput::AccessLogs(raw.into_iter().map(contract::access_log_from_raw).collect())
            }
        };
        Ok(output)
    }

    fn events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for RpcBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcBackend")
            .field("rpc_url", &self.rpc_url)
            .field("contract", self.contract.address())
            .field("signer", &self.wallet.as_ref().map(Wallet::address))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_without_wallet_reports_missing_provider() {
        let backend = RpcBackend::new(&NetworkConfig::default(), None).unwrap();
        assert_eq!(
            backend.request_accounts().await.unwrap_err(),
            BackendError::ProviderMissing
        );
    }

    #[tokio::test]
    async fn test_accounts_come_from_local_wallet() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let expected = wallet.address();
        let backend = RpcBackend::new(&NetworkConfig::default(), Some(wallet)).unwrap();
        assert_eq!(backend.request_accounts().await.unwrap(), vec![expected]);
    }

    #[test]
    fn test_invalid_rpc_url() {
        let network = NetworkConfig {
            rpc_url: "not a url".into(),
            ..NetworkConfig::default()
        };
        let err = RpcBackend::new(&network, None).unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_transport_error() {
        let network = NetworkConfig {
            rpc_url: "http://127.0.0.1:1".into(),
            ..NetworkConfig::default()
        };
        let backend = RpcBackend::new(&network, None).unwrap();
        assert!(matches!(
            backend.chain_id().await.unwrap_err(),
            BackendError::Transport(_)
        ));
    }
}
