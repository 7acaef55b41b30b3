//! In-memory wallet and contract simulation.
//!
//! Behaves like a wallet attached to a node running the LifelineDAG
//! contract: accounts, balances, one block per transaction, and the
//! contract's access rules enforced as reverts. Test hooks allow failure
//! injection and wallet notifications.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{broadcast, Mutex};

use crate::blockchain::backend::WalletBackend;
use crate::blockchain::contract::{crisis_declared_log, LifelineDAG};
use crate::blockchain::types::{BackendError, BackendResult, CallReceipt, KnownNetwork, WalletEvent};
use crate::config::MockConfig;
use crate::model::{AccessLogEntry, Action, Crisis, Identity, View, ViewOutput};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn random_hash() -> TxHash {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    B256::from(bytes)
}

#[derive(Default)]
struct MockState {
    installed: bool,
    reject_requests: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    balances: HashMap<Address, U256>,
    block_number: u64,
    identities: HashMap<Address, Identity>,
    crises: Vec<Crisis>,
    verifiers: HashMap<U256, HashSet<Address>>,
    access_logs: Vec<AccessLogEntry>,
    receipts: HashMap<TxHash, CallReceipt>,
    fail_next: Option<BackendError>,
    revert_next_mined: bool,
    calls: u64,
}

impl MockState {
    fn crisis_mut(&mut self, id: U256) -> Result<&mut Crisis, &'static str> {
        self.crises
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or("Crisis does not exist")
    }

    fn require_verified(&self, caller: Address) -> Result<(), &'static str> {
        match self.identities.get(&caller) {
            Some(identity) if identity.verified => Ok(()),
            _ => Err("Identity not verified"),
        }
    }

    fn can_access(&self, crisis_id: U256, user: Address, at: u64) -> bool {
        let declarer = self
            .crises
            .iter()
            .any(|c| c.id == crisis_id && c.declared_by == user);
        declarer
            || self
                .access_logs
                .iter()
                .any(|log| log.crisis_id == crisis_id && log.user == user && log.is_active_at(at))
    }
}

/// Simulated wallet backend.
pub struct MockBackend {
    config: MockConfig,
    contract_address: Address,
    state: Mutex<MockState>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockBackend {
    /// Create a simulation seeded from configuration.
    pub fn new(config: MockConfig, contract_address: Address) -> BackendResult<Self> {
        let accounts = config
            .accounts
            .iter()
            .map(|a| {
                a.parse::<Address>().map_err(|e| BackendError::Rpc {
                    code: None,
                    message: format!("Invalid mock account '{}': {}", a, e),
                })
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let balances = accounts
            .iter()
            .map(|a| (*a, U256::from(config.initial_balance_wei)))
            .collect();

        let state = MockState {
            installed: config.wallet_installed,
            accounts,
            chain_id: config.chain_id,
            balances,
            ..MockState::default()
        };
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            config,
            contract_address,
            state: Mutex::new(state),
            events,
        })
    }

    /// Number of calls that reached the simulated wallet.
    pub async fn calls(&self) -> u64 {
        self.state.lock().await.calls
    }

    /// Make the next call fail with `err`.
    pub async fn fail_next(&self, err: BackendError) {
        self.state.lock().await.fail_next = Some(err);
    }

    /// Mine the next transaction with a failed status and no state change.
    pub async fn revert_next_mined(&self) {
        self.state.lock().await.revert_next_mined = true;
    }

    pub async fn set_installed(&self, installed: bool) {
        self.state.lock().await.installed = installed;
    }

    /// Make account requests behave as if the user declined.
    pub async fn set_reject_requests(&self, reject: bool) {
        self.state.lock().await.reject_requests = reject;
    }

    pub async fn set_balance(&self, account: Address, balance: U256) {
        self.state.lock().await.balances.insert(account, balance);
    }

    /// Change the wallet's chain without notifying anyone.
    pub async fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().await.chain_id = chain_id;
    }

    /// Expose a different account and notify subscribers.
    pub async fn switch_account(&self, account: Address) {
        let mut state = self.state.lock().await;
        state.accounts = vec![account];
        state
            .balances
            .entry(account)
            .or_insert(U256::from(self.config.initial_balance_wei));
        drop(state);
        self.emit(WalletEvent::AccountsChanged(vec![account]));
    }

    /// Mark an identity verified, as an authorized verifier would.
    pub async fn verify_identity(&self, wallet: Address) -> bool {
        let mut state = self.state.lock().await;
        match state.identities.get_mut(&wallet) {
            Some(identity) => {
                identity.verified = true;
                identity.last_verified = now();
                true
            }
            None => false,
        }
    }

    /// Push a wallet notification to subscribers.
    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    /// Common entry for every simulated call: latency, accounting, injected failure.
    async fn enter(&self) -> BackendResult<()> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
        let mut state = self.state.lock().await;
        state.calls += 1;
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Apply an action to contract state, returning emitted logs or a revert reason.
    fn execute(&self, state: &mut MockState, caller: Address, action: &Action) -> Result<Vec<Log>, &'static str> {
        let at = now();
        match action {
            Action::RegisterIdentity {
                did,
                sector,
                metadata_uri,
            } => {
                if state.identities.contains_key(&caller) {
                    return Err("Identity already registered");
                }
                let verified = self.config.auto_verify_identities;
                state.identities.insert(
                    caller,
                    Identity {
                        wallet: caller,
                        did: did.clone(),
                        sector: *sector,
                        metadata_uri: metadata_uri.clone(),
                        verified,
                        registered_at: at,
                        last_verified: if verified { at } else { 0 },
                    },
                );
                Ok(Vec::new())
            }
            Action::DeclareEmergency {
                emergency_type,
                location,
                encrypted_data,
                data_hash,
                initial_responders,
            } => {
                state.require_verified(caller)?;
                let id = U256::from(state.crises.len() + 1);
                state.crises.push(Crisis {
                    id,
                    emergency_type: *emergency_type,
                    location: location.clone(),
                    encrypted_data: encrypted_data.clone(),
                    data_hash: data_hash.clone(),
                    declared_by: caller,
                    declared_at: at,
                    verified: false,
                    verification_count: 0,
                });
                for responder in initial_responders {
                    state.access_logs.push(AccessLogEntry {
                        crisis_id: id,
                        user: *responder,
                        granted_at: at,
                        expires_at: at + self.config.emergency_access_secs,
                        emergency: false,
                    });
                }
                let event = LifelineDAG::CrisisDeclared {
                    crisisId: id,
                    declaredBy: caller,
                    emergencyType: emergency_type.code(),
                    location: location.clone(),
                };
                Ok(vec![crisis_declared_log(self.contract_address, &event)])
            }
            Action::VerifyCrisis { crisis_id, .. } => {
                state.require_verified(caller)?;
                state.crisis_mut(*crisis_id)?;
                if !state.verifiers.entry(*crisis_id).or_default().insert(caller) {
                    return Err("Crisis already verified by caller");
                }
                let threshold = u64::from(self.config.verification_threshold);
                let crisis = state.crisis_mut(*crisis_id)?;
                crisis.verification_count += 1;
                crisis.verified = crisis.verification_count >= threshold;
                Ok(Vec::new())
            }
            Action::GrantAccess {
                crisis_id,
                grantee,
                duration_secs,
            } => {
                let crisis = state.crisis_mut(*crisis_id)?;
                if crisis.declared_by != caller {
                    return Err("Caller not authorized for this crisis");
                }
                state.access_logs.push(AccessLogEntry {
                    crisis_id: *crisis_id,
                    user: *grantee,
                    granted_at: at,
                    expires_at: at.saturating_add(*duration_secs),
                    emergency: false,
                });
                Ok(Vec::new())
            }
            Action::EmergencyAccess { crisis_id } => {
                state.require_verified(caller)?;
                state.crisis_mut(*crisis_id)?;
                state.access_logs.push(AccessLogEntry {
                    crisis_id: *crisis_id,
                    user: caller,
                    granted_at: at,
                    expires_at: at + self.config.emergency_access_secs,
                    emergency: true,
                });
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl WalletBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn request_accounts(&self) -> BackendResult<Vec<Address>> {
        self.enter().await?;
        let state = self.state.lock().await;
        if !state.installed {
            return Err(BackendError::ProviderMissing);
        }
        if state.reject_requests {
            return Err(BackendError::rpc(4001, "User rejected the request."));
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> BackendResult<u64> {
        self.enter().await?;
        Ok(self.state.lock().await.chain_id)
    }

    async fn balance(&self, account: Address) -> BackendResult<U256> {
        self.enter().await?;
        let state = self.state.lock().await;
        Ok(state.balances.get(&account).copied().unwrap_or_default())
    }

    async fn switch_chain(&self, chain_id: u64) -> BackendResult<()> {
        self.enter().await?;
        if KnownNetwork::from_chain_id(chain_id).is_none() {
            return Err(BackendError::rpc(
                4902,
                format!("Unrecognized chain ID \"{}\". Try adding the chain first.", chain_id),
            ));
        }
        self.state.lock().await.chain_id = chain_id;
        self.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn send(&self, from: Address, action: &Action) -> BackendResult<TxHash> {
        self.enter().await?;
        let mut state = self.state.lock().await;

        if !state.accounts.contains(&from) {
            return Err(BackendError::rpc(
                4100,
                "The requested account has not been authorized by the user.",
            ));
        }
        let gas_cost = U256::from(self.config.gas_cost_wei);
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < gas_cost {
            return Err(BackendError::rpc(-32000, "insufficient funds for gas * price + value"));
        }

        let tx_hash = random_hash();
        let revert_mined = std::mem::take(&mut state.revert_next_mined);
        let logs = if revert_mined {
            Vec::new()
        } else {
            self.execute(&mut state, from, action)
                .map_err(BackendError::revert)?
        };

        state.balances.insert(from, balance - gas_cost);
        state.block_number += 1;
        let receipt = CallReceipt {
            tx_hash,
            block_number: state.block_number,
            success: !revert_mined,
            logs,
        };
        state.receipts.insert(tx_hash, receipt);

        tracing::debug!(
            tx_hash = %tx_hash,
            action = %action.kind(),
            block = state.block_number,
            "Mock transaction mined"
        );
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> BackendResult<Option<CallReceipt>> {
        self.enter().await?;
        Ok(self.state.lock().await.receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> BackendResult<u64> {
        self.enter().await?;
        Ok(self.state.lock().await.block_number)
    }

    async fn read(&self, view: &View) -> BackendResult<ViewOutput> {
        self.enter().await?;
        let state = self.state.lock().await;
        let output = match view {
            View::AllCrises => ViewOutput::Crises(state.crises.clone()),
            View::Crisis(id) => ViewOutput::Crisis(state.crises.iter().find(|c| c.id == *id).cloned()),
            View::CrisisCount => ViewOutput::Count(U256::from(state.crises.len())),
            View::Identity(wallet) => ViewOutput::Identity(state.identities.get(wallet).cloned()),
            View::IsVerified(wallet) => {
                ViewOutput::Verified(state.identities.get(wallet).is_some_and(|i| i.verified))
            }
            View::CanAccess { crisis_id, user } => {
                ViewOutput::CanAccess(state.can_access(*crisis_id, *user, now()))
            }
            View::AccessLogs(id) => ViewOutput::AccessLogs(
                state
                    .access_logs
                    .iter()
                    .filter(|log| log.crisis_id == *id)
                    .cloned()
                    .collect(),
            ),
        };
        Ok(output)
    }

    fn events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("chain_id", &self.config.chain_id)
            .field("latency_ms", &self.config.latency_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmergencyType, Sector};

    fn backend() -> (MockBackend, Address) {
        let backend = MockBackend::new(MockConfig::default(), Address::ZERO).unwrap();
        let account = MockConfig::default().accounts[0].parse().unwrap();
        (backend, account)
    }

    fn register() -> Action {
        Action::RegisterIdentity {
            did: "did:ethr:responder".into(),
            sector: Sector::Healthcare,
            metadata_uri: None,
        }
    }

    fn declare() -> Action {
        Action::DeclareEmergency {
            emergency_type: EmergencyType::Wildfire,
            location: "Ridge Valley".into(),
            encrypted_data: None,
            data_hash: None,
            initial_responders: vec![],
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_reverts() {
        let (backend, account) = backend();
        backend.send(account, &register()).await.unwrap();
        let err = backend.send(account, &register()).await.unwrap_err();
        assert_eq!(err, BackendError::revert("Identity already registered"));
    }

    #[tokio::test]
    async fn test_each_transaction_mines_a_block_and_costs_gas() {
        let (backend, account) = backend();
        let before = backend.balance(account).await.unwrap();
        let hash = backend.send(account, &register()).await.unwrap();

        let receipt = backend.receipt(hash).await.unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, 1);
        assert_eq!(backend.block_number().await.unwrap(), 1);
        assert_eq!(
            backend.balance(account).await.unwrap(),
            before - U256::from(MockConfig::default().gas_cost_wei)
        );
    }

    #[tokio::test]
    async fn test_unverified_declarer_reverts() {
        let config = MockConfig {
            auto_verify_identities: false,
            ..MockConfig::default()
        };
        let backend = MockBackend::new(config, Address::ZERO).unwrap();
        let account: Address = MockConfig::default().accounts[0].parse().unwrap();

        backend.send(account, &register()).await.unwrap();
        let err = backend.send(account, &declare()).await.unwrap_err();
        assert_eq!(err, BackendError::revert("Identity not verified"));

        assert!(backend.verify_identity(account).await);
        backend.send(account, &declare()).await.unwrap();
    }

    #[tokio::test]
    async fn test_verification_reaches_threshold() {
        let (backend, first) = backend();
        let second: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        backend.send(first, &register()).await.unwrap();
        backend.send(first, &declare()).await.unwrap();

        let verify = Action::VerifyCrisis {
            crisis_id: U256::from(1),
            signatures: vec![],
        };
        backend.send(first, &verify).await.unwrap();
        assert_eq!(
            backend.send(first, &verify).await.unwrap_err(),
            BackendError::revert("Crisis already verified by caller")
        );

        backend.switch_account(second).await;
        backend.send(second, &register()).await.unwrap();
        backend.send(second, &verify).await.unwrap();

        match backend.read(&View::Crisis(U256::from(1))).await.unwrap() {
            ViewOutput::Crisis(Some(crisis)) => {
                assert_eq!(crisis.verification_count, 2);
                assert!(crisis.verified);
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_grant_requires_declarer() {
        let (backend, declarer) = backend();
        let other: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        backend.send(declarer, &register()).await.unwrap();
        backend.send(declarer, &declare()).await.unwrap();

        let grant = Action::GrantAccess {
            crisis_id: U256::from(1),
            grantee: declarer,
            duration_secs: 60,
        };
        backend.switch_account(other).await;
        assert_eq!(
            backend.send(other, &grant).await.unwrap_err(),
            BackendError::revert("Caller not authorized for this crisis")
        );

        let check = View::CanAccess {
            crisis_id: U256::from(1),
            user: other,
        };
        assert_eq!(backend.read(&check).await.unwrap(), ViewOutput::CanAccess(false));
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let (backend, _) = backend();
        backend.fail_next(BackendError::Transport("connection reset".into())).await;
        assert!(backend.chain_id().await.is_err());
        assert_eq!(backend.chain_id().await.unwrap(), 31_337);
        assert_eq!(backend.calls().await, 2);
    }

    #[tokio::test]
    async fn test_switch_chain_notifies() {
        let (backend, _) = backend();
        let mut events = backend.events();
        backend.switch_chain(11_155_111).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), WalletEvent::ChainChanged(11_155_111));
        assert!(backend.switch_chain(56).await.is_err());
    }
}
