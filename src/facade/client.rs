//! Wallet/contract client facade.
//!
//! # Responsibilities
//! - Connect the wallet and check the network against the allow-list
//! - Submit contract actions and wait for their confirmation
//! - Run read-only contract views
//! - Keep the session mirror in step with wallet notifications
//!
//! # Design Decisions
//! - The session is swapped atomically; readers never block
//! - Every failure is normalized into [`ClientError`] before it leaves here
//! - Nothing is retried; a failed call leaves local state as it was

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes, TxHash, U256};
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::blockchain::contract::crisis_id_from_logs;
use crate::blockchain::types::{CallReceipt, ConfirmationStatus, KnownNetwork, WalletEvent};
use crate::blockchain::{build_backend, WalletBackend};
use crate::config::{ClientConfig, TransactionConfig};
use crate::facade::error::ClientError;
use crate::facade::txlog::{TransactionLog, TransactionRecord};
use crate::model::{
    AccessLogEntry, Action, ActionKind, Crisis, CrisisIdOutcome, EmergencyType, Identity, Sector, View,
    ViewOutput,
};
use crate::observability::metrics;

/// The connected wallet as last seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: Address,
    pub network: KnownNetwork,
    pub chain_id: u64,
    /// Native balance in wei.
    pub balance: U256,
}

/// Decoded output of a submitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutput {
    None,
    CrisisId(CrisisIdOutcome),
}

/// Result of a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// Transaction log record for this submission.
    pub record_id: Uuid,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub output: ActionOutput,
}

impl SubmitOutcome {
    /// Crisis id assigned by a declaration, if this was one.
    pub fn crisis_id(&self) -> Option<CrisisIdOutcome> {
        match self.output {
            ActionOutput::CrisisId(id) => Some(id),
            ActionOutput::None => None,
        }
    }
}

/// Classify a receipt against the current chain head.
///
/// The block that includes the transaction counts as its first confirmation.
pub fn confirmation_status(receipt: &CallReceipt, current_block: u64, required: u32) -> ConfirmationStatus {
    if !receipt.success {
        return ConfirmationStatus::Failed("Transaction reverted".to_string());
    }
    let depth = current_block.saturating_sub(receipt.block_number).saturating_add(1);
    let confirmations = u32::try_from(depth).unwrap_or(u32::MAX);
    if confirmations >= required {
        ConfirmationStatus::Confirmed {
            block_number: receipt.block_number,
        }
    } else {
        ConfirmationStatus::Confirming {
            current: confirmations,
            required,
        }
    }
}

fn unexpected(output: ViewOutput) -> ClientError {
    ClientError::Unknown(format!("unexpected view output: {:?}", output))
}

/// Single point of contact between callers and the wallet + contract.
pub struct LifelineClient {
    backend: Arc<dyn WalletBackend>,
    allowed_chain_ids: Vec<u64>,
    transactions: TransactionConfig,
    session: ArcSwapOption<Session>,
    txlog: TransactionLog,
}

impl LifelineClient {
    /// Create a client over an existing backend.
    pub fn new(backend: Arc<dyn WalletBackend>, config: &ClientConfig) -> Self {
        Self {
            backend,
            allowed_chain_ids: config.network.allowed_chain_ids.clone(),
            transactions: config.transactions.clone(),
            session: ArcSwapOption::empty(),
            txlog: TransactionLog::new(),
        }
    }

    /// Create a client with the backend the configuration selects.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let backend = build_backend(config)?;
        tracing::debug!(backend = backend.name(), "Wallet backend selected");
        Ok(Self::new(backend, config))
    }

    pub fn backend(&self) -> &Arc<dyn WalletBackend> {
        &self.backend
    }

    // ---- connection -------------------------------------------------------

    /// Request account access and cache the session.
    ///
    /// Any failure leaves the previous session untouched.
    pub async fn connect(&self) -> Result<Arc<Session>, ClientError> {
        let result = self.try_connect().await;
        if let Err(err) = &result {
            metrics::record_error(err.kind());
            tracing::warn!(error = %err, "Wallet connection failed");
        }
        result
    }

    async fn try_connect(&self) -> Result<Arc<Session>, ClientError> {
        let accounts = self.backend.request_accounts().await?;
        let address = *accounts.first().ok_or(ClientError::UserRejected)?;
        let chain_id = self.backend.chain_id().await?;
        let network = self.check_network(chain_id)?;
        let balance = self.backend.balance(address).await?;

        let session = Arc::new(Session {
            address,
            network,
            chain_id,
            balance,
        });
        self.session.store(Some(session.clone()));

        tracing::info!(
            address = %address,
            network = %network,
            balance_wei = %balance,
            "Wallet connected"
        );
        Ok(session)
    }

    /// Forget the cached session. Idempotent.
    pub fn disconnect(&self) {
        if let Some(previous) = self.session.swap(None) {
            tracing::info!(address = %previous.address, "Wallet disconnected");
        }
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    pub fn is_connected(&self) -> bool {
        self.session.load().is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.session.load().as_ref().map(|s| s.address)
    }

    /// Cached balance; zero when disconnected.
    pub fn balance(&self) -> U256 {
        self.session
            .load()
            .as_ref()
            .map(|s| s.balance)
            .unwrap_or_default()
    }

    /// Re-read the connected account's balance.
    pub async fn refresh_balance(&self) -> Result<U256, ClientError> {
        let session = self.require_session()?;
        let balance = self.backend.balance(session.address).await?;
        let next = Session {
            balance,
            ..(*session).clone()
        };
        if self.commit_session(&session, next) {
            return Ok(balance);
        }
        // Disconnected or switched while the balance was in flight.
        match self.session() {
            Some(current) => Ok(current.balance),
            None => Err(ClientError::ContractNotBound),
        }
    }

    /// Replace the session only if it is still `expected`.
    fn commit_session(&self, expected: &Arc<Session>, next: Session) -> bool {
        let expected = Some(expected.clone());
        let previous = self.session.compare_and_swap(&expected, Some(Arc::new(next)));
        match (&*previous, &expected) {
            (Some(previous), Some(expected)) => Arc::ptr_eq(previous, expected),
            _ => false,
        }
    }

    /// Ask the wallet to move to another allowed chain.
    pub async fn switch_network(&self, chain_id: u64) -> Result<(), ClientError> {
        if !self.allowed_chain_ids.contains(&chain_id) {
            return Err(ClientError::NetworkMismatch { chain_id });
        }
        self.backend.switch_chain(chain_id).await?;
        self.apply_wallet_event(WalletEvent::ChainChanged(chain_id)).await;
        Ok(())
    }

    fn check_network(&self, chain_id: u64) -> Result<KnownNetwork, ClientError> {
        if !self.allowed_chain_ids.contains(&chain_id) {
            return Err(ClientError::NetworkMismatch { chain_id });
        }
        KnownNetwork::from_chain_id(chain_id).ok_or(ClientError::NetworkMismatch { chain_id })
    }

    fn require_session(&self) -> Result<Arc<Session>, ClientError> {
        self.session.load_full().ok_or(ClientError::ContractNotBound)
    }

    // ---- actions ----------------------------------------------------------

    /// Submit an action and wait for it to confirm.
    pub async fn submit(&self, action: Action) -> Result<SubmitOutcome, ClientError> {
        let kind = action.kind();
        let result = self.try_submit(action).await;
        if let Err(err) = &result {
            metrics::record_error(err.kind());
            tracing::warn!(action = %kind, error = %err, "Action failed");
        }
        result
    }

    async fn try_submit(&self, action: Action) -> Result<SubmitOutcome, ClientError> {
        let session = self.require_session()?;
        action.validate()?;

        let kind = action.kind();
        if self.transactions.require_verified_identity
            && matches!(kind, ActionKind::DeclareEmergency | ActionKind::EmergencyAccess)
            && !self.is_identity_verified(session.address).await?
        {
            return Err(ClientError::NotVerified);
        }

        let started = Instant::now();
        let tx_hash = self.backend.send(session.address, &action).await?;
        let record_id = self.txlog.record_pending(tx_hash, kind).await;
        tracing::info!(tx_hash = %tx_hash, action = %kind, from = %session.address, "Transaction submitted");

        let receipt = match self.wait_for_confirmation(tx_hash).await {
            Ok(receipt) if receipt.success => receipt,
            Ok(_) => {
                let err = ClientError::Reverted("Transaction reverted".to_string());
                self.txlog.fail(record_id, err.to_string()).await;
                metrics::record_transaction(kind, "failed");
                return Err(err);
            }
            Err(err) => {
                self.txlog.fail(record_id, err.to_string()).await;
                metrics::record_transaction(kind, "failed");
                return Err(err);
            }
        };

        self.txlog.confirm(record_id, receipt.block_number).await;
        metrics::record_transaction(kind, "confirmed");
        metrics::record_confirmation_latency(started.elapsed().as_secs_f64());

        let output = match kind {
            ActionKind::DeclareEmergency => ActionOutput::CrisisId(crisis_id_from_logs(&receipt.logs)),
            _ => ActionOutput::None,
        };
        tracing::info!(
            tx_hash = %tx_hash,
            action = %kind,
            block = receipt.block_number,
            "Transaction confirmed"
        );

        Ok(SubmitOutcome {
            record_id,
            tx_hash,
            block_number: receipt.block_number,
            output,
        })
    }

    /// Poll for the receipt until it has enough confirmations or reverted.
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<CallReceipt, ClientError> {
        match self.transactions.confirmation_timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), self.poll_receipt(tx_hash))
                .await
                .map_err(|_| {
                    ClientError::Network(format!(
                        "Transaction {} not confirmed within {} seconds",
                        tx_hash, secs
                    ))
                })?,
            None => self.poll_receipt(tx_hash).await,
        }
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<CallReceipt, ClientError> {
        let required = self.transactions.confirmation_blocks;
        let mut ticker = interval(Duration::from_millis(self.transactions.poll_interval_ms));

        loop {
            ticker.tick().await;

            let receipt = match self.backend.receipt(tx_hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
            };

            let current_block = self.backend.block_number().await?;
            match confirmation_status(&receipt, current_block, required) {
                ConfirmationStatus::Confirmed { .. } | ConfirmationStatus::Failed(_) => return Ok(receipt),
                ConfirmationStatus::Confirming { current, required } => {
                    tracing::debug!(
                        tx_hash = %tx_hash,
                        confirmations = current,
                        required = required,
                        "Waiting for confirmations"
                    );
                }
            }
        }
    }

    pub async fn register_identity(
        &self,
        did: impl Into<String>,
        sector: Sector,
        metadata_uri: Option<String>,
    ) -> Result<SubmitOutcome, ClientError> {
        self.submit(Action::RegisterIdentity {
            did: did.into(),
            sector,
            metadata_uri,
        })
        .await
    }

    pub async fn declare_emergency(
        &self,
        emergency_type: EmergencyType,
        location: impl Into<String>,
        encrypted_data: Option<String>,
        data_hash: Option<String>,
        initial_responders: Vec<Address>,
    ) -> Result<SubmitOutcome, ClientError> {
        self.submit(Action::DeclareEmergency {
            emergency_type,
            location: location.into(),
            encrypted_data,
            data_hash,
            initial_responders,
        })
        .await
    }

    pub async fn verify_crisis(&self, crisis_id: U256, signatures: Vec<Bytes>) -> Result<SubmitOutcome, ClientError> {
        self.submit(Action::VerifyCrisis { crisis_id, signatures }).await
    }

    pub async fn grant_access(
        &self,
        crisis_id: U256,
        grantee: Address,
        duration_secs: u64,
    ) -> Result<SubmitOutcome, ClientError> {
        self.submit(Action::GrantAccess {
            crisis_id,
            grantee,
            duration_secs,
        })
        .await
    }

    /// Break-glass access to a crisis for the connected account.
    pub async fn emergency_access(&self, crisis_id: U256) -> Result<SubmitOutcome, ClientError> {
        self.submit(Action::EmergencyAccess { crisis_id }).await
    }

    // ---- views ------------------------------------------------------------

    /// Run a read-only view. Never touches the transaction log.
    pub async fn query(&self, view: View) -> Result<ViewOutput, ClientError> {
        let result = match self.require_session() {
            Ok(_) => self.backend.read(&view).await.map_err(ClientError::from),
            Err(err) => Err(err),
        };
        match &result {
            Ok(_) => metrics::record_query(view.name()),
            Err(err) => {
                metrics::record_error(err.kind());
                tracing::warn!(view = view.name(), error = %err, "Query failed");
            }
        }
        result
    }

    pub async fn all_crises(&self) -> Result<Vec<Crisis>, ClientError> {
        match self.query(View::AllCrises).await? {
            ViewOutput::Crises(crises) => Ok(crises),
            other => Err(unexpected(other)),
        }
    }

    pub async fn crisis(&self, crisis_id: U256) -> Result<Option<Crisis>, ClientError> {
        match self.query(View::Crisis(crisis_id)).await? {
            ViewOutput::Crisis(crisis) => Ok(crisis),
            other => Err(unexpected(other)),
        }
    }

    pub async fn crisis_count(&self) -> Result<U256, ClientError> {
        match self.query(View::CrisisCount).await? {
            ViewOutput::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Identity registered for `wallet`, `None` if never registered.
    pub async fn identity(&self, wallet: Address) -> Result<Option<Identity>, ClientError> {
        match self.query(View::Identity(wallet)).await? {
            ViewOutput::Identity(identity) => Ok(identity),
            other => Err(unexpected(other)),
        }
    }

    pub async fn is_identity_verified(&self, wallet: Address) -> Result<bool, ClientError> {
        match self.query(View::IsVerified(wallet)).await? {
            ViewOutput::Verified(verified) => Ok(verified),
            other => Err(unexpected(other)),
        }
    }

    pub async fn can_access_crisis(&self, crisis_id: U256, user: Address) -> Result<bool, ClientError> {
        match self.query(View::CanAccess { crisis_id, user }).await? {
            ViewOutput::CanAccess(allowed) => Ok(allowed),
            other => Err(unexpected(other)),
        }
    }

    pub async fn access_logs(&self, crisis_id: U256) -> Result<Vec<AccessLogEntry>, ClientError> {
        match self.query(View::AccessLogs(crisis_id)).await? {
            ViewOutput::AccessLogs(logs) => Ok(logs),
            other => Err(unexpected(other)),
        }
    }

    // ---- transaction log --------------------------------------------------

    /// Snapshot of every transaction this client submitted.
    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.txlog.entries().await
    }

    pub fn transaction_log(&self) -> &TransactionLog {
        &self.txlog
    }

    // ---- wallet notifications --------------------------------------------

    /// Mirror a wallet notification into the session.
    pub async fn apply_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    tracing::info!("Wallet locked or accounts revoked");
                    self.disconnect();
                }
                Some(&address) => {
                    let Some(current) = self.session() else {
                        return;
                    };
                    let balance = self.fetch_balance_or_zero(address).await;
                    let next = Session {
                        address,
                        balance,
                        ..(*current).clone()
                    };
                    if self.commit_session(&current, next) {
                        tracing::info!(address = %address, "Active account changed");
                    } else {
                        tracing::debug!(address = %address, "Session changed during account switch, update dropped");
                    }
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                let Some(current) = self.session() else {
                    return;
                };
                match self.check_network(chain_id) {
                    Ok(network) => {
                        let balance = self.fetch_balance_or_zero(current.address).await;
                        let next = Session {
                            network,
                            chain_id,
                            balance,
                            ..(*current).clone()
                        };
                        if self.commit_session(&current, next) {
                            tracing::info!(network = %network, "Network changed");
                        } else {
                            tracing::debug!(chain_id = chain_id, "Session changed during network switch, update dropped");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(chain_id = chain_id, error = %err, "Wallet moved to unsupported network");
                        self.disconnect();
                    }
                }
            }
            WalletEvent::Disconnected => self.disconnect(),
        }
    }

    async fn fetch_balance_or_zero(&self, address: Address) -> U256 {
        match self.backend.balance(address).await {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "Balance refresh failed");
                U256::ZERO
            }
        }
    }

    /// Apply wallet notifications until `shutdown` fires or the wallet goes away.
    pub async fn watch_wallet_events(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut events = self.backend.events();
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Ok(event) => self.apply_wallet_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Missed wallet notifications");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!("Wallet event watcher stopped");
    }
}

impl std::fmt::Debug for LifelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifelineClient")
            .field("backend", &self.backend.name())
            .field("allowed_chain_ids", &self.allowed_chain_ids)
            .field("session", &self.session.load_full())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(block_number: u64, success: bool) -> CallReceipt {
        CallReceipt {
            tx_hash: TxHash::ZERO,
            block_number,
            success,
            logs: Vec::new(),
        }
    }

    #[test]
    fn test_mining_block_counts_as_first_confirmation() {
        assert_eq!(
            confirmation_status(&receipt(10, true), 10, 1),
            ConfirmationStatus::Confirmed { block_number: 10 }
        );
    }

    #[test]
    fn test_confirming_until_depth_reached() {
        assert_eq!(
            confirmation_status(&receipt(10, true), 11, 3),
            ConfirmationStatus::Confirming { current: 2, required: 3 }
        );
        assert_eq!(
            confirmation_status(&receipt(10, true), 12, 3),
            ConfirmationStatus::Confirmed { block_number: 10 }
        );
    }

    #[test]
    fn test_reverted_receipt_fails_immediately() {
        assert!(matches!(
            confirmation_status(&receipt(10, false), 50, 1),
            ConfirmationStatus::Failed(_)
        ));
    }

    #[test]
    fn test_lagging_head_does_not_underflow() {
        assert_eq!(
            confirmation_status(&receipt(10, true), 8, 2),
            ConfirmationStatus::Confirming { current: 1, required: 2 }
        );
    }
}
