//! Wallet backend capability trait.
//!
//! One trait covers everything the facade needs from a wallet plus the bound
//! contract. Real and simulated implementations sit behind it and are picked
//! by configuration.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::blockchain::types::{BackendResult, CallReceipt, WalletEvent};
use crate::model::{Action, View, ViewOutput};

#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Ask the wallet to expose its accounts.
    async fn request_accounts(&self) -> BackendResult<Vec<Address>>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> BackendResult<u64>;

    /// Native balance in wei.
    async fn balance(&self, account: Address) -> BackendResult<U256>;

    /// Ask the wallet to move to another chain.
    async fn switch_chain(&self, chain_id: u64) -> BackendResult<()>;

    /// Sign and broadcast an action from `from`, returning its hash.
    async fn send(&self, from: Address, action: &Action) -> BackendResult<TxHash>;

    /// Receipt of a mined transaction, `None` while pending.
    async fn receipt(&self, tx_hash: TxHash) -> BackendResult<Option<CallReceipt>>;

    /// Latest block number.
    async fn block_number(&self) -> BackendResult<u64>;

    /// Execute a read-only view.
    async fn read(&self, view: &View) -> BackendResult<ViewOutput>;

    /// Subscribe to wallet notifications.
    fn events(&self) -> broadcast::Receiver<WalletEvent>;
}
