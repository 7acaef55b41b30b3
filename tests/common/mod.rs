//! Shared helpers for integration tests.

use std::sync::Arc;

use alloy::primitives::Address;
use lifeline_client::blockchain::MockBackend;
use lifeline_client::config::ClientConfig;
use lifeline_client::LifelineClient;

/// Default mock account (Anvil account #0).
#[allow(dead_code)]
pub fn default_account() -> Address {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
}

/// Mock-backed configuration with fast receipt polling.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.transactions.poll_interval_ms = 5;
    config.transactions.confirmation_timeout_secs = Some(5);
    config
}

/// A client over a fresh mock wallet, plus a handle to drive the mock.
pub fn mock_client_with(config: ClientConfig) -> (Arc<MockBackend>, LifelineClient) {
    let contract = config.network.contract_address.parse().unwrap();
    let backend = Arc::new(MockBackend::new(config.mock.clone(), contract).unwrap());
    let client = LifelineClient::new(backend.clone(), &config);
    (backend, client)
}

#[allow(dead_code)]
pub fn mock_client() -> (Arc<MockBackend>, LifelineClient) {
    mock_client_with(test_config())
}

/// Connected client with a registered (auto-verified) identity.
#[allow(dead_code)]
pub async fn registered_client() -> (Arc<MockBackend>, LifelineClient) {
    let (backend, client) = mock_client();
    client.connect().await.unwrap();
    client
        .register_identity(
            "did:lifeline:responder-1",
            lifeline_client::model::Sector::Healthcare,
            None,
        )
        .await
        .unwrap();
    (backend, client)
}
