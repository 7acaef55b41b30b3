//! LifelineDAG client library.
//!
//! A facade over a wallet and the LifelineDAG emergency coordination
//! contract: connect a wallet, submit contract actions, run views, and keep
//! a local log of submitted transactions.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller (CLI, service)
//!        │
//!        ▼
//!   facade::LifelineClient ──── facade::txlog (append-only log)
//!        │        │
//!        │        └──────────── facade::error (normalization)
//!        ▼
//!   blockchain::WalletBackend
//!        ├── RpcBackend  (alloy provider + local signer)
//!        └── MockBackend (in-memory contract simulation)
//! ```

pub mod blockchain;
pub mod config;
pub mod facade;
pub mod lifecycle;
pub mod model;
pub mod observability;

pub use config::ClientConfig;
pub use facade::{ClientError, LifelineClient};
pub use lifecycle::Shutdown;
