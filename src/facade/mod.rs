//! Client facade subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → client.rs (session, submit, query)
//!     → WalletBackend (rpc or mock)
//!     → error.rs normalizes failures
//!     → txlog.rs records submitted transactions
//! ```

pub mod client;
pub mod error;
pub mod txlog;

pub use client::{confirmation_status, ActionOutput, LifelineClient, Session, SubmitOutcome};
pub use error::{normalize, ClientError, ErrorKind};
pub use txlog::{TransactionLog, TransactionRecord, TxStatus};
