//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → backend selection + LifelineClient
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BackendKind;
pub use schema::ClientConfig;
pub use schema::MockConfig;
pub use schema::NetworkConfig;
pub use schema::ObservabilityConfig;
pub use schema::TransactionConfig;
pub use schema::WalletConfig;
