//! LifelineDAG command-line client.
//!
//! Every command connects the configured wallet, runs one facade operation
//! and prints the result as JSON on stdout. Failures print the user-facing
//! message on stderr and exit with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use lifeline_client::blockchain::KnownNetwork;
use lifeline_client::config::{load_config, BackendKind, ClientConfig};
use lifeline_client::lifecycle::{wait_for_termination, Shutdown};
use lifeline_client::model::{CrisisIdOutcome, EmergencyType, Sector};
use lifeline_client::observability::init_logging;
use lifeline_client::{ClientError, LifelineClient};

#[derive(Parser)]
#[command(name = "lifeline")]
#[command(about = "Client for the LifelineDAG emergency coordination contract", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force the in-memory mock wallet
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported networks
    Networks,
    /// Connect and show the wallet session
    Status,
    /// Register a responder identity
    Register {
        /// Decentralized identifier, e.g. did:lifeline:alice
        did: String,
        /// Sector slug or numeric code
        #[arg(long, default_value = "healthcare")]
        sector: Sector,
        #[arg(long)]
        metadata_uri: Option<String>,
    },
    /// Declare an emergency
    Declare {
        /// Emergency type slug or numeric code
        #[arg(long = "type")]
        emergency_type: EmergencyType,
        #[arg(long)]
        location: String,
        #[arg(long)]
        encrypted_data: Option<String>,
        #[arg(long)]
        data_hash: Option<String>,
        /// Responder granted access from the start; repeatable
        #[arg(long = "responder")]
        responders: Vec<Address>,
    },
    /// Add a verification to a crisis
    Verify {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
        /// Hex-encoded signature; repeatable
        #[arg(long = "signature")]
        signatures: Vec<Bytes>,
    },
    /// Grant a wallet time-limited access to a crisis
    Grant {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
        grantee: Address,
        /// Access duration in seconds
        #[arg(long, default_value_t = 86_400)]
        duration: u64,
    },
    /// Break-glass access to a crisis for the connected wallet
    BreakGlass {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
    },
    /// List all crises
    Crises,
    /// Show one crisis
    Crisis {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
    },
    /// Show the identity registered for a wallet (default: connected wallet)
    Identity { wallet: Option<Address> },
    /// Check whether a wallet's identity is verified (default: connected wallet)
    Verified { wallet: Option<Address> },
    /// Check whether a wallet may access a crisis (default: connected wallet)
    CanAccess {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
        user: Option<Address>,
    },
    /// Show the access log of a crisis
    AccessLogs {
        #[arg(value_parser = parse_crisis_id)]
        crisis_id: U256,
    },
    /// Run a scripted register/declare/grant flow against the mock wallet
    Demo,
    /// Mirror wallet notifications until interrupted
    Watch,
}

fn parse_crisis_id(s: &str) -> Result<U256, String> {
    s.parse::<U256>()
        .map_err(|e| format!("invalid crisis id '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };
    if cli.mock || matches!(cli.command, Commands::Demo) {
        config.wallet.backend = BackendKind::Mock;
    }

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), ClientError> {
    if let Commands::Networks = command {
        let networks: Vec<_> = KnownNetwork::ALL
            .into_iter()
            .map(|n| {
                json!({
                    "name": n.name(),
                    "chain_id": n.chain_id(),
                    "currency": n.currency(),
                    "allowed": config.network.allowed_chain_ids.contains(&n.chain_id()),
                })
            })
            .collect();
        return print(&networks);
    }

    let client = Arc::new(LifelineClient::from_config(config)?);
    let session = client.connect().await?;
    let me = session.address;

    match command {
        Commands::Networks => Ok(()),
        Commands::Status => print(&*session),
        Commands::Register {
            did,
            sector,
            metadata_uri,
        } => print(&client.register_identity(did, sector, metadata_uri).await?),
        Commands::Declare {
            emergency_type,
            location,
            encrypted_data,
            data_hash,
            responders,
        } => print(
            &client
                .declare_emergency(emergency_type, location, encrypted_data, data_hash, responders)
                .await?,
        ),
        Commands::Verify {
            crisis_id,
            signatures,
        } => print(&client.verify_crisis(crisis_id, signatures).await?),
        Commands::Grant {
            crisis_id,
            grantee,
            duration,
        } => print(&client.grant_access(crisis_id, grantee, duration).await?),
        Commands::BreakGlass { crisis_id } => print(&client.emergency_access(crisis_id).await?),
        Commands::Crises => print(&client.all_crises().await?),
        Commands::Crisis { crisis_id } => print(&client.crisis(crisis_id).await?),
        Commands::Identity { wallet } => print(&client.identity(wallet.unwrap_or(me)).await?),
        Commands::Verified { wallet } => {
            print(&client.is_identity_verified(wallet.unwrap_or(me)).await?)
        }
        Commands::CanAccess { crisis_id, user } => {
            print(&client.can_access_crisis(crisis_id, user.unwrap_or(me)).await?)
        }
        Commands::AccessLogs { crisis_id } => print(&client.access_logs(crisis_id).await?),
        Commands::Demo => demo(&client).await,
        Commands::Watch => {
            let shutdown = Shutdown::new();
            let watcher = {
                let client = client.clone();
                let stop = shutdown.subscribe();
                tokio::spawn(async move { client.watch_wallet_events(stop).await })
            };
            tracing::info!(address = %me, "Watching wallet notifications, press Ctrl-C to stop");
            wait_for_termination(&shutdown).await;
            if let Err(e) = watcher.await {
                tracing::warn!(error = %e, "Wallet event watcher ended abnormally");
            }
            print(&*client.session().unwrap_or(session))
        }
    }
}

/// Register, declare, grant and read back against the connected wallet.
async fn demo(client: &LifelineClient) -> Result<(), ClientError> {
    let session = client.session().ok_or(ClientError::ContractNotBound)?;

    let registered = client
        .register_identity("did:lifeline:demo-responder", Sector::Healthcare, None)
        .await?;
    let declared = client
        .declare_emergency(
            EmergencyType::NaturalDisaster,
            "Kathmandu, Nepal",
            None,
            None,
            Vec::new(),
        )
        .await?;

    let crisis_id = match declared.crisis_id() {
        Some(CrisisIdOutcome::Assigned(id)) => id,
        _ => return Err(ClientError::Unknown("crisis id not reported".to_string())),
    };
    let responder = Address::repeat_byte(0x42);
    let granted = client.grant_access(crisis_id, responder, 3_600).await?;

    print(&json!({
        "session": &*session,
        "register": registered,
        "declare": declared,
        "grant": granted,
        "crisis": client.crisis(crisis_id).await?,
        "responder_can_access": client.can_access_crisis(crisis_id, responder).await?,
        "access_logs": client.access_logs(crisis_id).await?,
        "transactions": client.transactions().await,
    }))
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), ClientError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Unknown(format!("failed to encode output: {}", e)))?;
    println!("{}", out);
    Ok(())
}
