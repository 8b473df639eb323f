//! CashBridge Claimer
//!
//! Offline operator tool for the CashToken bridge. It never broadcasts and
//! never holds wallet keys: claim and exit commands read a UTXO snapshot and
//! print a signing envelope for an external wallet.
//!
//! # Commands
//!
//! - `build-claim` - Redeem a matured claim NFT against the reserve
//! - `build-exit` - Deposit reserve tokens toward an account-chain address
//! - `decode-commitment` - Show the amount and minimum age of a claim NFT
//! - `exit-id` - Keccak exit id of an exit data string
//! - `authorize-exit` - Sign a `process_exit` release as the authorizer

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use claimer::commands;
use claimer::config::{load_authorizer_key, Config};
use claimer::snapshot::Snapshot;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cashbridge-claimer", version, about = "CashToken bridge claim and exit tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a claim envelope from a UTXO snapshot
    BuildClaim {
        #[arg(long)]
        snapshot: PathBuf,
        /// Claim NFT holder (CashAddr)
        #[arg(long)]
        address: String,
        /// Specific claim NFT as txid:vout; defaults to the first one found
        #[arg(long)]
        claim: Option<String>,
    },
    /// Build an exit envelope from a UTXO snapshot
    BuildExit {
        #[arg(long)]
        snapshot: PathBuf,
        /// Reserve token holder (CashAddr); also receives change
        #[arg(long)]
        address: String,
        /// Registered account-chain id
        #[arg(long)]
        dest_chain: u32,
        /// 20-byte destination account (0x hex)
        #[arg(long)]
        dest_account: String,
    },
    /// Decode a 16-byte claim commitment
    DecodeCommitment { commitment: String },
    /// Compute the exit id of an exit data string
    ExitId { data: String },
    /// Sign an exit release with AUTHORIZER_PRIVATE_KEY
    AuthorizeExit {
        #[arg(long)]
        exit_id: String,
        #[arg(long)]
        amount: u128,
        #[arg(long)]
        caller: String,
    },
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::BuildClaim {
            snapshot,
            address,
            claim,
        } => {
            let config = Config::load()?;
            info!(?config, "Configuration loaded");
            let snapshot = Snapshot::load(&snapshot)?;
            print_json(&commands::build_claim(&config, snapshot, &address, claim.as_deref()).await?)
        }
        Command::BuildExit {
            snapshot,
            address,
            dest_chain,
            dest_account,
        } => {
            let config = Config::load()?;
            info!(?config, "Configuration loaded");
            let snapshot = Snapshot::load(&snapshot)?;
            print_json(
                &commands::build_exit(&config, snapshot, &address, dest_chain, &dest_account)
                    .await?,
            )
        }
        Command::DecodeCommitment { commitment } => {
            print_json(&commands::decode_commitment(&commitment)?)
        }
        Command::ExitId { data } => print_json(&commands::exit_id(&data)),
        Command::AuthorizeExit {
            exit_id,
            amount,
            caller,
        } => {
            let key = load_authorizer_key()?;
            print_json(&commands::authorize_exit(&key, &exit_id, amount, &caller)?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cashbridge_claimer=debug"));

    // stdout carries JSON output only
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
