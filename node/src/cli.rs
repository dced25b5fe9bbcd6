//! # CLI Interface
//!
//! Defines the command-line argument structure for `helio-node` using
//! `clap` derive. Every flag that names a path or a secret can also come
//! from the environment.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Helio ledger operator tool.
///
/// Bootstraps a ledger with its genesis block, reports its state, and
/// audits the publisher signatures it has stored.
#[derive(Parser, Debug)]
#[command(
    name = "helio-node",
    about = "Helio ledger operator tool",
    version,
    propagate_version = true
)]
pub struct HelioNodeCli {
    /// Ledger data directory (sled database and `helio.toml`).
    #[arg(long, short = 'd', global = true, env = "HELIO_DATA_DIR", default_value = "./helio-data")]
    pub data_dir: PathBuf,

    /// Configuration file. Defaults to `helio.toml` in the data directory.
    #[arg(long, short = 'c', global = true, env = "HELIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format override: `pretty` or `json`.
    #[arg(long, global = true, env = "HELIO_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Helio node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger and execute its genesis block.
    Init(InitArgs),
    /// Print the head block and pool summary as JSON.
    Status,
    /// Generate a fresh secp256k1 key and print it with its address.
    Keygen,
    /// Print coins and coin-hours held by one or more addresses.
    Balance(BalanceArgs),
    /// Check every stored block signature against the publisher key.
    VerifySigs,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Hex-encoded publisher secret key. Signs the genesis block; its
    /// public key is written to the config as the trusted publisher.
    #[arg(long, env = "HELIO_PUBLISHER_SECRET", hide_env_values = true)]
    pub publisher_secret: String,

    /// Base58 address that receives the genesis output.
    #[arg(long)]
    pub address: String,

    /// Coins minted by the genesis output.
    #[arg(long, default_value_t = 100_000_000)]
    pub coins: u64,

    /// Coin-hours minted by the genesis output.
    #[arg(long, default_value_t = 0)]
    pub hours: u64,

    /// Genesis timestamp (unix seconds). Defaults to now.
    #[arg(long)]
    pub time: Option<u64>,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Base58 addresses to sum over.
    #[arg(required = true)]
    pub addresses: Vec<String>,

    /// Evaluate coin-hours at this unix time instead of now.
    #[arg(long)]
    pub at: Option<u64>,
}
