// Copyright (c) 2026 Helio Contributors. MIT License.
// See LICENSE for details.

//! # Helio Node
//!
//! Entry point for the `helio-node` binary. Parses CLI arguments, loads
//! `helio.toml`, initializes logging, and runs one operator command against
//! the ledger in the data directory.
//!
//! - `init`        : create the ledger and execute the genesis block
//! - `status`      : head block and pool summary
//! - `keygen`      : fresh key pair and address
//! - `balance`     : coins and coin-hours for addresses
//! - `verify-sigs` : audit stored block signatures
//! - `version`     : build version information

mod cli;
mod config;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::Path;

use helio_protocol::chain::Blockchain;
use helio_protocol::crypto::{Address, SecretKey};
use helio_protocol::storage::LedgerDb;

use cli::{BalanceArgs, Commands, HelioNodeCli, InitArgs};
use config::NodeConfig;
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = HelioNodeCli::parse();

    let config_path = NodeConfig::path(cli.config.as_deref(), &cli.data_dir);
    let node_config = NodeConfig::load(&config_path)?;
    let format = cli
        .log_format
        .as_deref()
        .map(LogFormat::from_str_lossy)
        .unwrap_or(node_config.log.format);
    logging::init_logging(&node_config.log.level, format);

    match cli.command {
        Commands::Init(args) => init_ledger(&cli.data_dir, &config_path, node_config, args),
        Commands::Status => status(&cli.data_dir, &node_config),
        Commands::Keygen => keygen(),
        Commands::Balance(args) => balance(&cli.data_dir, &node_config, args),
        Commands::VerifySigs => verify_sigs(&cli.data_dir, &node_config),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Open the ledger under `data_dir` with the configured chain settings.
fn open_chain(data_dir: &Path, node_config: &NodeConfig) -> Result<Blockchain> {
    let db_path = data_dir.join("db");
    let db = LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "database opened");
    Blockchain::open(db, &node_config.chain).context("failed to load ledger state")
}

fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .with_context(|| format!("invalid address {s}"))
}

/// Creates the data directory, records the publisher in the config, and
/// executes a signed genesis block.
fn init_ledger(
    data_dir: &Path,
    config_path: &Path,
    mut node_config: NodeConfig,
    args: InitArgs,
) -> Result<()> {
    let publisher = SecretKey::from_hex(args.publisher_secret.trim())
        .context("invalid publisher secret key")?;
    let owner = parse_address(&args.address)?;
    let time = args.time.unwrap_or_else(unix_now);

    let publisher_hex = publisher.public_key().to_hex();
    match node_config.chain.publisher_key.as_deref() {
        Some(existing) if existing != publisher_hex => {
            bail!("config already trusts publisher {existing}, refusing to re-key")
        }
        _ => node_config.chain.publisher_key = Some(publisher_hex.clone()),
    }

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    let chain = open_chain(data_dir, &node_config)?;

    let genesis = chain
        .create_genesis_block(owner, args.coins, args.hours, time)
        .context("failed to build genesis block")?;
    let signed = Blockchain::sign_block(genesis, &publisher)?;
    chain
        .execute_block_at(&signed, time)
        .context("failed to execute genesis block")?;
    chain.flush()?;
    node_config.save(config_path)?;

    tracing::info!(
        hash = %signed.block.hash(),
        address = %owner,
        coins = args.coins,
        "ledger initialized"
    );

    println!("Ledger initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Publisher key  : {}", publisher_hex);
    println!("  Genesis hash   : {}", signed.block.hash());
    Ok(())
}

fn status(data_dir: &Path, node_config: &NodeConfig) -> Result<()> {
    let chain = open_chain(data_dir, node_config)?;
    let head = chain.head()?;
    let out = json!({
        "head_seq": chain.head_seq(),
        "head_hash": head.as_ref().map(|h| h.hash().to_hex()),
        "head_time": head.as_ref().map(|h| h.time),
        "ux_hash": chain.ux_hash().to_hex(),
        "unspent_outputs": chain.unspent().len(),
        "blocks": chain.block_tree().len(),
        "publisher": chain.publisher().map(|p| p.to_hex()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn keygen() -> Result<()> {
    let key = SecretKey::generate();
    let out = json!({
        "secret_key": key.to_hex(),
        "public_key": key.public_key().to_hex(),
        "address": key.address().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn balance(data_dir: &Path, node_config: &NodeConfig, args: BalanceArgs) -> Result<()> {
    let addresses = args
        .addresses
        .iter()
        .map(|a| parse_address(a))
        .collect::<Result<Vec<_>>>()?;
    let chain = open_chain(data_dir, node_config)?;
    let balance = chain.balance(&addresses, args.at.unwrap_or_else(unix_now))?;
    println!("{}", serde_json::to_string_pretty(&balance)?);
    Ok(())
}

fn verify_sigs(data_dir: &Path, node_config: &NodeConfig) -> Result<()> {
    let chain = open_chain(data_dir, node_config)?;
    let Some(publisher) = chain.publisher() else {
        bail!("no publisher key configured, nothing to verify against");
    };
    let audit = chain
        .block_sigs()
        .verify_all(publisher, chain.block_tree())
        .context("signature audit failed")?;

    let out = json!({
        "checked": audit.checked,
        "invalid": audit.invalid.iter().map(|h| h.to_hex()).collect::<Vec<_>>(),
        "orphaned": audit.orphaned.iter().map(|h| h.to_hex()).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if !audit.is_clean() {
        tracing::warn!(
            invalid = audit.invalid.len(),
            orphaned = audit.orphaned.len(),
            "signature audit found problems"
        );
        bail!("signature audit failed");
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("helio-node {}", env!("CARGO_PKG_VERSION"));
    println!("block     v{}", helio_protocol::config::BLOCK_VERSION);
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
