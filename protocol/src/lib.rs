// Copyright (c) 2026 Helio Contributors. MIT License.
// See LICENSE for details.

//! # Helio Protocol: Settlement Core
//!
//! The part of Helio that decides what money exists. Everything else (the
//! network, the wallet, the explorer) asks this crate two questions: "is
//! this block valid?" and "who owns what now?"
//!
//! Helio is an unspent-output ledger. Coins live in outputs, outputs are
//! spent whole, and a block is accepted only if every input is live, every
//! signature checks out, coins are conserved, and coin-hours cover what the
//! outputs claim.
//!
//! ## Architecture
//!
//! - **crypto**: SHA-256 digests, secp256k1 keys, recoverable signatures,
//!   base58check addresses.
//! - **codec**: The canonical byte encoding every hash is computed over.
//! - **transaction**: Outputs, transactions, signing and structural checks.
//! - **storage**: sled-backed block tree, unspent pool, head and
//!   signature stores.
//! - **chain**: Block validation and atomic execution.
//! - **config**: Protocol constants and ledger settings.
//!
//! ## Design Philosophy
//!
//! 1. Validate first, mutate second. A rejected block leaves no trace.
//! 2. One block, one sled transaction. A crash never half-applies a block.
//! 3. Checked arithmetic on every amount. Overflow is an error, not a wrap.
//! 4. If the ledger's own bookkeeping disagrees with itself, stop the
//!    process rather than persist a lie.

pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod storage;
pub mod transaction;

mod invariant;

pub use chain::{Balance, Blockchain, ChainError, ChainResult};
pub use config::ChainConfig;
pub use crypto::{Address, Digest, PubKey, SecretKey, Sig};
pub use storage::{Block, BlockHeader, LedgerDb, SignedBlock};
pub use transaction::{Transaction, TransactionBuilder, UxOut};
