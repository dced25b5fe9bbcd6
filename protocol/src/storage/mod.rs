//! # Storage Module
//!
//! The data the ledger keeps, and where it keeps it.
//!
//! ## Architecture
//!
//! ```text
//! block.rs     Block, BlockHeader, SignedBlock, HashPair
//! db.rs        LedgerDb: sled handle, named trees, StoreError
//! tree.rs      BlockTree: blocks + per-depth graph, Walker policy
//! unspent.rs   UnspentPool: in-memory UTXO set with XOR checksum
//! meta.rs      ChainMeta: cached + durable head (sequence and hash)
//! sigs.rs      BlockSigs: publisher signature per block hash
//! rollback.rs  Undo log for in-memory state
//! ```
//!
//! ## Data Flow
//!
//! ```text
//!  UnspentPool ─┐
//!  ChainMeta  ──┼─ in memory, logged to Rollbacks
//!               │
//!  one sled transaction over  blocks | tree | unspent | meta | block_sigs
//! ```
//!
//! ## Design Decisions
//!
//! 1. **sled transactions are the atomicity unit.** Everything durable
//!    about applying a block commits together or not at all.
//!
//! 2. **Undo only what sled cannot reach.** The in-memory pool and head
//!    cache log compensating closures; nothing durable does.
//!
//! 3. **Bincode for on-disk values.** Compact and fast. Hash identity
//!    comes from the canonical codec, never from bincode.

pub mod block;
pub mod db;
pub mod meta;
pub mod rollback;
pub mod sigs;
pub mod tree;
pub mod unspent;

pub use block::{Block, BlockBody, BlockHeader, HashPair, SignedBlock};
pub use db::{LedgerDb, StoreError, StoreResult};
pub use meta::{ChainHead, ChainMeta};
pub use rollback::Rollbacks;
pub use sigs::{BlockSigs, SigAudit};
pub use tree::{BlockTree, FirstRecorded, Walker, WalkerFn};
pub use unspent::{UnspentError, UnspentPool};
