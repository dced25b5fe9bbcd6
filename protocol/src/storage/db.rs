//! # LedgerDb: Persistent Storage Engine
//!
//! The persistence layer for the Helio ledger, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree         | Key                  | Value                     |
//! |--------------|----------------------|---------------------------|
//! | `blocks`     | block hash (32B)     | `bincode(Block)`          |
//! | `tree`       | depth (8B BE)        | `bincode(Vec<HashPair>)`  |
//! | `unspent`    | output hash (32B)    | `bincode(UxOut)`          |
//! | `meta`       | key (UTF-8)          | value (bytes)             |
//! | `block_sigs` | block hash (32B)     | `bincode(Sig)`            |
//!
//! Depths are stored as big-endian u64 so sled's lexicographic order is
//! numeric order and range scans over heights work naturally.
//!
//! ## Atomicity
//!
//! Executing a block touches `blocks`, `tree`, `unspent` and `meta`. Those
//! four writes go through one sled transaction: either everything lands
//! or nothing does. `block_sigs` is written on its own, keyed by block
//! hash, and is never read back as proof that a block was applied.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;

use crate::config::{TREE_BLOCKS, TREE_BLOCK_SIGS, TREE_GRAPH, TREE_META, TREE_UNSPENT};
use crate::crypto::hash::Digest;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors from the storage layer, including BlockTree's structural rules.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A non-genesis block with a zero parent hash.
    #[error("block at depth {0} has no parent")]
    NoParent(u64),

    #[error("block {0} already exists")]
    BlockExists(Digest),

    /// No block at the previous depth has the referenced hash.
    #[error("parent {0} not found at the previous depth")]
    WrongParent(Digest),

    #[error("block {0} has a child and cannot be removed")]
    HasChild(Digest),

    /// A different signature is already stored for this block hash.
    #[error("block {0} already has a different signature")]
    SignatureExists(Digest),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Sled(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

pub(crate) fn encode_value<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Big-endian depth key.
pub(crate) fn depth_key(depth: u64) -> [u8; 8] {
    depth.to_be_bytes()
}

pub(crate) fn depth_from_key(key: &[u8]) -> StoreResult<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| StoreError::Serialization("invalid depth key".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Handle to the sled database and its named trees.
///
/// Cheap to clone; sled trees are reference-counted and thread-safe.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    pub(crate) blocks: Tree,
    pub(crate) graph: Tree,
    pub(crate) unspent: Tree,
    pub(crate) meta: Tree,
    pub(crate) block_sigs: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that lives in memory and disappears on drop.
    ///
    /// Ideal for unit tests. No filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            blocks: db.open_tree(TREE_BLOCKS)?,
            graph: db.open_tree(TREE_GRAPH)?,
            unspent: db.open_tree(TREE_UNSPENT)?,
            meta: db.open_tree(TREE_META)?,
            block_sigs: db.open_tree(TREE_BLOCK_SIGS)?,
            db,
        })
    }

    /// Number of stored blocks, across all forks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Force all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.block_count(), 0);
        assert!(db.unspent.is_empty());
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = LedgerDb::open(dir.path()).expect("should open db");
        db.meta.insert(&b"marker"[..], b"1".to_vec()).unwrap();
        db.flush().unwrap();
        drop(db);

        let db2 = LedgerDb::open(dir.path()).expect("should reopen db");
        assert!(db2.meta.get(b"marker").unwrap().is_some());
    }

    #[test]
    fn depth_keys_sort_numerically() {
        assert!(depth_key(2) < depth_key(10));
        assert!(depth_key(255) < depth_key(256));
        assert_eq!(depth_from_key(&depth_key(77)).unwrap(), 77);
        assert!(depth_from_key(&[1, 2]).is_err());
    }

    #[test]
    fn transaction_abort_unwraps_to_inner_error() {
        let err: StoreError =
            TransactionError::Abort(StoreError::NoParent(4)).into();
        assert!(matches!(err, StoreError::NoParent(4)));
    }
}
