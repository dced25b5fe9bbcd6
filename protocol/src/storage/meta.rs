//! ChainMeta: which block is the head, durable in the `meta` tree and
//! cached in memory for O(1) reads.
//!
//! The head is pinned by hash as well as sequence. Competing blocks at the
//! head depth may sit in the block tree; only the one the executor applied
//! is the head.
//!
//! The cache is updated first and logs its own undo; the durable write is
//! part of the caller's sled transaction. If that transaction fails the
//! undo restores the cache, so the two never disagree once the caller
//! returns.

use parking_lot::RwLock;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};
use sled::Tree;
use std::sync::Arc;

use super::db::{StoreError, StoreResult};
use super::rollback::Rollbacks;
use crate::crypto::hash::Digest;

const HEAD_SEQ_KEY: &[u8] = b"head_seq";
const HEAD_HASH_KEY: &[u8] = b"head_hash";

/// The applied head: its depth and its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    pub seq: u64,
    pub hash: Digest,
}

fn decode_seq(bytes: &[u8]) -> StoreResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Serialization("invalid head_seq bytes".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

fn read_head(tree: &Tree) -> StoreResult<Option<ChainHead>> {
    let seq = match tree.get(HEAD_SEQ_KEY)? {
        Some(bytes) => decode_seq(&bytes)?,
        None => return Ok(None),
    };
    let hash = tree
        .get(HEAD_HASH_KEY)?
        .and_then(|bytes| Digest::from_slice(&bytes))
        .ok_or_else(|| StoreError::Serialization("head_seq without a valid head_hash".to_string()))?;
    Ok(Some(ChainHead { seq, hash }))
}

#[derive(Debug, Clone)]
pub struct ChainMeta {
    tree: Tree,
    cache: Arc<RwLock<Option<ChainHead>>>,
}

impl ChainMeta {
    /// Open over the `meta` tree, priming the cache from disk.
    pub fn load(tree: Tree) -> StoreResult<Self> {
        let head = read_head(&tree)?;
        Ok(Self {
            tree,
            cache: Arc::new(RwLock::new(head)),
        })
    }

    /// The applied head, `None` before genesis.
    pub fn head(&self) -> Option<ChainHead> {
        *self.cache.read()
    }

    pub fn head_seq(&self) -> Option<u64> {
        self.head().map(|h| h.seq)
    }

    pub fn head_hash(&self) -> Option<Digest> {
        self.head().map(|h| h.hash)
    }

    /// What is actually on disk, bypassing the cache.
    pub fn durable_head(&self) -> StoreResult<Option<ChainHead>> {
        read_head(&self.tree)
    }

    /// Update the cache and record how to restore it.
    pub fn set_cached_logged(&self, head: ChainHead, rollbacks: &mut Rollbacks) {
        let previous = self.cache.write().replace(head);
        let cache = Arc::clone(&self.cache);
        rollbacks.push(move || *cache.write() = previous);
    }

    /// Set the head on its own: cache first, then one sled transaction;
    /// the cache is restored if the write fails.
    pub fn set_head(&self, head: ChainHead) -> StoreResult<()> {
        let mut rollbacks = Rollbacks::new();
        self.set_cached_logged(head, &mut rollbacks);
        match self.tree.transaction(|meta| persist_head(meta, head)) {
            Ok(()) => {
                rollbacks.commit();
                Ok(())
            }
            Err(e) => {
                rollbacks.run();
                Err(e.into())
            }
        }
    }
}

/// Durable half of a head update, inside the caller's transaction.
pub(crate) fn persist_head(
    meta: &TransactionalTree,
    head: ChainHead,
) -> ConflictableTransactionResult<(), StoreError> {
    meta.insert(HEAD_SEQ_KEY, head.seq.to_be_bytes().to_vec())?;
    meta.insert(HEAD_HASH_KEY, head.hash.0.to_vec())?;
    Ok(())
}
