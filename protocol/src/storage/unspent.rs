//! # UnspentPool
//!
//! The set of spendable outputs, keyed by output hash, plus an aggregate
//! checksum:
//!
//! ```text
//! xor_hash = hash(o1) XOR hash(o2) XOR ... XOR hash(on)
//! ```
//!
//! XOR is its own inverse, so inserting and removing an output are the
//! same O(1) update. The checksum of the pool right after a block is
//! applied is recorded in that block's header as `ux_hash`.
//!
//! The authoritative copy is in memory. Block execution mirrors every
//! change into the `unspent` sled tree within the block's storage
//! transaction (see [`persist_changes`]), and [`UnspentPool::load`] rebuilds
//! the map and checksum from that tree on startup.

use parking_lot::RwLock;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::Tree;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::db::{decode_value, encode_value, StoreError, StoreResult};
use super::rollback::Rollbacks;
use crate::crypto::hash::Digest;
use crate::crypto::keys::Address;
use crate::transaction::UxOut;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnspentError {
    #[error("output {0} is already in the unspent pool")]
    DuplicateOutput(Digest),

    #[error("output {0} is not in the unspent pool")]
    UnknownOutput(Digest),
}

#[derive(Debug, Default)]
struct PoolInner {
    members: HashMap<Digest, UxOut>,
    xor_hash: Digest,
}

impl PoolInner {
    fn insert(&mut self, ux: UxOut) -> Result<Digest, UnspentError> {
        let hash = ux.hash();
        if self.members.contains_key(&hash) {
            return Err(UnspentError::DuplicateOutput(hash));
        }
        self.members.insert(hash, ux);
        self.xor_hash ^= hash;
        Ok(hash)
    }

    fn remove(&mut self, hash: &Digest) -> Option<UxOut> {
        let ux = self.members.remove(hash)?;
        self.xor_hash ^= *hash;
        Some(ux)
    }
}

/// The unspent output set. Cloning shares the same underlying pool.
#[derive(Debug, Clone, Default)]
pub struct UnspentPool {
    inner: Arc<RwLock<PoolInner>>,
}

impl UnspentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the pool from the `unspent` tree.
    pub fn load(tree: &Tree) -> StoreResult<Self> {
        let mut inner = PoolInner::default();
        for entry in tree.iter() {
            let (key, value) = entry?;
            let ux: UxOut = decode_value(&value)?;
            let hash = inner
                .insert(ux)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if key[..] != hash.0[..] {
                return Err(StoreError::Serialization(format!(
                    "unspent entry stored under the wrong key for {hash}"
                )));
            }
        }
        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Insert an output. Fails without touching the pool if its hash is
    /// already present.
    pub fn add(&self, ux: UxOut) -> Result<(), UnspentError> {
        self.inner.write().insert(ux).map(|_| ())
    }

    pub fn get(&self, hash: &Digest) -> Option<UxOut> {
        self.inner.read().members.get(hash).copied()
    }

    pub fn has(&self, hash: &Digest) -> bool {
        self.inner.read().members.contains_key(hash)
    }

    /// Remove an output if present. Removing an absent hash is a no-op.
    pub fn del(&self, hash: &Digest) {
        self.inner.write().remove(hash);
    }

    pub fn del_multiple(&self, hashes: &[Digest]) {
        let mut inner = self.inner.write();
        for hash in hashes {
            inner.remove(hash);
        }
    }

    /// Resolve every hash, in order. Fails on the first absent one.
    pub fn get_multiple(&self, hashes: &[Digest]) -> Result<Vec<UxOut>, UnspentError> {
        let inner = self.inner.read();
        hashes
            .iter()
            .map(|h| {
                inner
                    .members
                    .get(h)
                    .copied()
                    .ok_or(UnspentError::UnknownOutput(*h))
            })
            .collect()
    }

    /// True if any of `hashes` is already live.
    pub fn collides(&self, hashes: &[Digest]) -> bool {
        let inner = self.inner.read();
        hashes.iter().any(|h| inner.members.contains_key(h))
    }

    /// Linear scan. Meant for wallet queries, not validation.
    pub fn all_for_address(&self, address: &Address) -> Vec<UxOut> {
        self.all_for_addresses(std::slice::from_ref(address))
    }

    pub fn all_for_addresses(&self, addresses: &[Address]) -> Vec<UxOut> {
        let inner = self.inner.read();
        inner
            .members
            .values()
            .filter(|ux| addresses.contains(&ux.body.address))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().members.is_empty()
    }

    /// XOR of every member's hash.
    pub fn xor_hash(&self) -> Digest {
        self.inner.read().xor_hash
    }

    /// The checksum the pool would have after removing `spent` and adding
    /// `created`. Does not modify the pool.
    pub fn xor_hash_after(&self, spent: &[Digest], created: &[Digest]) -> Digest {
        let inner = self.inner.read();
        let mut acc = inner.xor_hash;
        for h in spent {
            if inner.members.contains_key(h) {
                acc ^= *h;
            }
        }
        for h in created {
            acc ^= *h;
        }
        acc
    }

    /// Every member, in no particular order.
    pub fn snapshot(&self) -> Vec<UxOut> {
        self.inner.read().members.values().copied().collect()
    }

    // -- Rollback-aware mutation -------------------------------------------

    /// [`add`](Self::add), recording how to take it back.
    pub fn add_logged(&self, ux: UxOut, rollbacks: &mut Rollbacks) -> Result<(), UnspentError> {
        let hash = self.inner.write().insert(ux)?;
        let pool = self.clone();
        rollbacks.push(move || pool.del(&hash));
        Ok(())
    }

    /// [`del`](Self::del), recording how to put the output back.
    pub fn del_logged(&self, hash: &Digest, rollbacks: &mut Rollbacks) {
        if let Some(ux) = self.inner.write().remove(hash) {
            let pool = self.clone();
            rollbacks.push(move || {
                // Re-inserting what was just removed cannot collide.
                let _ = pool.add(ux);
            });
        }
    }
}

/// Mirror a block's pool changes into the `unspent` tree, inside the
/// caller's sled transaction.
pub(crate) fn persist_changes(
    tree: &TransactionalTree,
    spent: &[Digest],
    created: &[UxOut],
) -> ConflictableTransactionResult<(), StoreError> {
    for hash in spent {
        tree.remove(&hash.0[..])?;
    }
    for ux in created {
        let value = encode_value(ux).map_err(ConflictableTransactionError::Abort)?;
        tree.insert(&ux.hash().0[..], value)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::xor_all;
    use crate::storage::db::LedgerDb;
    use crate::transaction::{UxBody, UxHead};

    fn addr(b: u8) -> Address {
        Address {
            version: 0,
            key: [b; 20],
        }
    }

    fn ux(owner: u8, coins: u64) -> UxOut {
        UxOut {
            head: UxHead { time: 0, bk_seq: 0 },
            body: UxBody {
                src_transaction: Digest::new([owner; 32]),
                address: addr(owner),
                coins,
                hours: 0,
            },
        }
    }

    #[test]
    fn add_then_get() {
        let pool = UnspentPool::new();
        let o = ux(1, 10);
        pool.add(o).unwrap();
        assert_eq!(pool.get(&o.hash()), Some(o));
        assert!(pool.has(&o.hash()));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.xor_hash(), o.hash());
    }

    #[test]
    fn duplicate_add_leaves_pool_unchanged() {
        let pool = UnspentPool::new();
        let o = ux(1, 10);
        pool.add(o).unwrap();
        let before = pool.xor_hash();
        assert_eq!(pool.add(o), Err(UnspentError::DuplicateOutput(o.hash())));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.xor_hash(), before);
    }

    #[test]
    fn del_is_idempotent() {
        let pool = UnspentPool::new();
        let o = ux(1, 10);
        pool.add(o).unwrap();
        pool.del(&o.hash());
        pool.del(&o.hash());
        assert!(pool.is_empty());
        assert_eq!(pool.xor_hash(), Digest::ZERO);
    }

    #[test]
    fn removing_a_subset_xors_out_its_checksum() {
        let pool = UnspentPool::new();
        let all: Vec<UxOut> = (1..=6).map(|i| ux(i, i as u64 * 100)).collect();
        for o in &all {
            pool.add(*o).unwrap();
        }
        let full = pool.xor_hash();

        let subset: Vec<Digest> = all[1..4].iter().map(|o| o.hash()).collect();
        pool.del_multiple(&subset);

        assert_eq!(pool.xor_hash(), full ^ xor_all(&subset));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn get_multiple_preserves_order_and_fails_on_unknown() {
        let pool = UnspentPool::new();
        let a = ux(1, 1);
        let b = ux(2, 2);
        pool.add(a).unwrap();
        pool.add(b).unwrap();

        let got = pool.get_multiple(&[b.hash(), a.hash(), b.hash()]).unwrap();
        assert_eq!(got, vec![b, a, b]);

        let missing = Digest::new([0xEE; 32]);
        assert_eq!(
            pool.get_multiple(&[a.hash(), missing]),
            Err(UnspentError::UnknownOutput(missing))
        );
    }

    #[test]
    fn collides_detects_live_members() {
        let pool = UnspentPool::new();
        let a = ux(1, 1);
        pool.add(a).unwrap();
        assert!(pool.collides(&[Digest::ZERO, a.hash()]));
        assert!(!pool.collides(&[Digest::ZERO]));
    }

    #[test]
    fn all_for_address_filters() {
        let pool = UnspentPool::new();
        pool.add(ux(1, 1)).unwrap();
        pool.add(ux(2, 2)).unwrap();
        let mut other = ux(1, 5);
        other.body.src_transaction = Digest::new([9; 32]);
        pool.add(other).unwrap();

        assert_eq!(pool.all_for_address(&addr(1)).len(), 2);
        assert_eq!(pool.all_for_addresses(&[addr(1), addr(2)]).len(), 3);
        assert!(pool.all_for_address(&addr(7)).is_empty());
    }

    #[test]
    fn xor_hash_after_predicts_the_result() {
        let pool = UnspentPool::new();
        let a = ux(1, 1);
        let b = ux(2, 2);
        pool.add(a).unwrap();
        let predicted = pool.xor_hash_after(&[a.hash()], &[b.hash()]);
        pool.del(&a.hash());
        pool.add(b).unwrap();
        assert_eq!(pool.xor_hash(), predicted);
    }

    #[test]
    fn rollbacks_restore_the_pool() {
        let pool = UnspentPool::new();
        let a = ux(1, 1);
        let b = ux(2, 2);
        pool.add(a).unwrap();
        let before = pool.xor_hash();

        let mut rb = Rollbacks::new();
        pool.del_logged(&a.hash(), &mut rb);
        pool.add_logged(b, &mut rb).unwrap();
        assert!(pool.has(&b.hash()));
        assert!(!pool.has(&a.hash()));

        rb.run();
        assert!(pool.has(&a.hash()));
        assert!(!pool.has(&b.hash()));
        assert_eq!(pool.xor_hash(), before);
    }

    #[test]
    fn persist_then_load_roundtrip() {
        let db = LedgerDb::open_temporary().unwrap();
        let a = ux(1, 1);
        let b = ux(2, 2);
        db.unspent
            .transaction(|t| persist_changes(t, &[], &[a, b]))
            .map_err(StoreError::from)
            .unwrap();
        db.unspent
            .transaction(|t| persist_changes(t, &[a.hash()], &[]))
            .map_err(StoreError::from)
            .unwrap();

        let pool = UnspentPool::load(&db.unspent).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&b.hash()), Some(b));
        assert_eq!(pool.xor_hash(), b.hash());
    }
}
