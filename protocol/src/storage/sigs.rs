//! BlockSigs: one publisher signature per block hash.
//!
//! This store persists and retrieves. It does not decide anything: whether
//! a signature is good enough for a block to count is checked by the chain
//! before the block is applied. [`BlockSigs::verify_all`] exists for audits.
//!
//! A hash gets at most one signature. Writing the same one again is a no-op;
//! a different one is refused with [`StoreError::SignatureExists`].

use sled::transaction::{abort, ConflictableTransactionResult, TransactionalTree};
use sled::Tree;

use super::db::{decode_value, encode_value, StoreError, StoreResult};
use super::tree::BlockTree;
use crate::crypto::hash::Digest;
use crate::crypto::keys::{PubKey, Sig};
use crate::crypto::signatures::verify_signature;

/// Result of checking every stored signature against a publisher key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigAudit {
    pub checked: usize,
    /// Signatures that do not verify over their block hash.
    pub invalid: Vec<Digest>,
    /// Signatures whose block is not (or no longer) in the block tree.
    pub orphaned: Vec<Digest>,
}

impl SigAudit {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.orphaned.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BlockSigs {
    tree: Tree,
}

impl BlockSigs {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Store the signature for `hash`.
    pub fn add(&self, hash: &Digest, sig: &Sig) -> StoreResult<()> {
        self.tree.transaction(|t| add_sig_in(t, hash, sig))?;
        Ok(())
    }

    pub fn get(&self, hash: &Digest) -> StoreResult<Option<Sig>> {
        match self.tree.get(&hash.0[..])? {
            Some(bytes) => Ok(Some(decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Check every stored signature against `publisher`, and that each
    /// signed block is still in `blocks`.
    pub fn verify_all(&self, publisher: &PubKey, blocks: &BlockTree) -> StoreResult<SigAudit> {
        let mut audit = SigAudit::default();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            let hash = Digest::from_slice(&key)
                .ok_or_else(|| StoreError::Serialization("invalid block_sigs key".to_string()))?;
            let sig: Sig = decode_value(&value)?;

            audit.checked += 1;
            if verify_signature(publisher, &hash, &sig).is_err() {
                audit.invalid.push(hash);
            }
            if !blocks.contains(&hash)? {
                audit.orphaned.push(hash);
            }
        }
        Ok(audit)
    }
}

/// [`BlockSigs::add`] inside an open transaction.
pub(crate) fn add_sig_in(
    tree: &TransactionalTree,
    hash: &Digest,
    sig: &Sig,
) -> ConflictableTransactionResult<(), StoreError> {
    if let Some(bytes) = tree.get(&hash.0[..])? {
        let existing: Sig = decode_value(&bytes).or_else(abort)?;
        if existing == *sig {
            return Ok(());
        }
        return abort(StoreError::SignatureExists(*hash));
    }
    let value = encode_value(sig).or_else(abort)?;
    tree.insert(&hash.0[..], value)?;
    Ok(())
}
