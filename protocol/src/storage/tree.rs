//! # BlockTree
//!
//! Durable storage for blocks and for the graph that links them.
//!
//! Two trees: `blocks` maps a block hash to the block, and `tree` maps a
//! depth to the ordered list of [`HashPair`]s recorded there. More than one
//! pair at a depth means competing candidates (a fork). Which one is "the"
//! chain is not this module's call; [`BlockTree::get_block_in_depth`] asks
//! an injected [`Walker`].
//!
//! Every public mutation runs inside one sled transaction. The bodies of
//! those transactions are exposed as `*_in` functions over
//! `TransactionalTree`s so the executor can fold them into its own larger
//! transaction.

use sled::transaction::{abort, ConflictableTransactionResult, TransactionalTree};
use sled::{Transactional, Tree};

use super::block::{Block, HashPair};
use super::db::{decode_value, depth_from_key, depth_key, encode_value, StoreError, StoreResult};
use crate::crypto::hash::Digest;

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Canonical-chain policy: pick one of the candidates recorded at a depth.
///
/// Returning `None` means "no acceptable candidate" and makes the lookup
/// come back empty.
pub trait Walker {
    fn select(&self, tree: &BlockTree, pairs: &[HashPair]) -> Option<Digest>;
}

/// Take the first candidate recorded at the depth.
///
/// The executor appends at most one block per depth, so on a chain built
/// only through it this is the block that was applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstRecorded;

impl Walker for FirstRecorded {
    fn select(&self, _tree: &BlockTree, pairs: &[HashPair]) -> Option<Digest> {
        pairs.first().map(|p| p.hash)
    }
}

/// Adapter so a plain closure can act as a [`Walker`].
pub struct WalkerFn<F>(pub F);

impl<F> Walker for WalkerFn<F>
where
    F: Fn(&BlockTree, &[HashPair]) -> Option<Digest>,
{
    fn select(&self, tree: &BlockTree, pairs: &[HashPair]) -> Option<Digest> {
        (self.0)(tree, pairs)
    }
}

// ---------------------------------------------------------------------------
// Transaction bodies
// ---------------------------------------------------------------------------

fn pairs_in(
    graph: &TransactionalTree,
    depth: u64,
) -> ConflictableTransactionResult<Vec<HashPair>, StoreError> {
    match graph.get(&depth_key(depth)[..])? {
        Some(bytes) => decode_value(&bytes).or_else(abort),
        None => Ok(Vec::new()),
    }
}

fn write_pairs_in(
    graph: &TransactionalTree,
    depth: u64,
    pairs: &[HashPair],
) -> ConflictableTransactionResult<(), StoreError> {
    if pairs.is_empty() {
        graph.remove(&depth_key(depth)[..])?;
    } else {
        let value = encode_value(&pairs.to_vec()).or_else(abort)?;
        graph.insert(&depth_key(depth)[..], value)?;
    }
    Ok(())
}

/// Record `block` inside an open transaction.
pub(crate) fn add_block_in(
    blocks: &TransactionalTree,
    graph: &TransactionalTree,
    block: &Block,
) -> ConflictableTransactionResult<(), StoreError> {
    let seq = block.seq();
    let hash = block.hash();

    if seq > 0 && block.prev_hash().is_zero() {
        return abort(StoreError::NoParent(seq));
    }
    if blocks.get(&hash.0[..])?.is_some() {
        return abort(StoreError::BlockExists(hash));
    }
    if seq > 0 {
        let parents = pairs_in(graph, seq - 1)?;
        if !parents.iter().any(|p| p.hash == block.prev_hash()) {
            return abort(StoreError::WrongParent(block.prev_hash()));
        }
    }

    let pair = block.hash_pair();
    let mut pairs = pairs_in(graph, seq)?;
    if pairs.contains(&pair) {
        return abort(StoreError::BlockExists(hash));
    }
    pairs.push(pair);
    write_pairs_in(graph, seq, &pairs)?;

    let value = encode_value(block).or_else(abort)?;
    blocks.insert(&hash.0[..], value)?;
    Ok(())
}

/// Like [`add_block_in`], but a block already recorded (for instance as a
/// fork candidate) is accepted as is.
pub(crate) fn ensure_block_in(
    blocks: &TransactionalTree,
    graph: &TransactionalTree,
    block: &Block,
) -> ConflictableTransactionResult<(), StoreError> {
    let hash = block.hash();
    if blocks.get(&hash.0[..])?.is_some() {
        if !pairs_in(graph, block.seq())?.contains(&block.hash_pair()) {
            return abort(StoreError::NotFound(format!("tree entry for block {hash}")));
        }
        return Ok(());
    }
    add_block_in(blocks, graph, block)
}

/// Remove `block` inside an open transaction.
pub(crate) fn remove_block_in(
    blocks: &TransactionalTree,
    graph: &TransactionalTree,
    block: &Block,
) -> ConflictableTransactionResult<(), StoreError> {
    let seq = block.seq();
    let hash = block.hash();

    let children = pairs_in(graph, seq + 1)?;
    if children.iter().any(|p| p.pre_hash == hash) {
        return abort(StoreError::HasChild(hash));
    }

    let mut pairs = pairs_in(graph, seq)?;
    let before = pairs.len();
    pairs.retain(|p| p.hash != hash);
    if pairs.len() == before {
        return abort(StoreError::NotFound(format!("block {hash} at depth {seq}")));
    }
    write_pairs_in(graph, seq, &pairs)?;
    blocks.remove(&hash.0[..])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// BlockTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BlockTree {
    blocks: Tree,
    graph: Tree,
}

impl BlockTree {
    pub fn new(blocks: Tree, graph: Tree) -> Self {
        Self { blocks, graph }
    }

    /// Store a block and record its edge.
    ///
    /// Fails with `NoParent` for a non-genesis block whose parent hash is
    /// zero, `BlockExists` if the hash (or the exact edge) is already
    /// recorded, and `WrongParent` if no block at the previous depth has
    /// the referenced hash. Any failure leaves storage untouched.
    pub fn add_block(&self, block: &Block) -> StoreResult<()> {
        (&self.blocks, &self.graph)
            .transaction(|(blocks, graph)| add_block_in(blocks, graph, block))?;
        Ok(())
    }

    /// Delete a block that nothing builds on. `HasChild` otherwise.
    pub fn remove_block(&self, block: &Block) -> StoreResult<()> {
        (&self.blocks, &self.graph)
            .transaction(|(blocks, graph)| remove_block_in(blocks, graph, block))?;
        Ok(())
    }

    pub fn get_block(&self, hash: &Digest) -> StoreResult<Option<Block>> {
        match self.blocks.get(&hash.0[..])? {
            Some(bytes) => Ok(Some(decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, hash: &Digest) -> StoreResult<bool> {
        Ok(self.blocks.contains_key(&hash.0[..])?)
    }

    /// Every edge recorded at `depth`, in recording order.
    pub fn hash_pairs(&self, depth: u64) -> StoreResult<Vec<HashPair>> {
        match self.graph.get(&depth_key(depth)[..])? {
            Some(bytes) => decode_value(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Let `walker` choose among the candidates at `depth`, then load the
    /// winner.
    ///
    /// The walker runs outside any transaction (it is free to read the
    /// tree). The chosen edge is then re-checked and its block loaded in
    /// one read transaction, so a concurrent removal yields `None` rather
    /// than a dangling hash.
    pub fn get_block_in_depth(&self, depth: u64, walker: &dyn Walker) -> StoreResult<Option<Block>> {
        let pairs = self.hash_pairs(depth)?;
        if pairs.is_empty() {
            return Ok(None);
        }
        let Some(hash) = walker.select(self, &pairs) else {
            return Ok(None);
        };

        let result = (&self.blocks, &self.graph).transaction(|(blocks, graph)| {
            let current = pairs_in(graph, depth)?;
            if !current.iter().any(|p| p.hash == hash) {
                return Ok(None);
            }
            match blocks.get(&hash.0[..])? {
                Some(bytes) => decode_value(&bytes).map(Some).or_else(abort),
                None => abort(StoreError::NotFound(format!("block {hash}"))),
            }
        })?;
        Ok(result)
    }

    /// Highest depth with any recorded block, or `None` when empty.
    pub fn max_depth(&self) -> StoreResult<Option<u64>> {
        match self.graph.last()? {
            Some((key, _)) => Ok(Some(depth_from_key(&key)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
