//! # Blockchain: validate, then apply
//!
//! [`Blockchain`] owns one ledger: the unspent pool, the block tree, the
//! head pointer and the signature store, all over one [`LedgerDb`].
//!
//! ## Executing a block
//!
//! ```text
//! execute_block(sb)
//!   ├─ publisher signature (when a publisher is configured)
//!   ├─ validate: inputs → signatures → header → body   (read-only)
//!   └─ apply
//!        ├─ pool: delete spent, insert created      ┐ in memory,
//!        ├─ meta: cache head (seq, hash)            ┘ logged to Rollbacks
//!        └─ sled txn: blocks + tree + unspent + meta + block_sigs
//!             ok  → forget rollbacks
//!             err → run rollbacks, return the error
//! ```
//!
//! The head is the block that was applied, pinned by hash. Other blocks at
//! the same depth (fork candidates recorded straight into the tree) never
//! move it; a recorded candidate becomes the head only by being executed.
//!
//! Nothing is mutated until validation passes. Writers are serialized by an
//! internal mutex, so two blocks can never both validate against the same
//! pool state and then both apply.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;
use sled::Transactional;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use super::error::{ChainError, ChainResult};
use super::validation::{validate_block, validate_genesis, verify_spend, BlockEffects};
use crate::config::{ChainConfig, BLOCK_VERSION};
use crate::crypto::hash::Digest;
use crate::crypto::keys::{Address, PubKey, SecretKey, Sig};
use crate::crypto::signatures::{sign_hash, verify_signature};
use crate::invariant;
use crate::storage::meta::persist_head;
use crate::storage::sigs::add_sig_in;
use crate::storage::tree::ensure_block_in;
use crate::storage::unspent::persist_changes;
use crate::storage::{
    Block, BlockBody, BlockHeader, BlockSigs, BlockTree, ChainHead, ChainMeta, LedgerDb,
    Rollbacks, SignedBlock, StoreError, UnspentPool, Walker,
};
use crate::transaction::{total_coin_hours, total_coins, Transaction, TransactionBuilder, UxHead};

/// Coins and coin-hours held by a set of addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub coins: u64,
    pub hours: u64,
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

pub struct Blockchain {
    db: LedgerDb,
    tree: BlockTree,
    pool: UnspentPool,
    meta: ChainMeta,
    sigs: BlockSigs,
    publisher: Option<PubKey>,
    max_future_drift: u64,
    writer: Mutex<()>,
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("head_seq", &self.meta.head_seq())
            .field("unspent", &self.pool.len())
            .field("publisher", &self.publisher)
            .finish()
    }
}

impl Blockchain {
    /// Open a ledger over `db`, reloading the pool and head from disk.
    ///
    /// Refuses to start if the stored pool does not match the head block's
    /// `ux_hash`.
    pub fn open(db: LedgerDb, config: &ChainConfig) -> ChainResult<Self> {
        let chain = Self {
            tree: BlockTree::new(db.blocks.clone(), db.graph.clone()),
            pool: UnspentPool::load(&db.unspent)?,
            meta: ChainMeta::load(db.meta.clone())?,
            sigs: BlockSigs::new(db.block_sigs.clone()),
            publisher: config.publisher()?,
            max_future_drift: config.max_future_drift_secs,
            writer: Mutex::new(()),
            db,
        };

        if let Some(head) = chain.head()? {
            if head.ux_hash != chain.pool.xor_hash() {
                return Err(ChainError::Corrupt(format!(
                    "unspent pool checksum {} does not match head ux_hash {}",
                    chain.pool.xor_hash(),
                    head.ux_hash
                )));
            }
            info!(seq = head.bk_seq, unspent = chain.pool.len(), "ledger opened");
        }
        Ok(chain)
    }

    // -- Reads ---------------------------------------------------------------

    /// Header of the head block, `None` before genesis.
    pub fn head(&self) -> ChainResult<Option<BlockHeader>> {
        let Some(head) = self.meta.head() else {
            return Ok(None);
        };
        match self.tree.get_block(&head.hash)? {
            Some(block) if block.seq() == head.seq => Ok(Some(block.header)),
            Some(_) => Err(ChainError::Corrupt(format!(
                "head block {} is not at depth {}",
                head.hash, head.seq
            ))),
            None => Err(ChainError::Corrupt(format!("head block {} missing", head.hash))),
        }
    }

    /// Hash of the head block, `None` before genesis.
    pub fn head_hash(&self) -> Option<Digest> {
        self.meta.head_hash()
    }

    pub fn head_seq(&self) -> Option<u64> {
        self.meta.head_seq()
    }

    /// Compact commitment to the current unspent set.
    pub fn ux_hash(&self) -> Digest {
        self.pool.xor_hash()
    }

    pub fn get_block(&self, hash: &Digest) -> ChainResult<Option<Block>> {
        Ok(self.tree.get_block(hash)?)
    }

    pub fn get_block_in_depth(&self, depth: u64, walker: &dyn Walker) -> ChainResult<Option<Block>> {
        Ok(self.tree.get_block_in_depth(depth, walker)?)
    }

    /// Blocks at depths `start..=end`, one per depth as chosen by `walker`.
    /// Stops early at the first depth with nothing selected.
    pub fn blocks_in_range(
        &self,
        start: u64,
        end: u64,
        walker: &dyn Walker,
    ) -> ChainResult<Vec<Block>> {
        let mut out = Vec::new();
        for depth in start..=end {
            match self.tree.get_block_in_depth(depth, walker)? {
                Some(block) => out.push(block),
                None => break,
            }
        }
        Ok(out)
    }

    pub fn block_signature(&self, hash: &Digest) -> ChainResult<Option<Sig>> {
        Ok(self.sigs.get(hash)?)
    }

    pub fn unspent(&self) -> &UnspentPool {
        &self.pool
    }

    pub fn block_tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn block_sigs(&self) -> &BlockSigs {
        &self.sigs
    }

    pub fn publisher(&self) -> Option<&PubKey> {
        self.publisher.as_ref()
    }

    /// Coins and coin-hours (accrued to `now`) owned by `addresses`.
    pub fn balance(&self, addresses: &[Address], now: u64) -> ChainResult<Balance> {
        let uxs = self.pool.all_for_addresses(addresses);
        Ok(Balance {
            coins: total_coins(&uxs)?,
            hours: total_coin_hours(&uxs, now)?,
        })
    }

    /// Would `tx` be accepted in a block at the head's time?
    pub fn verify_transaction(&self, tx: &Transaction) -> ChainResult<()> {
        let head = self.head()?.ok_or(ChainError::NoHead)?;
        verify_spend(&self.pool, tx, head.time).map(|_| ())
    }

    // -- Block production ------------------------------------------------------

    /// Build (but do not sign or execute) the genesis block.
    pub fn create_genesis_block(
        &self,
        address: Address,
        coins: u64,
        hours: u64,
        time: u64,
    ) -> ChainResult<Block> {
        if self.meta.head_seq().is_some() {
            return Err(ChainError::GenesisExists);
        }
        let tx = TransactionBuilder::new()
            .push_output(address, coins, hours)
            .build_unsigned();
        let ux = tx.created_outputs(Digest::ZERO, UxHead { time, bk_seq: 0 });
        let body = BlockBody {
            transactions: vec![tx],
        };
        Ok(Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                time,
                bk_seq: 0,
                fee: 0,
                prev_hash: Digest::ZERO,
                body_hash: body.hash(),
                ux_hash: ux[0].hash(),
            },
            body,
        })
    }

    /// Assemble the next block from `candidates`.
    ///
    /// Candidates that are invalid against the current pool, or that
    /// conflict with one already taken (same input, colliding output), are
    /// skipped. Fails if nothing is left.
    pub fn create_block(&self, candidates: &[Transaction], time: u64) -> ChainResult<Block> {
        let head = self.head()?.ok_or(ChainError::NoHead)?;
        if time <= head.time {
            return Err(ChainError::TimeNotIncreasing {
                head: head.time,
                got: time,
            });
        }

        let seq = head.bk_seq + 1;
        let ux_head = UxHead { time, bk_seq: seq };
        let mut accepted = Vec::new();
        let mut spent: HashSet<Digest> = HashSet::new();
        let mut created: HashSet<Digest> = HashSet::new();
        let mut fee = 0u64;

        for tx in candidates {
            let tx_fee = match verify_spend(&self.pool, tx, time) {
                Ok(f) => f,
                Err(e) => {
                    debug!(tx = %tx.hash(), error = %e, "skipping candidate");
                    continue;
                }
            };
            if tx.inputs.iter().any(|h| spent.contains(h)) {
                debug!(tx = %tx.hash(), "skipping candidate: conflicts with an earlier one");
                continue;
            }
            let outs: Vec<Digest> = tx
                .created_outputs(tx.hash(), ux_head)
                .iter()
                .map(|ux| ux.hash())
                .collect();
            if self.pool.collides(&outs) || outs.iter().any(|h| created.contains(h)) {
                debug!(tx = %tx.hash(), "skipping candidate: output collision");
                continue;
            }
            let Some(new_fee) = fee.checked_add(tx_fee) else {
                debug!(tx = %tx.hash(), "skipping candidate: fee overflow");
                continue;
            };

            fee = new_fee;
            spent.extend(tx.inputs.iter().copied());
            created.extend(outs);
            accepted.push(tx.clone());
        }

        if accepted.is_empty() {
            return Err(ChainError::NoValidTransactions);
        }

        let spent: Vec<Digest> = accepted.iter().flat_map(|tx| tx.inputs.iter().copied()).collect();
        let created: Vec<Digest> = accepted
            .iter()
            .flat_map(|tx| tx.created_outputs(tx.hash(), ux_head))
            .map(|ux| ux.hash())
            .collect();
        let body = BlockBody {
            transactions: accepted,
        };
        Ok(Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                time,
                bk_seq: seq,
                fee,
                prev_hash: head.hash(),
                body_hash: body.hash(),
                ux_hash: self.pool.xor_hash_after(&spent, &created),
            },
            body,
        })
    }

    /// Sign `block` as the publisher.
    pub fn sign_block(block: Block, publisher: &SecretKey) -> ChainResult<SignedBlock> {
        let sig = sign_hash(publisher, &block.hash()).map_err(ChainError::BlockSignature)?;
        Ok(SignedBlock { block, sig })
    }

    // -- Execution -------------------------------------------------------------

    /// Validate `sb` against the current state and apply it, with the
    /// future-time rule evaluated against the wall clock.
    pub fn execute_block(&self, sb: &SignedBlock) -> ChainResult<()> {
        self.execute_block_at(sb, unix_now())
    }

    /// [`execute_block`](Self::execute_block) with an explicit `now`.
    #[instrument(skip_all, fields(seq = sb.block.seq(), hash = %sb.block.hash()))]
    pub fn execute_block_at(&self, sb: &SignedBlock, now: u64) -> ChainResult<()> {
        let _writer = self.writer.lock();
        let block = &sb.block;
        let hash = block.hash();

        if let Some(publisher) = &self.publisher {
            verify_signature(publisher, &hash, &sb.sig).map_err(|e| {
                debug!(error = %e, "block signature rejected");
                ChainError::BlockSignature(e)
            })?;
        }

        let effects = match self.head()? {
            Some(head) => validate_block(&self.pool, &head, block, now, self.max_future_drift)?,
            None => {
                if block.time() > now.saturating_add(self.max_future_drift) {
                    return Err(ChainError::TimeInFuture {
                        time: block.time(),
                        now,
                    });
                }
                validate_genesis(block)?
            }
        };

        self.apply(sb, &effects)?;

        info!(
            txs = block.transactions().len(),
            fee = effects.fee,
            unspent = self.pool.len(),
            "block executed"
        );
        Ok(())
    }

    fn apply(&self, sb: &SignedBlock, effects: &BlockEffects) -> ChainResult<()> {
        let block = &sb.block;
        let seq = block.seq();
        let hash = block.hash();
        let mut rollbacks = Rollbacks::new();

        for hash in &effects.spent {
            self.pool.del_logged(hash, &mut rollbacks);
        }
        for ux in &effects.created {
            if let Err(e) = self.pool.add_logged(*ux, &mut rollbacks) {
                invariant::violated(format!("applying validated block {seq}: {e}"));
            }
        }
        if self.pool.xor_hash() != block.header.ux_hash {
            invariant::violated(format!(
                "pool checksum {} after block {seq} differs from validated ux_hash {}",
                self.pool.xor_hash(),
                block.header.ux_hash
            ));
        }
        let head = ChainHead { seq, hash };
        self.meta.set_cached_logged(head, &mut rollbacks);

        let db = &self.db;
        let result = (&db.blocks, &db.graph, &db.unspent, &db.meta, &db.block_sigs).transaction(
            |(blocks, graph, unspent, meta, sigs)| {
                ensure_block_in(blocks, graph, block)?;
                persist_changes(unspent, &effects.spent, &effects.created)?;
                persist_head(meta, head)?;
                add_sig_in(sigs, &hash, &sb.sig)?;
                Ok::<(), ConflictableTransactionError<StoreError>>(())
            },
        );

        match result {
            Ok(()) => {
                rollbacks.commit();
                Ok(())
            }
            Err(e) => {
                rollbacks.run();
                Err(StoreError::from(e).into())
            }
        }
    }

    /// Discard a block nothing builds on, typically a losing fork candidate.
    ///
    /// Only the tree entry goes; the pool is not rewound. Removing the
    /// applied head this way is refused.
    pub fn remove_block(&self, hash: &Digest) -> ChainResult<()> {
        let _writer = self.writer.lock();
        let block = self
            .tree
            .get_block(hash)?
            .ok_or_else(|| StoreError::NotFound(format!("block {hash}")))?;
        if self.meta.head_hash() == Some(*hash) {
            return Err(StoreError::HasChild(*hash).into());
        }
        self.tree.remove_block(&block)?;
        Ok(())
    }

    /// Flush sled to disk.
    pub fn flush(&self) -> ChainResult<()> {
        Ok(self.db.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FirstRecorded, HashPair, WalkerFn};

    const T0: u64 = 1_700_000_000;

    struct Fixture {
        chain: Blockchain,
        publisher: SecretKey,
        genesis_owner: SecretKey,
    }

    fn fixture() -> Fixture {
        let publisher = SecretKey::generate();
        let genesis_owner = SecretKey::generate();
        let db = LedgerDb::open_temporary().unwrap();
        let chain = Blockchain::open(db, &ChainConfig::with_publisher(&publisher.public_key())).unwrap();

        let genesis = chain
            .create_genesis_block(genesis_owner.address(), 100_000_000, 1_000, T0)
            .unwrap();
        let sb = Blockchain::sign_block(genesis, &publisher).unwrap();
        chain.execute_block_at(&sb, T0).unwrap();

        Fixture {
            chain,
            publisher,
            genesis_owner,
        }
    }

    fn genesis_ux(f: &Fixture) -> crate::transaction::UxOut {
        f.chain.unspent().all_for_address(&f.genesis_owner.address())[0]
    }

    #[test]
    fn genesis_sets_head_and_ux_hash() {
        let f = fixture();
        let head = f.chain.head().unwrap().unwrap();
        assert_eq!(head.bk_seq, 0);
        assert!(head.prev_hash.is_zero());
        assert_eq!(f.chain.ux_hash(), genesis_ux(&f).hash());
        assert_eq!(f.chain.unspent().len(), 1);
        assert!(f.chain.block_signature(&head.hash()).unwrap().is_some());
    }

    #[test]
    fn second_genesis_is_refused() {
        let f = fixture();
        assert!(matches!(
            f.chain.create_genesis_block(f.genesis_owner.address(), 1, 0, T0),
            Err(ChainError::GenesisExists)
        ));
    }

    #[test]
    fn spend_from_genesis() {
        let f = fixture();
        let bob = SecretKey::generate();
        let ux = genesis_ux(&f);
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(bob.address(), 40_000_000, 100)
            .push_output(f.genesis_owner.address(), 60_000_000, 100)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();

        f.chain.verify_transaction(&tx).unwrap();
        let block = f.chain.create_block(&[tx], T0 + 3_600).unwrap();
        assert_eq!(block.header.fee, 1_000 + 100 - 200);
        let sb = Blockchain::sign_block(block.clone(), &f.publisher).unwrap();
        f.chain.execute_block_at(&sb, T0 + 3_600).unwrap();

        assert_eq!(f.chain.head().unwrap().unwrap(), block.header);
        assert_eq!(f.chain.unspent().len(), 2);
        assert_eq!(
            f.chain.balance(&[bob.address()], T0 + 3_600).unwrap(),
            Balance {
                coins: 40_000_000,
                hours: 100
            }
        );
        assert!(!f.chain.unspent().has(&ux.hash()));
    }

    #[test]
    fn unsigned_block_rejected_when_publisher_set() {
        let f = fixture();
        let ux = genesis_ux(&f);
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(f.genesis_owner.address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        let block = f.chain.create_block(&[tx], T0 + 10).unwrap();
        let forged = Blockchain::sign_block(block, &SecretKey::generate()).unwrap();
        let before = f.chain.ux_hash();
        assert!(matches!(
            f.chain.execute_block_at(&forged, T0 + 10),
            Err(ChainError::BlockSignature(_))
        ));
        assert_eq!(f.chain.ux_hash(), before);
        assert_eq!(f.chain.head_seq(), Some(0));
    }

    #[test]
    fn create_block_skips_invalid_and_conflicting() {
        let f = fixture();
        let ux = genesis_ux(&f);
        let a = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(SecretKey::generate().address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        let conflicting = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(SecretKey::generate().address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        let badly_signed = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(SecretKey::generate().address(), 100_000_000, 0)
            .sign_inputs(&[SecretKey::generate()])
            .unwrap();

        let block = f
            .chain
            .create_block(&[badly_signed, a.clone(), conflicting], T0 + 1)
            .unwrap();
        assert_eq!(block.body.transactions, vec![a]);
    }

    #[test]
    fn create_block_with_nothing_valid_fails() {
        let f = fixture();
        assert!(matches!(
            f.chain.create_block(&[], T0 + 1),
            Err(ChainError::NoValidTransactions)
        ));
        assert!(matches!(
            f.chain.create_block(&[], T0),
            Err(ChainError::TimeNotIncreasing { .. })
        ));
    }

    #[test]
    fn failed_execution_changes_nothing() {
        let f = fixture();
        let ux = genesis_ux(&f);
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(f.genesis_owner.address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        let mut block = f.chain.create_block(&[tx], T0 + 5).unwrap();
        block.header.bk_seq = 5;
        let sb = Blockchain::sign_block(block, &f.publisher).unwrap();

        let before = (f.chain.ux_hash(), f.chain.unspent().len(), f.chain.head_seq());
        assert!(matches!(
            f.chain.execute_block_at(&sb, T0 + 5),
            Err(ChainError::BadSequence { expected: 1, got: 5 })
        ));
        assert_eq!(
            before,
            (f.chain.ux_hash(), f.chain.unspent().len(), f.chain.head_seq())
        );
        assert!(f.chain.block_signature(&sb.block.hash()).unwrap().is_none());
    }

    #[test]
    fn blocks_in_range_walks_the_chain() {
        let f = fixture();
        let ux = genesis_ux(&f);
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(f.genesis_owner.address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        let block = f.chain.create_block(&[tx], T0 + 1).unwrap();
        let sb = Blockchain::sign_block(block, &f.publisher).unwrap();
        f.chain.execute_block_at(&sb, T0 + 1).unwrap();

        let blocks = f.chain.blocks_in_range(0, 10, &FirstRecorded).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].prev_hash(), blocks[0].hash());
    }

    #[test]
    fn remove_block_refuses_head_and_removes_fork() {
        let f = fixture();
        let head = f.chain.head().unwrap().unwrap();
        assert!(matches!(
            f.chain.remove_block(&head.hash()),
            Err(ChainError::Store(StoreError::HasChild(_)))
        ));

        // A competing candidate at depth 1 recorded directly in the tree.
        let fork = Block {
            header: BlockHeader {
                time: T0 + 9,
                bk_seq: 1,
                prev_hash: head.hash(),
                ..Default::default()
            },
            body: BlockBody::default(),
        };
        f.chain.block_tree().add_block(&fork).unwrap();
        f.chain.remove_block(&fork.hash()).unwrap();
        assert!(f.chain.get_block(&fork.hash()).unwrap().is_none());
    }

    #[test]
    fn get_block_in_depth_with_custom_walker() {
        let f = fixture();
        let head = f.chain.head().unwrap().unwrap();
        let last = WalkerFn(|_: &BlockTree, pairs: &[HashPair]| pairs.last().map(|p| p.hash));
        let got = f.chain.get_block_in_depth(0, &last).unwrap().unwrap();
        assert_eq!(got.header, head);
    }

    fn self_spend(f: &Fixture, time: u64) -> Block {
        let ux = genesis_ux(f);
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(f.genesis_owner.address(), 100_000_000, 0)
            .sign_inputs(&[f.genesis_owner.clone()])
            .unwrap();
        f.chain.create_block(&[tx], time).unwrap()
    }

    fn sorted_pool(chain: &Blockchain) -> Vec<crate::transaction::UxOut> {
        let mut uxs = chain.unspent().snapshot();
        uxs.sort_by_key(|ux| ux.hash());
        uxs
    }

    #[test]
    fn head_follows_executed_block_not_earlier_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = SecretKey::generate();
        let owner = SecretKey::generate();
        let config = ChainConfig::with_publisher(&publisher.public_key());
        let chain = Blockchain::open(LedgerDb::open(dir.path()).unwrap(), &config).unwrap();
        let g = chain.create_genesis_block(owner.address(), 100_000_000, 0, T0).unwrap();
        chain
            .execute_block_at(&Blockchain::sign_block(g, &publisher).unwrap(), T0)
            .unwrap();
        let genesis = chain.head().unwrap().unwrap();

        // An empty candidate at depth 1 is recorded before the real block.
        let sibling = Block {
            header: BlockHeader {
                time: T0 + 1,
                bk_seq: 1,
                prev_hash: genesis.hash(),
                ux_hash: genesis.ux_hash,
                ..Default::default()
            },
            body: BlockBody::default(),
        };
        chain.block_tree().add_block(&sibling).unwrap();

        let ux = chain.unspent().all_for_address(&owner.address())[0];
        let tx = TransactionBuilder::new()
            .push_input(ux.hash())
            .push_output(owner.address(), 100_000_000, 0)
            .sign_inputs(&[owner.clone()])
            .unwrap();
        let block = chain.create_block(&[tx], T0 + 2).unwrap();
        chain
            .execute_block_at(&Blockchain::sign_block(block.clone(), &publisher).unwrap(), T0 + 2)
            .unwrap();

        assert_eq!(chain.block_tree().hash_pairs(1).unwrap().len(), 2);
        assert_eq!(chain.head_hash(), Some(block.hash()));
        let head = chain.head().unwrap().unwrap();
        assert_eq!(head, block.header);
        assert_eq!(head.ux_hash, chain.ux_hash());
        chain.flush().unwrap();
        drop(chain);

        let reopened = Blockchain::open(LedgerDb::open(dir.path()).unwrap(), &config).unwrap();
        assert_eq!(reopened.head().unwrap(), Some(block.header));
        assert_eq!(reopened.ux_hash(), head.ux_hash);
    }

    #[test]
    fn recorded_candidate_can_be_executed() {
        let f = fixture();
        let block = self_spend(&f, T0 + 1);
        f.chain.block_tree().add_block(&block).unwrap();

        let sb = Blockchain::sign_block(block.clone(), &f.publisher).unwrap();
        f.chain.execute_block_at(&sb, T0 + 1).unwrap();

        assert_eq!(f.chain.head().unwrap(), Some(block.header.clone()));
        assert_eq!(f.chain.block_tree().hash_pairs(1).unwrap(), vec![block.hash_pair()]);
        assert_eq!(f.chain.block_signature(&block.hash()).unwrap(), Some(sb.sig));
        assert_eq!(f.chain.ux_hash(), block.header.ux_hash);
    }

    #[test]
    fn store_failure_restores_pool_and_head() {
        let f = fixture();
        let block = self_spend(&f, T0 + 1);
        let hash = block.hash();
        // A conflicting signature already on file makes the block's sled
        // transaction abort after the in-memory changes were made.
        let stale = Sig::new([7; 65]);
        f.chain.block_sigs().add(&hash, &stale).unwrap();

        let pool_before = sorted_pool(&f.chain);
        let xor_before = f.chain.ux_hash();
        let head_before = (f.chain.head_seq(), f.chain.head_hash());

        let sb = Blockchain::sign_block(block, &f.publisher).unwrap();
        assert!(matches!(
            f.chain.execute_block_at(&sb, T0 + 1),
            Err(ChainError::Store(StoreError::SignatureExists(h))) if h == hash
        ));

        assert_eq!(sorted_pool(&f.chain), pool_before);
        assert_eq!(f.chain.ux_hash(), xor_before);
        assert_eq!((f.chain.head_seq(), f.chain.head_hash()), head_before);
        assert!(f.chain.get_block(&hash).unwrap().is_none());
        assert_eq!(f.chain.block_signature(&hash).unwrap(), Some(stale));

        // Nothing durable moved either.
        let reloaded = UnspentPool::load(&f.chain.db.unspent).unwrap();
        assert_eq!(reloaded.xor_hash(), xor_before);
        let meta = ChainMeta::load(f.chain.db.meta.clone()).unwrap();
        assert_eq!(meta.head_seq(), Some(0));
    }

    #[test]
    fn reopen_restores_pool_and_head() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = SecretKey::generate();
        let owner = SecretKey::generate();
        let config = ChainConfig::with_publisher(&publisher.public_key());
        let (ux_hash, head) = {
            let chain = Blockchain::open(LedgerDb::open(dir.path()).unwrap(), &config).unwrap();
            let g = chain.create_genesis_block(owner.address(), 50, 0, T0).unwrap();
            chain
                .execute_block_at(&Blockchain::sign_block(g, &publisher).unwrap(), T0)
                .unwrap();
            chain.flush().unwrap();
            (chain.ux_hash(), chain.head().unwrap())
        };

        let chain = Blockchain::open(LedgerDb::open(dir.path()).unwrap(), &config).unwrap();
        assert_eq!(chain.ux_hash(), ux_hash);
        assert_eq!(chain.head().unwrap(), head);
        assert_eq!(chain.balance(&[owner.address()], T0).unwrap().coins, 50);
    }
}
