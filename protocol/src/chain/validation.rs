//! Read-only checks of candidate blocks and transactions against the
//! current ledger state.
//!
//! Nothing here mutates anything. A block goes through four stages, in
//! this order, and the first failure wins:
//!
//! 1. **inputs**: every input resolves to a live unspent output;
//! 2. **signatures**: each input is signed by the owner of its output;
//! 3. **header**: sequence, time and parent link follow the head;
//! 4. **body**: body hash, per-transaction structure, no double spend
//!    across the block, no output collisions, coins conserved, enough
//!    coin-hours.
//!
//! On success the caller gets back [`BlockEffects`]: exactly what applying
//! the block will do to the pool.

use std::collections::HashSet;

use tracing::debug;

use super::error::{ChainError, ChainResult};
use crate::config::BLOCK_VERSION;
use crate::crypto::hash::Digest;
use crate::crypto::signatures::chk_sig;
use crate::storage::{Block, BlockHeader, UnspentPool};
use crate::transaction::{
    total_coin_hours, total_coins, verify_transaction, AmountError, Transaction, TxError, UxHead,
    UxOut,
};

/// What applying a validated block does to the unspent pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockEffects {
    /// Outputs consumed, in block order.
    pub spent: Vec<Digest>,
    /// Outputs created, in block order.
    pub created: Vec<UxOut>,
    /// Coin-hours burned by the block's transactions.
    pub fee: u64,
}

impl BlockEffects {
    pub fn created_hashes(&self) -> Vec<Digest> {
        self.created.iter().map(|ux| ux.hash()).collect()
    }
}

// ---------------------------------------------------------------------------
// Transaction-level checks
// ---------------------------------------------------------------------------

/// Check every input signature of `tx` against the owners in `inputs`.
pub fn check_signatures(tx: &Transaction, inputs: &[UxOut]) -> ChainResult<()> {
    if tx.head.sigs.len() != tx.inputs.len() {
        return Err(TxError::BadSignatureCount {
            inputs: tx.inputs.len(),
            sigs: tx.head.sigs.len(),
        }
        .into());
    }
    let inner = tx.inner_hash();
    for (i, (ux, sig)) in inputs.iter().zip(&tx.head.sigs).enumerate() {
        chk_sig(&ux.body.address, &inner, sig).map_err(|source| ChainError::InputSignature {
            tx: tx.hash(),
            input: i,
            source,
        })?;
    }
    Ok(())
}

/// Coins in must equal coins out; coin-hours in (accrued to `time`) must
/// cover hours out. Returns the fee, the coin-hours burned.
pub fn check_balance(tx: &Transaction, inputs: &[UxOut], time: u64) -> ChainResult<u64> {
    let coins_in = total_coins(inputs)?;
    let coins_out = tx.output_coins()?;
    if coins_in != coins_out {
        return Err(ChainError::CoinsNotConserved {
            tx: tx.hash(),
            inputs: coins_in,
            outputs: coins_out,
        });
    }

    let hours_in = total_coin_hours(inputs, time)?;
    let hours_out = tx.output_hours()?;
    if hours_in < hours_out {
        return Err(ChainError::InsufficientHours {
            tx: tx.hash(),
            available: hours_in,
            required: hours_out,
        });
    }
    Ok(hours_in - hours_out)
}

/// Full verification of one spending transaction against the pool, as if
/// it were included in a block at `time`. Returns its fee.
pub fn verify_spend(pool: &UnspentPool, tx: &Transaction, time: u64) -> ChainResult<u64> {
    verify_transaction(tx)?;
    let inputs = pool.get_multiple(&tx.inputs)?;
    check_signatures(tx, &inputs)?;
    check_balance(tx, &inputs, time)
}

// ---------------------------------------------------------------------------
// Block stages
// ---------------------------------------------------------------------------

/// Stage 1. Resolve every input of every transaction.
pub fn validate_inputs(pool: &UnspentPool, block: &Block) -> ChainResult<Vec<Vec<UxOut>>> {
    block
        .transactions()
        .iter()
        .map(|tx| pool.get_multiple(&tx.inputs).map_err(ChainError::from))
        .collect()
}

/// Stage 2.
pub fn validate_signatures(block: &Block, resolved: &[Vec<UxOut>]) -> ChainResult<()> {
    for (tx, inputs) in block.transactions().iter().zip(resolved) {
        check_signatures(tx, inputs)?;
    }
    Ok(())
}

/// Stage 3. `head` is the current head header; `now` is wall-clock seconds.
pub fn validate_header(
    head: &BlockHeader,
    header: &BlockHeader,
    now: u64,
    max_future_drift: u64,
) -> ChainResult<()> {
    if header.version != BLOCK_VERSION {
        return Err(ChainError::UnsupportedVersion(header.version));
    }
    let expected = head.bk_seq + 1;
    if header.bk_seq != expected {
        return Err(ChainError::BadSequence {
            expected,
            got: header.bk_seq,
        });
    }
    if header.time <= head.time {
        return Err(ChainError::TimeNotIncreasing {
            head: head.time,
            got: header.time,
        });
    }
    if header.time > now.saturating_add(max_future_drift) {
        return Err(ChainError::TimeInFuture {
            time: header.time,
            now,
        });
    }
    let head_hash = head.hash();
    if header.prev_hash != head_hash {
        return Err(ChainError::PrevHashMismatch {
            expected: head_hash,
            got: header.prev_hash,
        });
    }
    Ok(())
}

/// Stage 4. Also checks the header commitments that depend on the body's
/// effects (`fee` and `ux_hash`).
pub fn validate_body(
    pool: &UnspentPool,
    block: &Block,
    resolved: &[Vec<UxOut>],
) -> ChainResult<BlockEffects> {
    if block.body.hash() != block.header.body_hash {
        return Err(ChainError::BodyHashMismatch);
    }

    let time = block.time();
    let ux_head = UxHead {
        time,
        bk_seq: block.seq(),
    };
    let mut effects = BlockEffects::default();
    let mut spent = HashSet::new();
    let mut created = HashSet::new();

    for (tx, inputs) in block.transactions().iter().zip(resolved) {
        verify_transaction(tx)?;

        for input in &tx.inputs {
            if !spent.insert(*input) {
                return Err(ChainError::DoubleSpend(*input));
            }
        }

        let outputs = tx.created_outputs(tx.hash(), ux_head);
        for ux in &outputs {
            let hash = ux.hash();
            if pool.has(&hash) || !created.insert(hash) {
                return Err(ChainError::OutputCollision(hash));
            }
        }

        let fee = check_balance(tx, inputs, time)?;
        effects.fee = effects
            .fee
            .checked_add(fee)
            .ok_or(AmountError::HourOverflow)?;
        effects.spent.extend_from_slice(&tx.inputs);
        effects.created.extend(outputs);
    }

    if effects.fee != block.header.fee {
        return Err(ChainError::FeeMismatch {
            expected: effects.fee,
            got: block.header.fee,
        });
    }

    let expected = pool.xor_hash_after(&effects.spent, &effects.created_hashes());
    if expected != block.header.ux_hash {
        return Err(ChainError::UxHashMismatch {
            expected,
            got: block.header.ux_hash,
        });
    }

    Ok(effects)
}

/// All four stages for a block on top of `head`.
pub fn validate_block(
    pool: &UnspentPool,
    head: &BlockHeader,
    block: &Block,
    now: u64,
    max_future_drift: u64,
) -> ChainResult<BlockEffects> {
    let result = validate_inputs(pool, block).and_then(|resolved| {
        validate_signatures(block, &resolved)?;
        validate_header(head, &block.header, now, max_future_drift)?;
        validate_body(pool, block, &resolved)
    });
    if let Err(e) = &result {
        debug!(seq = block.seq(), hash = %block.hash(), error = %e, "block rejected");
    }
    result
}

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// The genesis block stands alone: sequence 0, zero parent, one
/// transaction with no inputs and a single output, and a `ux_hash` equal to
/// the hash of the one output it creates.
pub fn validate_genesis(block: &Block) -> ChainResult<BlockEffects> {
    let bad = |msg: &str| Err(ChainError::BadGenesis(msg.to_string()));

    if block.header.version != BLOCK_VERSION {
        return Err(ChainError::UnsupportedVersion(block.header.version));
    }
    if block.seq() != 0 {
        return Err(ChainError::BadSequence {
            expected: 0,
            got: block.seq(),
        });
    }
    if !block.prev_hash().is_zero() {
        return bad("previous hash must be zero");
    }
    let [tx] = block.transactions() else {
        return bad("must contain exactly one transaction");
    };
    if !tx.inputs.is_empty() || !tx.head.sigs.is_empty() {
        return bad("transaction must have no inputs");
    }
    let [output] = tx.outputs.as_slice() else {
        return bad("transaction must have exactly one output");
    };
    if output.coins == 0 {
        return Err(TxError::ZeroCoinOutput(0).into());
    }
    if tx.head.hash != tx.inner_hash() {
        return Err(TxError::HeaderMismatch.into());
    }
    if block.body.hash() != block.header.body_hash {
        return Err(ChainError::BodyHashMismatch);
    }
    if block.header.fee != 0 {
        return Err(ChainError::FeeMismatch {
            expected: 0,
            got: block.header.fee,
        });
    }

    let created = tx.created_outputs(
        Digest::ZERO,
        UxHead {
            time: block.time(),
            bk_seq: 0,
        },
    );
    let expected = created[0].hash();
    if block.header.ux_hash != expected {
        return Err(ChainError::UxHashMismatch {
            expected,
            got: block.header.ux_hash,
        });
    }

    Ok(BlockEffects {
        spent: Vec::new(),
        created,
        fee: 0,
    })
}
