//! Why a block or transaction was refused.
//!
//! Every variant is an expected outcome of validating untrusted input and
//! leaves the ledger untouched. Bugs do not show up here; see
//! `crate::invariant`.

use thiserror::Error;

use crate::crypto::hash::Digest;
use crate::crypto::keys::KeyError;
use crate::crypto::signatures::SigError;
use crate::storage::{StoreError, UnspentError};
use crate::transaction::{AmountError, TxError};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Transaction(#[from] TxError),

    #[error(transparent)]
    Unspent(#[from] UnspentError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("publisher key: {0}")]
    PublisherKey(#[from] KeyError),

    #[error("input {input} of transaction {tx}: {source}")]
    InputSignature {
        tx: Digest,
        input: usize,
        #[source]
        source: SigError,
    },

    #[error("block signature rejected: {0}")]
    BlockSignature(#[source] SigError),

    #[error("unsupported block version {0}")]
    UnsupportedVersion(u32),

    #[error("expected block sequence {expected}, got {got}")]
    BadSequence { expected: u64, got: u64 },

    #[error("block time {got} is not after head time {head}")]
    TimeNotIncreasing { head: u64, got: u64 },

    #[error("block time {time} is too far ahead of local time {now}")]
    TimeInFuture { time: u64, now: u64 },

    #[error("previous hash {got} does not match head {expected}")]
    PrevHashMismatch { expected: Digest, got: Digest },

    #[error("body hash does not match the transactions")]
    BodyHashMismatch,

    #[error("header ux_hash {got} does not match resulting pool {expected}")]
    UxHashMismatch { expected: Digest, got: Digest },

    #[error("header fee {got} does not match transaction fees {expected}")]
    FeeMismatch { expected: u64, got: u64 },

    /// Two transactions in one block spend the same output.
    #[error("output {0} is spent more than once in the block")]
    DoubleSpend(Digest),

    /// A created output would share a hash with a live (or another created)
    /// output.
    #[error("created output {0} collides with an existing output")]
    OutputCollision(Digest),

    #[error("transaction {tx}: inputs hold {inputs} coins, outputs {outputs}")]
    CoinsNotConserved { tx: Digest, inputs: u64, outputs: u64 },

    #[error("transaction {tx}: inputs hold {available} coin-hours, outputs need {required}")]
    InsufficientHours {
        tx: Digest,
        available: u64,
        required: u64,
    },

    #[error("invalid genesis block: {0}")]
    BadGenesis(String),

    #[error("chain already has a genesis block")]
    GenesisExists,

    #[error("chain is empty")]
    NoHead,

    #[error("no valid transactions to put in a block")]
    NoValidTransactions,

    /// What is on disk does not describe a consistent ledger.
    #[error("stored state is inconsistent: {0}")]
    Corrupt(String),
}

pub type ChainResult<T> = Result<T, ChainError>;
