//! # Chain Module
//!
//! Block validation and execution on top of `storage`.
//!
//! ## Architecture
//!
//! ```text
//! error.rs       ChainError: every way a block or transaction is refused
//! validation.rs  Pure checks: inputs, signatures, header, body, genesis
//! blockchain.rs  Blockchain: head, execute, create, query
//! ```
//!
//! Validation never mutates anything. `Blockchain` runs it, then applies
//! the block's effects in one step that either fully happens or leaves the
//! ledger as it was.

pub mod blockchain;
pub mod error;
pub mod validation;

pub use blockchain::{Balance, Blockchain};
pub use error::{ChainError, ChainResult};
pub use validation::{
    check_balance, check_signatures, validate_block, validate_body, validate_genesis,
    validate_header, validate_inputs, validate_signatures, verify_spend, BlockEffects,
};
