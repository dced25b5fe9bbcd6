//! # Transaction Module
//!
//! The ledger's unit of value transfer: spend some unspent outputs, create
//! new ones.
//!
//! ## Architecture
//!
//! ```text
//! ux.rs           UxOut = UxHead (metadata) + UxBody (hashed identity)
//! types.rs        Transaction, its two hashes, canonical encoding
//! builder.rs      TransactionBuilder for assembling inputs and outputs
//! signing.rs      Per-input secp256k1 signing over the inner hash
//! verification.rs Stateless structural checks
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: push the hashes of the outputs to spend and the new outputs.
//! 2. **Sign**: each input owner signs the inner hash.
//! 3. **Verify**: [`verify_transaction`] rejects malformed transactions.
//! 4. **Execute**: the chain resolves inputs against the unspent pool,
//!    checks ownership and balances, and applies it as part of a block.
//!
//! All amounts are `u64` base units with checked arithmetic throughout.
//! There is no floating point anywhere near a balance.

pub mod builder;
pub mod signing;
pub mod types;
pub mod ux;
pub mod verification;

pub use builder::TransactionBuilder;
pub use signing::{sign_transaction, SigningError};
pub use types::{Transaction, TransactionHead, TransactionOutput};
pub use ux::{total_coin_hours, total_coins, AmountError, UxBody, UxHead, UxOut};
pub use verification::{verify_transaction, TxError};
