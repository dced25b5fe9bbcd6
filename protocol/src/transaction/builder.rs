//! Transaction construction via the builder pattern.
//!
//! ```
//! use helio_protocol::crypto::{Digest, SecretKey};
//! use helio_protocol::transaction::TransactionBuilder;
//!
//! let owner = SecretKey::generate();
//! let payee = SecretKey::generate().address();
//!
//! let tx = TransactionBuilder::new()
//!     .push_input(Digest::new([7u8; 32]))
//!     .push_output(payee, 1_000_000, 0)
//!     .sign_inputs(&[owner])
//!     .unwrap();
//!
//! assert_eq!(tx.head.hash, tx.inner_hash());
//! assert_eq!(tx.head.sigs.len(), 1);
//! ```

use super::signing::{sign_transaction, SigningError};
use super::types::{Transaction, TransactionOutput};
use crate::crypto::hash::Digest;
use crate::crypto::keys::{Address, SecretKey};

/// Assembles inputs and outputs, then signs.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<Digest>,
    outputs: Vec<TransactionOutput>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend the unspent output with hash `ux_hash`.
    pub fn push_input(mut self, ux_hash: Digest) -> Self {
        self.inputs.push(ux_hash);
        self
    }

    pub fn push_output(mut self, address: Address, coins: u64, hours: u64) -> Self {
        self.outputs.push(TransactionOutput {
            address,
            coins,
            hours,
        });
        self
    }

    /// Build with the header stamped but no signatures. Genesis
    /// transactions, which have no inputs, are built this way.
    pub fn build_unsigned(self) -> Transaction {
        let mut tx = Transaction {
            inputs: self.inputs,
            outputs: self.outputs,
            ..Default::default()
        };
        tx.update_header();
        tx
    }

    /// Build and sign input `i` with `keys[i]`.
    pub fn sign_inputs(self, keys: &[SecretKey]) -> Result<Transaction, SigningError> {
        let mut tx = self.build_unsigned();
        sign_transaction(&mut tx, keys)?;
        Ok(tx)
    }
}
