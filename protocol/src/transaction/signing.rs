//! Transaction signing with secp256k1 keys.
//!
//! Each input is signed separately, by the owner of the output it spends,
//! over the same digest: the transaction's inner hash. Signing is kept
//! apart from building because the keys usually are too (one key per
//! spent output, possibly held by different wallets).

use thiserror::Error;

use super::types::Transaction;
use crate::crypto::keys::SecretKey;
use crate::crypto::signatures::{sign_hash, SigError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// One key per input, in input order.
    #[error("expected {inputs} signing keys, got {keys}")]
    KeyCountMismatch { inputs: usize, keys: usize },

    #[error(transparent)]
    Signature(#[from] SigError),
}

/// Sign every input of `tx` in place.
///
/// 1. Stamp `head.hash` with the inner hash.
/// 2. Sign that digest with `keys[i]` for input `i`.
/// 3. Replace `head.sigs` with the new signatures.
///
/// The caller is responsible for pairing each key with the owner of the
/// corresponding input; a wrong pairing surfaces later as an address
/// mismatch during block validation.
pub fn sign_transaction(tx: &mut Transaction, keys: &[SecretKey]) -> Result<(), SigningError> {
    if keys.len() != tx.inputs.len() {
        return Err(SigningError::KeyCountMismatch {
            inputs: tx.inputs.len(),
            keys: keys.len(),
        });
    }

    tx.update_header();
    let inner = tx.head.hash;
    tx.head.sigs = keys
        .iter()
        .map(|key| sign_hash(key, &inner))
        .collect::<Result<_, _>>()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Digest;
    use crate::crypto::signatures::chk_sig;
    use crate::transaction::types::TransactionOutput;

    fn unsigned(inputs: usize) -> Transaction {
        Transaction {
            inputs: (0..inputs as u8).map(|i| Digest([i; 32])).collect(),
            outputs: vec![TransactionOutput {
                address: SecretKey::generate().address(),
                coins: 1,
                hours: 0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn signs_each_input_with_its_key() {
        let keys = vec![SecretKey::generate(), SecretKey::generate()];
        let mut tx = unsigned(2);
        sign_transaction(&mut tx, &keys).unwrap();

        assert_eq!(tx.head.hash, tx.inner_hash());
        assert_eq!(tx.head.sigs.len(), 2);
        for (key, sig) in keys.iter().zip(&tx.head.sigs) {
            assert!(chk_sig(&key.address(), &tx.head.hash, sig).is_ok());
        }
    }

    #[test]
    fn key_count_must_match_inputs() {
        let mut tx = unsigned(2);
        let err = sign_transaction(&mut tx, &[SecretKey::generate()]).unwrap_err();
        assert_eq!(err, SigningError::KeyCountMismatch { inputs: 2, keys: 1 });
        assert!(tx.head.sigs.is_empty());
    }

    #[test]
    fn resigning_replaces_signatures() {
        let key = SecretKey::generate();
        let mut tx = unsigned(1);
        sign_transaction(&mut tx, &[key.clone()]).unwrap();
        sign_transaction(&mut tx, &[key]).unwrap();
        assert_eq!(tx.head.sigs.len(), 1);
    }
}
