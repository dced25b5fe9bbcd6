//! # Digital Signatures
//!
//! Recoverable secp256k1 ECDSA over 32-byte digests.
//!
//! The ledger never signs raw messages. Inputs are signed over the
//! transaction's inner hash, blocks over the hash of their header, so every
//! function here takes a [`Digest`] and signs it as a prehash.
//!
//! ## Why recoverable?
//!
//! A transaction input names an output, and the output names an owner
//! address. If the signature lets us recover the public key, the
//! transaction needs to carry nothing else: recover, derive the address,
//! compare. [`chk_sig`] does exactly that, and then verifies the signature
//! once more against the recovered key. A recovery routine that returns
//! *some* key for a bad signature should not be enough to move coins.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use thiserror::Error;

use super::hash::Digest;
use super::keys::{Address, PubKey, SecretKey, Sig};
use crate::config::SIGNATURE_LENGTH;

/// Why a signature was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigError {
    /// The bytes are not a well-formed `r || s || recid` triple.
    #[error("malformed signature")]
    Malformed,

    #[error("could not recover a public key from the signature")]
    RecoveryFailed,

    #[error("recovered key belongs to {recovered}, expected {expected}")]
    AddressMismatch { expected: Address, recovered: Address },

    #[error("signature does not verify against the recovered key")]
    InvalidSignature,
}

fn split(sig: &Sig) -> Result<(Signature, RecoveryId), SigError> {
    let signature = Signature::from_slice(sig.compact()).map_err(|_| SigError::Malformed)?;
    let recid = RecoveryId::from_byte(sig.recovery_byte()).ok_or(SigError::Malformed)?;
    Ok((signature, recid))
}

/// Sign a 32-byte digest, producing a recoverable signature.
///
/// Deterministic (RFC 6979): the same key and digest always give the same
/// signature.
pub fn sign_hash(secret: &SecretKey, hash: &Digest) -> Result<Sig, SigError> {
    let (signature, recid) = secret
        .signing_key()
        .sign_prehash_recoverable(hash.as_ref())
        .map_err(|_| SigError::Malformed)?;

    let mut out = [0u8; SIGNATURE_LENGTH];
    out[..SIGNATURE_LENGTH - 1].copy_from_slice(&signature.to_bytes());
    out[SIGNATURE_LENGTH - 1] = recid.to_byte();
    Ok(Sig::new(out))
}

/// Recover the public key that produced `sig` over `hash`.
pub fn pubkey_from_sig(hash: &Digest, sig: &Sig) -> Result<PubKey, SigError> {
    let (signature, recid) = split(sig)?;
    let vk = VerifyingKey::recover_from_prehash(hash.as_ref(), &signature, recid)
        .map_err(|_| SigError::RecoveryFailed)?;
    Ok(PubKey::from_verifying_key(&vk))
}

/// Verify `sig` over `hash` against a known public key.
///
/// The recovery byte is ignored here; only `r || s` is checked.
pub fn verify_signature(pubkey: &PubKey, hash: &Digest, sig: &Sig) -> Result<(), SigError> {
    let (signature, _) = split(sig)?;
    let vk = pubkey
        .verifying_key()
        .map_err(|_| SigError::InvalidSignature)?;
    vk.verify_prehash(hash.as_ref(), &signature)
        .map_err(|_| SigError::InvalidSignature)
}

/// Check that `sig` over `hash` was made by the owner of `address`.
///
/// 1. Recover a public key from `(hash, sig)`.
/// 2. Derive its address and compare with `address`.
/// 3. Verify the signature against the recovered key.
pub fn chk_sig(address: &Address, hash: &Digest, sig: &Sig) -> Result<(), SigError> {
    let recovered = pubkey_from_sig(hash, sig)?;
    let recovered_addr = recovered.address();
    if recovered_addr != *address {
        return Err(SigError::AddressMismatch {
            expected: *address,
            recovered: recovered_addr,
        });
    }
    verify_signature(&recovered, hash, sig)
}
